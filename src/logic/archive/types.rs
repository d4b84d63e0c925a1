//! Archive Types
//!
//! Rows read back from the mission store and the archive statistics
//! snapshot.

use serde::{Deserialize, Serialize};

// ============================================================================
// ANOMALY RECORD
// ============================================================================

/// One anomaly row joined back to its frame. `telemetry_id` points at
/// the owning telemetry row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub telemetry_id: i64,
    pub timestamp: f64,
    pub field: String,
    pub kind: String,
    pub severity: String,
    pub description: String,
}

// ============================================================================
// ARCHIVE STATISTICS
// ============================================================================

/// Read-only archive snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveStats {
    pub frames_stored: u64,
    pub anomalies_stored: u64,
    pub frames_queried: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}
