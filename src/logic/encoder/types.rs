//! Transmission Unit Types
//!
//! Header / payload / footer structure for one encoded telemetry frame.
//! No logic here - only data structures.

use serde::{Deserialize, Serialize};

use crate::logic::frame::Payload;

// ============================================================================
// ENCODING MODE
// ============================================================================

/// Payload encoding. Only raw JSON framing is implemented; the mode is
/// kept explicit so an unknown mode fails at setup instead of mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncodingMode {
    Raw,
}

impl EncodingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodingMode::Raw => "raw",
        }
    }
}

// ============================================================================
// UNIT HEADER / FOOTER
// ============================================================================

/// Fixed metadata prepended to every transmission unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitHeader {
    /// Encoder sequence number, monotone per encoder instance
    pub sequence: u64,
    /// Mission time of the source frame, seconds
    pub timestamp: f64,
    /// Id of the frame this unit was built from
    pub frame_id: u64,
    /// Transmission priority in [0, 10]
    pub priority: u8,
    /// Declared size of header+payload, computed once at encode time
    pub size_bytes: u64,
}

/// Trailing metadata: integrity digest plus channel bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitFooter {
    /// Truncated SHA-256 over the canonical header+payload serialization
    pub digest: String,
    /// Send timestamp; the channel simulator jitters this
    pub sent_at: f64,
    /// Set by the channel simulator when any payload field was altered
    pub corruption_detected: bool,
    /// Names of the payload fields that were altered
    pub corrupted_fields: Vec<String>,
}

// ============================================================================
// TRANSMISSION UNIT
// ============================================================================

/// Self-describing unit handed from the encoder to the channel.
/// Passed by value stage to stage; each stage owns its copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionUnit {
    pub header: UnitHeader,
    pub payload: Payload,
    pub footer: UnitFooter,
}

// ============================================================================
// ENCODER STATISTICS
// ============================================================================

/// Read-only encoder snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncoderStats {
    pub frames_encoded: u64,
    pub bytes_declared: u64,
    pub high_priority_units: u64,
    /// Current sequence counter; survives a statistics reset
    pub sequence: u64,
}
