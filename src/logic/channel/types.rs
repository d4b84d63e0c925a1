//! Channel Types
//!
//! Outcome of the simulated radio link and channel statistics.
//! No logic here - only data structures.

use serde::{Deserialize, Serialize};

use crate::logic::encoder::TransmissionUnit;

// ============================================================================
// DEGRADED UNIT
// ============================================================================

/// What comes out of the channel: either nothing at all, or a unit that
/// may carry jitter and corrupted payload fields.
#[derive(Debug, Clone, PartialEq)]
pub enum DegradedUnit {
    /// The packet never arrived. A first-class outcome, not an error.
    Lost,
    Received(TransmissionUnit),
}

impl DegradedUnit {
    pub fn is_lost(&self) -> bool {
        matches!(self, DegradedUnit::Lost)
    }

    pub fn unit(&self) -> Option<&TransmissionUnit> {
        match self {
            DegradedUnit::Lost => None,
            DegradedUnit::Received(unit) => Some(unit),
        }
    }
}

// ============================================================================
// CORRUPTION MODE
// ============================================================================

/// How one payload field gets damaged. The three modes are drawn with
/// equal probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorruptionMode {
    /// Value becomes null/absent
    Remove,
    /// Numeric value perturbed, rescaled or replaced with an overflow sentinel
    Distort,
    /// Value replaced with a non-numeric marker
    TypeError,
}

impl CorruptionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorruptionMode::Remove => "remove",
            CorruptionMode::Distort => "distort",
            CorruptionMode::TypeError => "type_error",
        }
    }
}

// ============================================================================
// CHANNEL STATISTICS
// ============================================================================

/// Read-only channel snapshot with derived rates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelStats {
    pub packets_in: u64,
    pub packets_lost: u64,
    pub packets_corrupted: u64,
    pub fields_corrupted: u64,
    pub observed_loss_rate: f64,
    pub observed_corruption_rate: f64,
}
