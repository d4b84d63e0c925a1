//! Pipeline Error Taxonomy
//!
//! Setup-time failures (`ConfigurationError`) and persistence failures
//! (`ArchiveError`) are the only conditions that abort a run. Packet
//! loss and unrecoverable frames are outcomes, not errors - they travel
//! as `DegradedUnit::Lost` / `None` through the stages.

use std::fmt;

// ============================================================================
// CONFIGURATION ERROR
// ============================================================================

/// Invalid encoding mode or malformed bound table. Raised at setup,
/// never recovered at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationError {
    pub message: String,
}

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration Error: {}", self.message)
    }
}

impl std::error::Error for ConfigurationError {}

// ============================================================================
// ARCHIVE ERROR
// ============================================================================

/// Persistence failure in the mission archive. Fatal to the `store`
/// call that raised it; must surface to the caller.
#[derive(Debug)]
pub enum ArchiveError {
    Sqlite(rusqlite::Error),
    Serialization(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::Sqlite(e) => write!(f, "Archive SQL Error: {}", e),
            ArchiveError::Serialization(e) => write!(f, "Archive Serialization Error: {}", e),
            ArchiveError::Io(e) => write!(f, "Archive IO Error: {}", e),
        }
    }
}

impl std::error::Error for ArchiveError {}

impl From<rusqlite::Error> for ArchiveError {
    fn from(err: rusqlite::Error) -> Self {
        ArchiveError::Sqlite(err)
    }
}

impl From<serde_json::Error> for ArchiveError {
    fn from(err: serde_json::Error) -> Self {
        ArchiveError::Serialization(err)
    }
}

impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        ArchiveError::Io(err)
    }
}

// ============================================================================
// PIPELINE ERROR
// ============================================================================

/// Aborting conditions surfaced by the driver loop.
#[derive(Debug)]
pub enum PipelineError {
    Configuration(ConfigurationError),
    Write(ArchiveError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Configuration(e) => write!(f, "{}", e),
            PipelineError::Write(e) => write!(f, "Write Failure: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<ConfigurationError> for PipelineError {
    fn from(err: ConfigurationError) -> Self {
        PipelineError::Configuration(err)
    }
}

impl From<ArchiveError> for PipelineError {
    fn from(err: ArchiveError) -> Self {
        PipelineError::Write(err)
    }
}
