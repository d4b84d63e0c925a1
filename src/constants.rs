//! Central Configuration Constants
//!
//! Single source of truth for pipeline defaults.
//! To change a default rate or window size, only edit this file.

/// Hex characters kept from the SHA-256 frame digest (8 bytes)
pub const DIGEST_LEN: usize = 16;

/// Generous sanity band for raw field values; anything outside is
/// treated as garbage rather than a physical reading
pub const SANITY_BOUND: f64 = 1e6;

/// Marker written into a payload field on a type-error corruption
pub const TYPE_ERROR_MARKER: &str = "#ERR";

/// Overflow sentinel used by the distort corruption mode
pub const OVERFLOW_SENTINEL: f64 = 1e9;

/// Base transmission priority for a nominal frame
pub const PRIORITY_BASE: u8 = 5;

/// State of charge below which a frame is flagged critical (priority 10)
pub const SOC_CRITICAL: f64 = 20.0;

/// State of charge below which a frame is flagged low-power (priority >= 8)
pub const SOC_LOW: f64 = 40.0;

/// Battery temperature safe band (degrees C); outside raises priority to >= 9
pub const BATTERY_TEMP_SAFE: (f64, f64) = (-20.0, 45.0);

/// Default cleaner history depth (frames kept for interpolation context)
pub const DEFAULT_CLEANER_HISTORY: usize = 10;

/// Default per-field observation window for the anomaly detector
pub const DEFAULT_DETECTOR_HISTORY: usize = 50;

/// Observations required before the z-score detector starts firing
pub const Z_SCORE_MIN_SAMPLES: usize = 10;

/// Default z-score threshold
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

/// Default archive ring-buffer capacity (recent frames for tail reads)
pub const DEFAULT_CACHE_SIZE: usize = 100;

/// Repairs above this count downgrade a frame to low quality
pub const LOW_QUALITY_REPAIRS: usize = 3;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "telemetry-core";
