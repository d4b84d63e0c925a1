//! Telemetry Field Schema
//!
//! One shared table of known field names with declared valid range,
//! rate-of-change limit and alarm thresholds. The cleaner and the
//! anomaly detector both read this table, so the two stages cannot
//! drift out of sync on what a field is allowed to do.

use std::collections::HashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logic::errors::ConfigurationError;

// ============================================================================
// THRESHOLD BOUNDS
// ============================================================================

/// Named alarm bounds for one field. All four are optional; critical
/// bounds are checked before warning bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBounds {
    pub low_warning: Option<f64>,
    pub low_critical: Option<f64>,
    pub high_warning: Option<f64>,
    pub high_critical: Option<f64>,
}

impl ThresholdBounds {
    fn validate(&self, field: &str) -> Result<(), ConfigurationError> {
        if let (Some(lc), Some(lw)) = (self.low_critical, self.low_warning) {
            if lc > lw {
                return Err(ConfigurationError::new(format!(
                    "{}: low_critical {} above low_warning {}",
                    field, lc, lw
                )));
            }
        }
        if let (Some(hw), Some(hc)) = (self.high_warning, self.high_critical) {
            if hw > hc {
                return Err(ConfigurationError::new(format!(
                    "{}: high_warning {} above high_critical {}",
                    field, hw, hc
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// FIELD SPEC
// ============================================================================

/// Declared behavior of one telemetry field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Physically valid range; readings outside are clamped
    pub valid_range: (f64, f64),
    /// Maximum plausible rate of change, units per second
    pub max_rate: Option<f64>,
    /// Alarm bounds for the threshold detector
    pub thresholds: Option<ThresholdBounds>,
    /// Nominal value, used by the synthetic frame source
    pub nominal: f64,
}

impl FieldSpec {
    pub fn midpoint(&self) -> f64 {
        (self.valid_range.0 + self.valid_range.1) / 2.0
    }
}

// ============================================================================
// SCHEMA TABLE
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetrySchema {
    fields: HashMap<String, FieldSpec>,
}

impl TelemetrySchema {
    pub fn new(fields: HashMap<String, FieldSpec>) -> Result<Self, ConfigurationError> {
        let schema = Self { fields };
        schema.validate()?;
        Ok(schema)
    }

    /// Reject inverted ranges, non-positive rate limits and crossed
    /// threshold bounds before the pipeline starts.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, spec) in &self.fields {
            if spec.valid_range.0 >= spec.valid_range.1 {
                return Err(ConfigurationError::new(format!(
                    "{}: inverted valid range ({}, {})",
                    name, spec.valid_range.0, spec.valid_range.1
                )));
            }
            if let Some(rate) = spec.max_rate {
                if rate <= 0.0 {
                    return Err(ConfigurationError::new(format!(
                        "{}: max_rate must be positive, got {}",
                        name, rate
                    )));
                }
            }
            if let Some(bounds) = &spec.thresholds {
                bounds.validate(name)?;
            }
        }
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Default schema for the rover field vocabulary. Ranges follow the
    /// documented physical units of the sensor suite.
    pub fn rover_default() -> Self {
        ROVER_SCHEMA.clone()
    }
}

// ============================================================================
// DEFAULT ROVER SCHEMA
// ============================================================================

static ROVER_SCHEMA: Lazy<TelemetrySchema> = Lazy::new(|| {
    let mut fields = HashMap::new();

    let mut add = |name: &str, spec: FieldSpec| {
        fields.insert(name.to_string(), spec);
    };

    // Attitude (degrees)
    add("roll", FieldSpec {
        valid_range: (-90.0, 90.0),
        max_rate: Some(15.0),
        thresholds: Some(ThresholdBounds {
            low_warning: Some(-25.0),
            low_critical: Some(-40.0),
            high_warning: Some(25.0),
            high_critical: Some(40.0),
        }),
        nominal: 0.0,
    });
    add("pitch", FieldSpec {
        valid_range: (-90.0, 90.0),
        max_rate: Some(15.0),
        thresholds: Some(ThresholdBounds {
            low_warning: Some(-25.0),
            low_critical: Some(-40.0),
            high_warning: Some(25.0),
            high_critical: Some(40.0),
        }),
        nominal: 0.0,
    });
    add("heading", FieldSpec {
        valid_range: (0.0, 360.0),
        max_rate: Some(45.0),
        thresholds: None,
        nominal: 90.0,
    });

    // Power subsystem
    add("battery_voltage", FieldSpec {
        valid_range: (20.0, 40.0),
        max_rate: Some(2.0),
        thresholds: Some(ThresholdBounds {
            low_warning: Some(29.0),
            low_critical: Some(26.0),
            high_warning: Some(35.0),
            high_critical: Some(37.0),
        }),
        nominal: 32.0,
    });
    add("battery_current", FieldSpec {
        valid_range: (-15.0, 15.0),
        max_rate: Some(10.0),
        thresholds: None,
        nominal: -1.5,
    });
    add("battery_soc", FieldSpec {
        valid_range: (0.0, 100.0),
        max_rate: Some(5.0),
        thresholds: Some(ThresholdBounds {
            low_warning: Some(30.0),
            low_critical: Some(15.0),
            high_warning: None,
            high_critical: None,
        }),
        nominal: 85.0,
    });
    add("solar_voltage", FieldSpec {
        valid_range: (0.0, 40.0),
        max_rate: Some(8.0),
        thresholds: None,
        nominal: 34.0,
    });
    add("solar_current", FieldSpec {
        valid_range: (0.0, 8.0),
        max_rate: Some(4.0),
        thresholds: None,
        nominal: 2.0,
    });

    // Thermal subsystem (degrees C)
    add("cpu_temp", FieldSpec {
        valid_range: (-40.0, 85.0),
        max_rate: Some(5.0),
        thresholds: Some(ThresholdBounds {
            low_warning: Some(-20.0),
            low_critical: Some(-35.0),
            high_warning: Some(60.0),
            high_critical: Some(75.0),
        }),
        nominal: 25.0,
    });
    add("battery_temp", FieldSpec {
        valid_range: (-30.0, 50.0),
        max_rate: Some(3.0),
        thresholds: Some(ThresholdBounds {
            low_warning: Some(-10.0),
            low_critical: Some(-20.0),
            high_warning: Some(40.0),
            high_critical: Some(45.0),
        }),
        nominal: 20.0,
    });
    add("motor_temp", FieldSpec {
        valid_range: (-40.0, 70.0),
        max_rate: Some(5.0),
        thresholds: Some(ThresholdBounds {
            low_warning: None,
            low_critical: None,
            high_warning: Some(55.0),
            high_critical: Some(65.0),
        }),
        nominal: 30.0,
    });
    add("chassis_temp", FieldSpec {
        valid_range: (-80.0, 50.0),
        max_rate: Some(3.0),
        thresholds: None,
        nominal: 15.0,
    });

    // Position and motion
    add("x", FieldSpec {
        valid_range: (-10_000.0, 10_000.0),
        max_rate: Some(1.0),
        thresholds: None,
        nominal: 0.0,
    });
    add("y", FieldSpec {
        valid_range: (-10_000.0, 10_000.0),
        max_rate: Some(1.0),
        thresholds: None,
        nominal: 0.0,
    });
    add("z", FieldSpec {
        valid_range: (-100.0, 100.0),
        max_rate: Some(0.5),
        thresholds: None,
        nominal: 0.0,
    });
    add("velocity", FieldSpec {
        valid_range: (0.0, 0.2),
        max_rate: Some(0.1),
        thresholds: Some(ThresholdBounds {
            low_warning: None,
            low_critical: None,
            high_warning: Some(0.08),
            high_critical: Some(0.15),
        }),
        nominal: 0.02,
    });

    // Science window flag (0.0 / 1.0)
    add("science_active", FieldSpec {
        valid_range: (0.0, 1.0),
        max_rate: None,
        thresholds: None,
        nominal: 0.0,
    });

    TelemetrySchema { fields }
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rover_default_is_valid() {
        let schema = TelemetrySchema::rover_default();
        assert!(schema.validate().is_ok());
        assert!(schema.field("battery_soc").is_some());
        assert!(schema.field("warp_core_temp").is_none());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut fields = HashMap::new();
        fields.insert("bad".to_string(), FieldSpec {
            valid_range: (10.0, -10.0),
            max_rate: None,
            thresholds: None,
            nominal: 0.0,
        });
        assert!(TelemetrySchema::new(fields).is_err());
    }

    #[test]
    fn test_crossed_thresholds_rejected() {
        let mut fields = HashMap::new();
        fields.insert("bad".to_string(), FieldSpec {
            valid_range: (0.0, 100.0),
            max_rate: None,
            thresholds: Some(ThresholdBounds {
                low_warning: Some(10.0),
                low_critical: Some(20.0), // critical above warning
                high_warning: None,
                high_critical: None,
            }),
            nominal: 50.0,
        });
        assert!(TelemetrySchema::new(fields).is_err());
    }

    #[test]
    fn test_non_positive_rate_rejected() {
        let mut fields = HashMap::new();
        fields.insert("bad".to_string(), FieldSpec {
            valid_range: (0.0, 1.0),
            max_rate: Some(0.0),
            thresholds: None,
            nominal: 0.5,
        });
        assert!(TelemetrySchema::new(fields).is_err());
    }
}
