//! Telemetry Core
//!
//! A deterministic telemetry degradation-and-recovery pipeline. Sensor
//! frames are packetized with an integrity digest, pushed through a
//! simulated lossy channel, repaired against a per-field schema, scanned
//! by three anomaly detectors and archived in SQLite.
//!
//! Every random decision is drawn from seeded generators, so a run is
//! fully reproducible from its configuration.

pub mod constants;
pub mod logic;
