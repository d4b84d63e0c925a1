//! Pipeline stages and shared domain types.

pub mod anomaly;
pub mod archive;
pub mod channel;
pub mod cleaner;
pub mod encoder;
pub mod errors;
pub mod frame;
pub mod pipeline;
pub mod schema;
pub mod source;
