pub mod config;
pub mod constants;
pub mod error;
pub mod output;
pub mod processing;
pub mod session;
pub mod signal_processing;
pub mod transport;

#[cfg(feature = "simulation")]
pub mod simulation;

/// One integer reading as reported by the sensor
pub type RawSample = i64;

pub use config::FlexConfig;
pub use error::{FlexError, Result};
pub use processing::{FlexProcessor, Reading};
