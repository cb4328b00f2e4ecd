mod noise;
mod signal;
mod source;

pub use noise::{NoiseConfig, SensorNoise, to_serial_text};
pub use signal::{BendProfile, generate_bend};
pub use source::SimulatedSource;
