use crate::RawSample;
use crate::config::AngleConfig;

/// Maps a calibrated deviation to a joint angle in degrees
///
/// `angle = min(|deviation| * sensitivity, max_angle)`. The sign of the
/// deviation is dropped, so bending either way reads as the same angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleMapper {
    sensitivity: f64,
    max_angle: f64,
}

impl AngleMapper {
    /// Create a mapper from already validated configuration
    pub fn new(config: &AngleConfig) -> Self {
        Self::with_params(config.sensitivity, config.max_angle_degrees)
    }

    pub fn with_params(sensitivity: f64, max_angle: f64) -> Self {
        Self {
            sensitivity,
            max_angle,
        }
    }

    /// Angle in `[0, max_angle]` for a deviation
    pub fn map(&self, deviation: RawSample) -> f64 {
        let magnitude = deviation.unsigned_abs() as f64;
        (magnitude * self.sensitivity).clamp(0.0, self.max_angle)
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn max_angle(&self) -> f64 {
        self.max_angle
    }
}

impl Default for AngleMapper {
    fn default() -> Self {
        Self::new(&AngleConfig::default())
    }
}
