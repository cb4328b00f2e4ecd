//! Configuration for the flex gauge.
//!
//! Every section has working defaults, so a config file only needs the
//! values that differ for a particular sensor:
//!
//! ```toml
//! [filter]
//! window_size = 8
//!
//! [angle]
//! sensitivity = 0.25
//! max_angle_degrees = 150.0
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::constants::*;
use crate::error::{FlexError, Result};

/// System-wide flex gauge configuration
///
/// Use `FlexConfig::default()` for the stock sensor, or
/// [`FlexConfig::load`] to read overrides from a TOML file.
///
/// # Example
/// ```
/// use flexgauge::config::FlexConfig;
///
/// let mut config = FlexConfig::default();
/// config.angle.sensitivity = 0.25;
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlexConfig {
    /// Serial transport configuration
    pub serial: SerialConfig,
    /// Rolling average configuration
    pub filter: FilterConfig,
    /// Deviation to angle mapping
    pub angle: AngleConfig,
    /// Displayed angle animation
    pub animation: AnimationConfig,
    /// Severity tier thresholds
    pub tiers: TierConfig,
    /// Presenter output configuration
    pub output: OutputConfig,
}

/// Serial transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialConfig {
    /// Baud rate of the sensor link
    pub baud_rate: u32,
    /// Read timeout in milliseconds. Bounds how long a disconnect request
    /// waits for the reader thread.
    pub read_timeout_ms: u64,
}

/// Rolling average configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Number of most recent raw samples averaged together
    pub window_size: usize,
}

/// Deviation to angle mapping
///
/// These are calibration constants of the physical sensor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AngleConfig {
    /// Degrees per unit of deviation from the calibrated baseline
    pub sensitivity: f64,
    /// Upper clamp of the reported angle in degrees
    pub max_angle_degrees: f64,
}

/// Displayed angle animation
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnimationConfig {
    /// Damping factor in (0, 1]; 1.0 jumps straight to the target
    pub alpha: f64,
    /// Render ticks per second
    pub frame_rate_hz: f64,
    /// Maximum frames to keep animating after the source has closed
    pub coast_frames: u32,
    /// Distance in degrees at which the displayed angle counts as settled
    pub settle_epsilon: f64,
}

/// Severity tier thresholds in degrees
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TierConfig {
    /// Angles at or above this are at least `Warning`
    pub warning_degrees: f64,
    /// Angles at or above this are `Danger`
    pub danger_degrees: f64,
}

/// Presenter output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Maximum presenter updates per second
    pub output_rate_hz: f64,
}

impl FlexConfig {
    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: FlexConfig =
            toml::from_str(s).map_err(|e| FlexError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.serial.baud_rate == 0 {
            return Err(FlexError::Config("baud rate must be positive".into()));
        }
        if self.filter.window_size == 0 {
            return Err(FlexError::Config("window size must be at least 1".into()));
        }
        if !(self.angle.sensitivity.is_finite() && self.angle.sensitivity > 0.0) {
            return Err(FlexError::Config(format!(
                "sensitivity must be positive, got {}",
                self.angle.sensitivity
            )));
        }
        if !(self.angle.max_angle_degrees.is_finite() && self.angle.max_angle_degrees > 0.0) {
            return Err(FlexError::Config(format!(
                "max angle must be positive, got {}",
                self.angle.max_angle_degrees
            )));
        }
        if !(self.animation.alpha > 0.0 && self.animation.alpha <= 1.0) {
            return Err(FlexError::Config(format!(
                "animation alpha must be in (0, 1], got {}",
                self.animation.alpha
            )));
        }
        if !(self.animation.frame_rate_hz.is_finite() && self.animation.frame_rate_hz > 0.0) {
            return Err(FlexError::Config("frame rate must be positive".into()));
        }
        if self.animation.settle_epsilon.is_nan() || self.animation.settle_epsilon < 0.0 {
            return Err(FlexError::Config("settle epsilon must not be negative".into()));
        }
        if self.tiers.warning_degrees >= self.tiers.danger_degrees {
            return Err(FlexError::Config(format!(
                "warning threshold {} must be below danger threshold {}",
                self.tiers.warning_degrees, self.tiers.danger_degrees
            )));
        }
        if !(self.output.output_rate_hz.is_finite() && self.output.output_rate_hz > 0.0) {
            return Err(FlexError::Config("output rate must be positive".into()));
        }
        Ok(())
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl AnimationConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate_hz)
    }
}

impl OutputConfig {
    pub fn output_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.output_rate_hz)
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 100,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl Default for AngleConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            max_angle_degrees: DEFAULT_MAX_ANGLE_DEGREES,
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ANIMATION_ALPHA,
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            coast_frames: 120,
            settle_epsilon: 0.05,
        }
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            warning_degrees: DEFAULT_WARNING_DEGREES,
            danger_degrees: DEFAULT_DANGER_DEGREES,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_rate_hz: 10.0,
        }
    }
}
