//! Sensor and display constants
//!
//! Defaults for the flex sensor pipeline. Every value here can be overridden
//! through [`crate::config::FlexConfig`]; these are what the stock sensor
//! and arm gauge were tuned with.

/// Number of raw samples averaged by the rolling filter.
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// Degrees of joint angle per unit of deviation.
/// 300 units of deviation correspond to a 90 degree bend.
pub const DEFAULT_SENSITIVITY: f64 = 0.3;

/// Largest angle the gauge reports, in degrees.
pub const DEFAULT_MAX_ANGLE_DEGREES: f64 = 140.0;

/// Fraction of the remaining distance the displayed angle covers per frame.
pub const DEFAULT_ANIMATION_ALPHA: f64 = 0.1;

/// Render tick rate for the animated gauge.
pub const DEFAULT_FRAME_RATE_HZ: f64 = 60.0;

/// Angle at which the gauge leaves the safe range.
pub const DEFAULT_WARNING_DEGREES: f64 = 45.0;

/// Angle at which the gauge enters the danger range.
pub const DEFAULT_DANGER_DEGREES: f64 = 90.0;

/// Baud rate the sensor firmware writes at.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Serial line delimiter written by the sensor firmware.
pub const LINE_DELIMITER: &[u8] = b"\r\n";

/// Longest unterminated line kept while waiting for its delimiter.
pub const MAX_LINE_LENGTH: usize = 64;

const _: () = assert!(DEFAULT_WINDOW_SIZE > 0);
const _: () = assert!(MAX_LINE_LENGTH >= LINE_DELIMITER.len());
const _: () = assert!(DEFAULT_WARNING_DEGREES < DEFAULT_DANGER_DEGREES);
