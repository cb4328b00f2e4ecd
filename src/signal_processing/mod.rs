pub mod angle;
pub mod calibration;
pub mod rolling_average;
pub mod smoother;
pub mod tier;

pub use angle::AngleMapper;
pub use calibration::CalibrationModel;
pub use rolling_average::RollingAverageFilter;
pub use smoother::AnimationSmoother;
pub use tier::{Tier, TierClassifier};
