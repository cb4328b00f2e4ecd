//! Severity tiers for the joint angle.
//!
//! The tier only selects how the angle is shown (color, label); it does not
//! feed back into the pipeline.

use std::fmt;

use serde::Serialize;

use crate::config::TierConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Safe,
    Warning,
    Danger,
}

impl Tier {
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Safe => "SAFE",
            Tier::Warning => "WARNING",
            Tier::Danger => "DANGER",
        }
    }

    /// Display color as RGB
    pub fn color(&self) -> [u8; 3] {
        match self {
            Tier::Safe => [0x22, 0xc5, 0x5e],
            Tier::Warning => [0xea, 0xb3, 0x08],
            Tier::Danger => [0xef, 0x44, 0x44],
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Angle thresholds separating the tiers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierClassifier {
    warning: f64,
    danger: f64,
}

impl TierClassifier {
    pub fn new(config: &TierConfig) -> Self {
        Self {
            warning: config.warning_degrees,
            danger: config.danger_degrees,
        }
    }

    /// Safe below the warning threshold, Danger at or above the danger
    /// threshold, Warning in between
    pub fn classify(&self, angle: f64) -> Tier {
        if angle >= self.danger {
            Tier::Danger
        } else if angle >= self.warning {
            Tier::Warning
        } else {
            Tier::Safe
        }
    }
}

impl Default for TierClassifier {
    fn default() -> Self {
        Self::new(&TierConfig::default())
    }
}
