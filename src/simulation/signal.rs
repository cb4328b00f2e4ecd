use std::f64::consts::PI;

use serde::Deserialize;

/// Shape of a simulated elbow bend
///
/// The joint starts straight at `baseline`, bends smoothly to `baseline +
/// amplitude` and back once every `period_secs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BendProfile {
    /// Raw reading with the arm straight
    pub baseline: f64,
    /// Raw units added at full bend
    pub amplitude: f64,
    /// Seconds per bend cycle
    pub period_secs: f64,
}

impl Default for BendProfile {
    fn default() -> Self {
        // 400 units at 0.3 deg/unit is a 120 degree bend
        Self {
            baseline: 512.0,
            amplitude: 400.0,
            period_secs: 4.0,
        }
    }
}

impl BendProfile {
    /// Noise-free raw reading at time `t`
    pub fn value_at(&self, t: f64) -> f64 {
        let phase = 2.0 * PI * t / self.period_secs;
        self.baseline + self.amplitude * (1.0 - phase.cos()) / 2.0
    }
}

/// Noise-free readings sampled at `sample_rate_hz`
pub fn generate_bend(profile: &BendProfile, duration_secs: f64, sample_rate_hz: f64) -> Vec<f64> {
    let num_samples = (duration_secs * sample_rate_hz) as usize;
    (0..num_samples)
        .map(|i| profile.value_at(i as f64 / sample_rate_hz))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_starts_straight() {
        let profile = BendProfile::default();
        assert_relative_eq!(profile.value_at(0.0), 512.0, epsilon = 1e-9);
    }

    #[test]
    fn test_full_bend_at_half_period() {
        let profile = BendProfile::default();
        assert_relative_eq!(profile.value_at(2.0), 912.0, epsilon = 1e-9);
        assert_relative_eq!(profile.value_at(4.0), 512.0, epsilon = 1e-9);
    }

    #[test]
    fn test_generate_length() {
        let samples = generate_bend(&BendProfile::default(), 2.0, 50.0);
        assert_eq!(samples.len(), 100);
    }
}
