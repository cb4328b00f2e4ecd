use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Bernoulli, Distribution, Normal};

use crate::RawSample;
use crate::error::{FlexError, Result};

/// Sensor noise and line glitches
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Standard deviation of Gaussian noise in raw units
    pub std_dev: f64,
    /// Probability that a line is replaced by garbage text
    pub glitch_probability: f64,
    pub seed: u64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            std_dev: 6.0,
            glitch_probability: 0.0,
            seed: 0,
        }
    }
}

impl NoiseConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_std_dev(mut self, std_dev: f64) -> Self {
        self.std_dev = std_dev;
        self
    }

    pub fn with_glitches(mut self, probability: f64) -> Self {
        self.glitch_probability = probability;
        self
    }
}

/// Seeded noise generator; the same seed always gives the same stream
pub struct SensorNoise {
    rng: ChaCha8Rng,
    normal: Normal<f64>,
    glitch: Bernoulli,
}

impl SensorNoise {
    pub fn new(config: &NoiseConfig) -> Result<Self> {
        let normal = Normal::new(0.0, config.std_dev)
            .map_err(|e| FlexError::Config(format!("noise std dev: {}", e)))?;
        let glitch = Bernoulli::new(config.glitch_probability).map_err(|e| {
            FlexError::Config(format!(
                "glitch probability {}: {}",
                config.glitch_probability, e
            ))
        })?;
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            normal,
            glitch,
        })
    }

    /// Add noise to a clean reading and quantize like the sensor ADC
    pub fn apply(&mut self, clean: f64) -> RawSample {
        let noisy = clean + self.normal.sample(&mut self.rng);
        noisy.round().max(0.0) as RawSample
    }

    /// Decide whether the next line gets mangled
    pub fn glitch(&mut self) -> bool {
        self.glitch.sample(&mut self.rng)
    }
}

/// Render readings in the sensor's serial text format
pub fn to_serial_text(samples: &[f64], noise: &mut SensorNoise) -> String {
    let mut text = String::with_capacity(samples.len() * 6);
    for &clean in samples {
        if noise.glitch() {
            text.push_str("ERR\r\n");
        } else {
            text.push_str(&format!("{}\r\n", noise.apply(clean)));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_reproducibility() {
        let config = NoiseConfig::default().with_seed(42);
        let mut a = SensorNoise::new(&config).unwrap();
        let mut b = SensorNoise::new(&config).unwrap();
        for _ in 0..50 {
            assert_eq!(a.apply(500.0), b.apply(500.0));
        }
    }

    #[test]
    fn test_zero_noise_is_exact() {
        let mut noise = SensorNoise::new(&NoiseConfig::default().with_std_dev(0.0)).unwrap();
        assert_eq!(noise.apply(612.4), 612);
    }

    #[test]
    fn test_never_negative() {
        let mut noise = SensorNoise::new(&NoiseConfig::default().with_std_dev(50.0)).unwrap();
        for _ in 0..200 {
            assert!(noise.apply(0.0) >= 0);
        }
    }

    #[test]
    fn test_invalid_config() {
        assert!(SensorNoise::new(&NoiseConfig::default().with_std_dev(-1.0)).is_err());
        assert!(SensorNoise::new(&NoiseConfig::default().with_glitches(1.5)).is_err());
    }

    #[test]
    fn test_serial_text_with_glitches() {
        let config = NoiseConfig::default().with_std_dev(0.0).with_glitches(1.0);
        let mut noise = SensorNoise::new(&config).unwrap();
        assert_eq!(to_serial_text(&[1.0, 2.0], &mut noise), "ERR\r\nERR\r\n");
    }
}
