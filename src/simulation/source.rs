use std::thread;
use std::time::{Duration, Instant};

use super::{BendProfile, NoiseConfig, SensorNoise};
use crate::RawSample;
use crate::error::Result;
use crate::transport::{LineDecoder, SampleSource};

/// Simulated flex sensor
///
/// Produces the same `\r\n` text the firmware writes and runs it through a
/// [`LineDecoder`], so a simulated session exercises the serial path end to
/// end without hardware.
pub struct SimulatedSource {
    profile: BendProfile,
    noise: SensorNoise,
    decoder: LineDecoder,
    sample_rate_hz: f64,
    total_samples: Option<usize>,
    emitted: usize,
    realtime: bool,
    start: Instant,
}

impl SimulatedSource {
    pub fn new(profile: BendProfile, noise: &NoiseConfig, sample_rate_hz: f64) -> Result<Self> {
        Ok(Self {
            profile,
            noise: SensorNoise::new(noise)?,
            decoder: LineDecoder::new(),
            sample_rate_hz,
            total_samples: None,
            emitted: 0,
            realtime: true,
            start: Instant::now(),
        })
    }

    /// Stop after `duration_secs` of simulated time
    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.total_samples = Some((duration_secs * self.sample_rate_hz) as usize);
        self
    }

    /// Emit samples as fast as they are requested instead of pacing them
    pub fn unpaced(mut self) -> Self {
        self.realtime = false;
        self
    }

    fn pace(&self) {
        let due = Duration::from_secs_f64(self.emitted as f64 / self.sample_rate_hz);
        let elapsed = self.start.elapsed();
        if due > elapsed {
            thread::sleep(due - elapsed);
        }
    }
}

impl SampleSource for SimulatedSource {
    fn next_samples(&mut self) -> anyhow::Result<Option<Vec<RawSample>>> {
        if self.total_samples.is_some_and(|total| self.emitted >= total) {
            return Ok(None);
        }
        if self.realtime {
            self.pace();
        }

        let t = self.emitted as f64 / self.sample_rate_hz;
        let clean = self.profile.value_at(t);
        self.emitted += 1;

        let line = if self.noise.glitch() {
            "ERR\r\n".to_string()
        } else {
            format!("{}\r\n", self.noise.apply(clean))
        };
        Ok(Some(self.decoder.feed(line.as_bytes())))
    }

    fn name(&self) -> String {
        "simulated".to_string()
    }
}
