use serde::Serialize;

use crate::RawSample;
use crate::config::FlexConfig;
use crate::error::{FlexError, Result};
use crate::signal_processing::{
    AngleMapper, CalibrationModel, RollingAverageFilter, Tier, TierClassifier,
};

/// One pipeline output, produced for every accepted raw sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    /// Rolling average of the recent raw samples
    pub smoothed: RawSample,
    /// Calibration baseline in effect for this reading
    pub offset: RawSample,
    /// `smoothed - offset`
    pub deviation: RawSample,
    /// Joint angle in degrees
    pub angle: f64,
    pub tier: Tier,
}

/// Sensor pipeline state: filter, calibration and angle mapping
///
/// All mutation goes through `&mut self`, so whoever owns the processor is
/// the only writer.
pub struct FlexProcessor {
    filter: RollingAverageFilter,
    calibration: CalibrationModel,
    mapper: AngleMapper,
    classifier: TierClassifier,
    latest: Option<Reading>,
}

impl FlexProcessor {
    pub fn new(config: &FlexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            filter: RollingAverageFilter::new(config.filter.window_size),
            calibration: CalibrationModel::new(),
            mapper: AngleMapper::new(&config.angle),
            classifier: TierClassifier::new(&config.tiers),
            latest: None,
        })
    }

    /// Run one raw sample through the filter, calibration and mapper
    pub fn process_sample(&mut self, raw: RawSample) -> Reading {
        let smoothed = self.filter.push(raw);
        let reading = self.evaluate(smoothed);
        log::trace!(
            "raw {} -> smoothed {} angle {:.1}",
            raw,
            reading.smoothed,
            reading.angle
        );
        self.latest = Some(reading);
        reading
    }

    pub fn process_samples(&mut self, samples: &[RawSample]) -> Vec<Reading> {
        samples.iter().map(|&s| self.process_sample(s)).collect()
    }

    /// Use the latest smoothed reading as the straight baseline
    ///
    /// Returns the new offset. Fails with [`FlexError::NoReading`] if no
    /// sample has arrived yet; the offset is left unchanged in that case.
    pub fn calibrate(&mut self) -> Result<RawSample> {
        let smoothed = self
            .latest
            .map(|r| r.smoothed)
            .ok_or(FlexError::NoReading)?;
        self.calibration.calibrate(smoothed);
        self.latest = Some(self.evaluate(smoothed));
        log::info!("Calibrated, offset {}", smoothed);
        Ok(smoothed)
    }

    fn evaluate(&self, smoothed: RawSample) -> Reading {
        let deviation = self.calibration.deviation(smoothed);
        let angle = self.mapper.map(deviation);
        Reading {
            smoothed,
            offset: self.calibration.offset(),
            deviation,
            angle,
            tier: self.classifier.classify(angle),
        }
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.latest.as_ref()
    }

    /// Latest angle, or 0 (straight) before any sample
    pub fn target_angle(&self) -> f64 {
        self.latest.map_or(0.0, |r| r.angle)
    }

    pub fn offset(&self) -> RawSample {
        self.calibration.offset()
    }

    pub fn window_len(&self) -> usize {
        self.filter.len()
    }

    pub fn window(&self) -> Vec<RawSample> {
        self.filter.samples().collect()
    }

    pub fn classifier(&self) -> &TierClassifier {
        &self.classifier
    }

    /// Drop buffered samples and the latest reading; calibration is kept
    pub fn reset(&mut self) {
        self.filter.reset();
        self.latest = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn processor() -> FlexProcessor {
        FlexProcessor::new(&FlexConfig::default()).unwrap()
    }

    #[test]
    fn test_calibrate_then_bend() {
        let mut p = processor();
        let readings = p.process_samples(&[100, 100, 100, 100, 100]);
        assert_eq!(readings.last().unwrap().smoothed, 100);

        assert_eq!(p.calibrate().unwrap(), 100);
        assert_eq!(p.offset(), 100);

        let readings = p.process_samples(&[400, 400, 400, 400, 400]);
        let last = readings.last().unwrap();
        assert_eq!(last.smoothed, 400);
        assert_eq!(last.deviation, 300);
        assert_relative_eq!(last.angle, 90.0, epsilon = 1e-9);
        assert_eq!(last.tier, Tier::Danger);
    }

    #[test]
    fn test_uncalibrated_baseline_is_zero() {
        let mut p = processor();
        let reading = p.process_sample(200);
        assert_eq!(reading.offset, 0);
        assert_eq!(reading.deviation, 200);
        assert_relative_eq!(reading.angle, 60.0, epsilon = 1e-9);
        assert_eq!(reading.tier, Tier::Warning);
    }

    #[test]
    fn test_calibrate_before_any_sample_fails() {
        let mut p = processor();
        assert!(matches!(p.calibrate(), Err(FlexError::NoReading)));
        assert_eq!(p.offset(), 0);
        assert!(p.latest().is_none());
        assert_eq!(p.target_angle(), 0.0);
    }

    #[test]
    fn test_calibrate_zeroes_latest_reading() {
        let mut p = processor();
        p.process_samples(&[300, 320, 340]);
        p.calibrate().unwrap();
        let latest = p.latest().unwrap();
        assert_eq!(latest.deviation, 0);
        assert_eq!(latest.angle, 0.0);
        assert_eq!(latest.tier, Tier::Safe);
    }

    #[test]
    fn test_calibration_uses_smoothed_not_raw() {
        let mut p = processor();
        p.process_samples(&[100, 200]);
        assert_eq!(p.calibrate().unwrap(), 150);
    }

    #[test]
    fn test_reset_keeps_calibration() {
        let mut p = processor();
        p.process_samples(&[50, 50]);
        p.calibrate().unwrap();
        p.reset();
        assert_eq!(p.window_len(), 0);
        assert_eq!(p.offset(), 50);
        assert!(p.latest().is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = FlexConfig::default();
        config.filter.window_size = 0;
        assert!(FlexProcessor::new(&config).is_err());
    }
}
