use crate::RawSample;

/// Calibration offset for the flex sensor
///
/// Holds the smoothed reading that counts as a straight joint. Until the
/// first calibration the baseline is 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalibrationModel {
    offset: RawSample,
}

impl CalibrationModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take `reading` as the new straight baseline
    ///
    /// Any value is accepted; there is no plausibility check.
    pub fn calibrate(&mut self, reading: RawSample) {
        self.offset = reading;
    }

    /// Signed distance of `reading` from the baseline
    pub fn deviation(&self, reading: RawSample) -> RawSample {
        reading.saturating_sub(self.offset)
    }

    pub fn offset(&self) -> RawSample {
        self.offset
    }
}
