use std::collections::VecDeque;

use crate::RawSample;

/// Rolling average filter for raw sensor samples
///
/// Keeps the last N samples in arrival order and returns their mean rounded
/// to the nearest integer. Used to smooth line noise out of the flex sensor
/// before it is calibrated and mapped to an angle.
///
/// Rounding is half away from zero (`2.5 -> 3`, `-2.5 -> -3`) and is done
/// in integer arithmetic, so large readings never lose precision.
#[derive(Debug, Clone)]
pub struct RollingAverageFilter {
    window: VecDeque<RawSample>,
    capacity: usize,
}

impl RollingAverageFilter {
    /// Create a new rolling average filter
    ///
    /// # Arguments
    /// * `capacity` - Number of samples to average (clamped to at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Add a sample and return the smoothed reading
    ///
    /// The oldest sample is evicted once the window holds more than
    /// `capacity` samples.
    pub fn push(&mut self, sample: RawSample) -> RawSample {
        self.window.push_back(sample);
        if self.window.len() > self.capacity {
            self.window.pop_front();
        }
        rounded_mean(&self.window)
    }

    /// Current smoothed reading, or `None` before the first sample
    pub fn average(&self) -> Option<RawSample> {
        if self.window.is_empty() {
            None
        } else {
            Some(rounded_mean(&self.window))
        }
    }

    /// Samples currently in the window, oldest first
    pub fn samples(&self) -> impl Iterator<Item = RawSample> + '_ {
        self.window.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

fn rounded_mean(window: &VecDeque<RawSample>) -> RawSample {
    let n = window.len() as i128;
    let sum: i128 = window.iter().map(|&s| s as i128).sum();
    // Half away from zero: shift the magnitude by n/2 before truncating.
    let mean = if sum >= 0 {
        (2 * sum + n) / (2 * n)
    } else {
        -((-2 * sum + n) / (2 * n))
    };
    mean as RawSample
}
