/// Exponential animation of the displayed angle
///
/// Each render frame moves the displayed angle a fixed fraction (`alpha`)
/// of the remaining distance toward the latest target. This keeps the gauge
/// moving at frame rate no matter how irregularly sensor samples arrive.
///
/// The sequence never ends on its own; the caller stops ticking.
#[derive(Debug, Clone, Copy)]
pub struct AnimationSmoother {
    alpha: f64,
    displayed: f64,
}

impl AnimationSmoother {
    /// Create a smoother starting at 0 degrees
    ///
    /// # Arguments
    /// * `alpha` - Damping factor in (0, 1]; smaller is smoother but slower
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            displayed: 0.0,
        }
    }

    /// Advance one frame toward `target` and return the displayed angle
    pub fn tick(&mut self, target: f64) -> f64 {
        self.displayed += (target - self.displayed) * self.alpha;
        self.displayed
    }

    pub fn displayed(&self) -> f64 {
        self.displayed
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Whether the displayed angle is within `epsilon` of `target`
    pub fn is_settled(&self, target: f64, epsilon: f64) -> bool {
        (target - self.displayed).abs() <= epsilon
    }

    pub fn reset(&mut self) {
        self.displayed = 0.0;
    }
}
