/// Exponentially-weighted moving average with a configurable half-life.
///
/// The sample weight is expressed in the same unit as the half-life
/// (seconds, typically): a sample whose weight equals the half-life moves
/// the estimate halfway towards its value.
#[derive(Clone, Debug)]
pub struct Ewma {
    half_life: f64,
    estimate: Option<f64>,
}

impl Ewma {
    const MIN_HALF_LIFE: f64 = 0.001;

    pub fn new(half_life: f64) -> Self {
        Self {
            half_life: half_life.max(Self::MIN_HALF_LIFE),
            estimate: None,
        }
    }

    /// Fold a new sample into the average.
    ///
    /// The first sample initialises the estimate to `value`.
    pub fn add_sample(&mut self, weight: f64, value: f64) {
        let next = match self.estimate {
            None => value,
            Some(current) => {
                let alpha = 1.0 - 2f64.powf(-weight.max(0.0) / self.half_life);
                current * (1.0 - alpha) + value * alpha
            }
        };
        self.estimate = Some(next);
    }

    /// Current estimate, `None` until the first sample.
    pub fn estimate(&self) -> Option<f64> {
        self.estimate
    }

    pub fn reset(&mut self) {
        self.estimate = None;
    }
}
