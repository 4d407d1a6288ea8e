use cadenza_core::Ewma;

use crate::QualityConfig;

/// Fast and slow quality averages of one stream.
///
/// The reported quality is the lower of the two, rounded to two decimals,
/// so quality drops show quickly and recoveries slowly.
#[derive(Clone, Debug)]
pub struct QualityMeans {
    fast: Ewma,
    slow: Ewma,
    quality: Option<f64>,
}

impl QualityMeans {
    pub fn new(config: &QualityConfig) -> Self {
        Self {
            fast: Ewma::new(config.fast_half_life_secs),
            slow: Ewma::new(config.slow_half_life_secs),
            quality: None,
        }
    }

    /// Fold a local quality observed over `weight_secs` of playback and
    /// return the updated quality.
    pub fn add_sample(&mut self, weight_secs: f64, local_quality: f64) -> Option<f64> {
        self.fast.add_sample(weight_secs, local_quality);
        self.slow.add_sample(weight_secs, local_quality);
        self.quality = match (self.fast.estimate(), self.slow.estimate()) {
            (Some(fast), Some(slow)) => round2(fast.min(slow)),
            _ => None,
        };
        self.quality
    }

    pub fn quality(&self) -> Option<f64> {
        self.quality
    }

    pub fn reset(&mut self) {
        self.fast.reset();
        self.slow.reset();
        self.quality = None;
    }
}

fn round2(value: f64) -> Option<f64> {
    let rounded = (value * 100.0).round() / 100.0;
    rounded.is_finite().then_some(rounded)
}
