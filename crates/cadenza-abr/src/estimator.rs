use cadenza_core::Ewma;

use crate::{AbrConfig, ThroughputSample};

/// Trait for bandwidth estimation strategies.
///
/// Allows testing the representation chooser with mock estimators.
#[cfg_attr(test, unimock::unimock(api = EstimatorMock))]
pub trait Estimator {
    /// Get estimated throughput in bits per second.
    fn estimate_bps(&self) -> Option<u64>;

    /// Push a new throughput sample for estimation.
    fn push_sample(&mut self, sample: ThroughputSample);
}

/// Dual-timescale throughput estimator.
///
/// The reported estimate is the lower of the fast and slow averages, so a
/// single fast download does not immediately lift the estimate.
#[derive(Clone, Debug)]
pub struct ThroughputEstimator {
    fast_ewma: Ewma,
    slow_ewma: Ewma,
    bytes_sampled: u64,
    min_chunk_bytes: u64,
    min_duration_secs: f64,
}

impl ThroughputEstimator {
    pub fn new(cfg: &AbrConfig) -> Self {
        Self {
            fast_ewma: Ewma::new(cfg.fast_half_life_secs),
            slow_ewma: Ewma::new(cfg.slow_half_life_secs),
            bytes_sampled: 0,
            min_chunk_bytes: cfg.min_chunk_bytes,
            min_duration_secs: cfg.min_sample_duration.as_secs_f64(),
        }
    }

    pub fn bytes_sampled(&self) -> u64 {
        self.bytes_sampled
    }
}

impl Estimator for ThroughputEstimator {
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    // estimates are positive and far below u64::MAX bits/s
    fn estimate_bps(&self) -> Option<u64> {
        let fast = self.fast_ewma.estimate()?;
        let slow = self.slow_ewma.estimate()?;
        let est = fast.min(slow);
        (est.is_finite() && est > 0.0).then(|| est.round() as u64)
    }

    fn push_sample(&mut self, sample: ThroughputSample) {
        if sample.bytes < self.min_chunk_bytes {
            tracing::trace!(bytes = sample.bytes, "throughput sample too small, ignored");
            return;
        }

        let dur_secs = sample.duration.as_secs_f64().max(self.min_duration_secs);
        #[expect(clippy::cast_precision_loss)] // byte counts precision loss is negligible here
        let bps = (sample.bytes as f64) * 8.0 / dur_secs;

        self.fast_ewma.add_sample(dur_secs, bps);
        self.slow_ewma.add_sample(dur_secs, bps);
        self.bytes_sampled = self.bytes_sampled.saturating_add(sample.bytes);
    }
}
