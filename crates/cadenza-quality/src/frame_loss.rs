use crate::FrameCounters;

/// Ratio of dropped to decoded frames between two consecutive samples.
#[derive(Clone, Debug, Default)]
pub struct FrameLossSampler {
    baseline: Option<FrameCounters>,
}

impl FrameLossSampler {
    /// Take `counters` as the baseline of the next sample.
    pub fn prime(&mut self, counters: Option<FrameCounters>) {
        if counters.is_some() {
            self.baseline = counters;
        }
    }

    /// Frame loss since the previous sample, in `[0, 1]`.
    ///
    /// `None` when counters are missing, no frame was decoded in between, or
    /// the counters went backwards (the surface was reset). Present counters
    /// always become the new baseline.
    #[expect(clippy::cast_precision_loss)] // frame counts stay far below 2^52
    pub fn sample(&mut self, counters: Option<FrameCounters>) -> Option<f64> {
        let current = counters?;
        let previous = self.baseline.replace(current)?;

        if current.decoded < previous.decoded || current.dropped < previous.dropped {
            tracing::trace!(?previous, ?current, "frame counters went backwards");
            return None;
        }
        let decoded = current.decoded - previous.decoded;
        if decoded == 0 {
            return None;
        }
        let dropped = current.dropped - previous.dropped;
        Some((dropped as f64 / decoded as f64).min(1.0))
    }

    pub fn baseline(&self) -> Option<FrameCounters> {
        self.baseline
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn counters(decoded: u64, dropped: u64) -> Option<FrameCounters> {
        Some(FrameCounters::new(decoded, dropped))
    }

    #[rstest]
    #[case(counters(100, 5), Some(0.05))]
    #[case(counters(100, 0), Some(0.0))]
    #[case(counters(0, 0), None)]
    #[case(counters(0, 3), None)]
    #[case(counters(10, 50), Some(1.0))]
    fn loss_over_interval(#[case] delta: Option<FrameCounters>, #[case] expected: Option<f64>) {
        let mut sampler = FrameLossSampler::default();
        sampler.prime(counters(1_000, 10));

        let delta = delta.unwrap();
        let loss = sampler.sample(counters(1_000 + delta.decoded, 10 + delta.dropped));
        assert_eq!(loss, expected);
    }

    #[test]
    fn missing_counters_keep_the_baseline() {
        let mut sampler = FrameLossSampler::default();
        sampler.prime(counters(100, 0));

        assert_eq!(sampler.sample(None), None);
        assert_eq!(sampler.baseline(), counters(100, 0));
        assert_eq!(sampler.sample(counters(200, 10)), Some(0.1));
    }

    #[test]
    fn unprimed_sampler_only_records() {
        let mut sampler = FrameLossSampler::default();
        assert_eq!(sampler.sample(counters(100, 1)), None);
        assert_eq!(sampler.sample(counters(200, 2)), Some(0.01));
    }

    #[test]
    fn reset_surface_rebaselines() {
        let mut sampler = FrameLossSampler::default();
        sampler.prime(counters(5_000, 40));

        assert_eq!(sampler.sample(counters(10, 0)), None);
        assert_eq!(sampler.baseline(), counters(10, 0));
        assert_eq!(sampler.sample(counters(110, 20)), Some(0.2));
    }
}
