/// Smoothing of quality samples.
#[derive(Clone, Debug, PartialEq)]
pub struct QualityConfig {
    /// Half-life of the fast average, in seconds of playback.
    pub fast_half_life_secs: f64,
    /// Half-life of the slow average, in seconds of playback.
    pub slow_half_life_secs: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            fast_half_life_secs: 2.0,
            slow_half_life_secs: 10.0,
        }
    }
}

impl QualityConfig {
    #[must_use]
    pub fn with_fast_half_life(mut self, secs: f64) -> Self {
        self.fast_half_life_secs = secs;
        self
    }

    #[must_use]
    pub fn with_slow_half_life(mut self, secs: f64) -> Self {
        self.slow_half_life_secs = secs;
        self
    }
}
