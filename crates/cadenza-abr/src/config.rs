use std::{collections::HashMap, time::Duration};

use cadenza_core::TrackType;
use tokio::sync::watch;

/// Tuning knobs of the default decision unit.
#[derive(Clone, Debug)]
pub struct AbrConfig {
    /// Hysteresis ratio for down-switch.
    pub down_hysteresis_ratio: f64,
    /// Buffer level (seconds) that triggers down-switch.
    pub down_switch_buffer_secs: f64,
    /// Half-life of the fast bandwidth average, in seconds.
    pub fast_half_life_secs: f64,
    /// Segment metrics kept per track type until its unit exists; the
    /// oldest are dropped first.
    pub max_backlog_metrics: usize,
    /// Minimum buffer level (seconds) required for up-switch.
    pub min_buffer_for_up_switch_secs: f64,
    /// Downloads smaller than this are too noisy to estimate bandwidth from.
    pub min_chunk_bytes: u64,
    /// Lower clamp applied to download durations.
    pub min_sample_duration: Duration,
    /// Minimum interval between variant switches.
    pub min_switch_interval: Duration,
    /// Half-life of the slow bandwidth average, in seconds.
    pub slow_half_life_secs: f64,
    /// Buffer level (seconds) at or below which in-flight requests are
    /// inspected and decisions become urgent.
    pub starvation_gap_secs: f64,
    /// Safety factor for throughput estimation (e.g., 1.5 means use 66% of estimated throughput).
    pub throughput_safety_factor: f64,
    /// Hysteresis ratio for up-switch (bandwidth must exceed target by this factor).
    pub up_hysteresis_ratio: f64,
}

impl Default for AbrConfig {
    fn default() -> Self {
        Self {
            down_hysteresis_ratio: 0.8,
            down_switch_buffer_secs: 5.0,
            fast_half_life_secs: 2.0,
            max_backlog_metrics: 32,
            min_buffer_for_up_switch_secs: 10.0,
            min_chunk_bytes: 16_000,
            min_sample_duration: Duration::from_micros(500),
            min_switch_interval: Duration::from_secs(30),
            slow_half_life_secs: 10.0,
            starvation_gap_secs: 2.0,
            throughput_safety_factor: 1.5,
            up_hysteresis_ratio: 1.3,
        }
    }
}

/// Per-track-type options handed to the coordinator at construction.
///
/// `limit_width` and `throttle` are live values: the decision unit reads the
/// latest value of the watch channel on every clock tick.
#[derive(Clone, Default)]
pub struct AbrOptions {
    pub config: AbrConfig,
    /// Widest representation (pixels) automatic selection may pick.
    pub limit_width: HashMap<TrackType, watch::Receiver<Option<u32>>>,
    /// Temporary bitrate cap for automatic selection.
    pub throttle: HashMap<TrackType, watch::Receiver<Option<u64>>>,
    /// Bitrate used to pick a representation before any bandwidth estimate exists.
    pub initial_bitrate: HashMap<TrackType, u64>,
    pub manual_bitrate: HashMap<TrackType, u64>,
    pub max_auto_bitrate: HashMap<TrackType, u64>,
}

impl AbrOptions {
    #[must_use]
    pub fn with_config(mut self, config: AbrConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_limit_width(
        mut self,
        track_type: TrackType,
        width: watch::Receiver<Option<u32>>,
    ) -> Self {
        self.limit_width.insert(track_type, width);
        self
    }

    #[must_use]
    pub fn with_throttle(
        mut self,
        track_type: TrackType,
        bitrate: watch::Receiver<Option<u64>>,
    ) -> Self {
        self.throttle.insert(track_type, bitrate);
        self
    }

    #[must_use]
    pub fn with_initial_bitrate(mut self, track_type: TrackType, bitrate: u64) -> Self {
        self.initial_bitrate.insert(track_type, bitrate);
        self
    }

    #[must_use]
    pub fn with_manual_bitrate(mut self, track_type: TrackType, bitrate: u64) -> Self {
        self.manual_bitrate.insert(track_type, bitrate);
        self
    }

    #[must_use]
    pub fn with_max_auto_bitrate(mut self, track_type: TrackType, bitrate: u64) -> Self {
        self.max_auto_bitrate.insert(track_type, bitrate);
        self
    }
}

impl std::fmt::Debug for AbrOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbrOptions")
            .field("config", &self.config)
            .field("limit_width", &self.limit_width.keys().collect::<Vec<_>>())
            .field("throttle", &self.throttle.keys().collect::<Vec<_>>())
            .field("initial_bitrate", &self.initial_bitrate)
            .field("manual_bitrate", &self.manual_bitrate)
            .field("max_auto_bitrate", &self.max_auto_bitrate)
            .finish()
    }
}
