/// Cumulative decode counters reported by a playback surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameCounters {
    pub decoded: u64,
    pub dropped: u64,
}

impl FrameCounters {
    pub fn new(decoded: u64, dropped: u64) -> Self {
        Self { decoded, dropped }
    }
}

/// The element media is rendered to.
#[cfg_attr(test, unimock::unimock(api = PlaybackSurfaceMock))]
pub trait PlaybackSurface {
    /// Whether this surface reports decode counters at all.
    fn supports_frame_counters(&self) -> bool;

    /// Current counters, `None` when momentarily unavailable.
    fn frame_counters(&self) -> Option<FrameCounters>;
}
