use std::{pin::Pin, sync::Arc};

use futures::{Stream, StreamExt, stream};
use tokio_util::sync::CancellationToken;

use crate::{BufferQuery, PlaybackSurface, QualityConfig, QualityMap, QualityTracker, TrackContent};

/// Playback clock sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackTick {
    pub position_secs: f64,
}

impl PlaybackTick {
    pub fn new(position_secs: f64) -> Self {
        Self { position_secs }
    }
}

/// Qualities of one track; `None` until something is known.
pub type QualityStream = Pin<Box<dyn Stream<Item = Option<QualityMap>> + Send>>;

/// Rates the representations being played on a surface.
pub struct PlaybackQualityEstimator {
    surface: Arc<dyn PlaybackSurface + Send + Sync>,
    config: QualityConfig,
    cancel: CancellationToken,
}

impl PlaybackQualityEstimator {
    pub fn new(surface: Arc<dyn PlaybackSurface + Send + Sync>, config: QualityConfig) -> Self {
        Self {
            surface,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Qualities of the representations of `content`, updated on every
    /// `clock` tick.
    ///
    /// The first item is always `None`. Surfaces without decode counters
    /// produce that single `None` and nothing else. The stream ends with
    /// `clock` or when the estimator is disposed.
    pub fn get_qualities<C>(
        &self,
        content: TrackContent,
        buffer: Arc<dyn BufferQuery + Send + Sync>,
        clock: C,
    ) -> QualityStream
    where
        C: Stream<Item = PlaybackTick> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            tracing::debug!("quality estimator disposed, no qualities");
            return Box::pin(stream::empty());
        }
        if !self.surface.supports_frame_counters() {
            tracing::warn!(
                adaptation = %content.adaptation.id,
                "playback quality can't be estimated: surface reports no frame counters"
            );
            return Box::pin(stream::once(async { None }));
        }

        let surface = Arc::clone(&self.surface);
        let cancel = self.cancel.child_token();
        let mut tracker = QualityTracker::new(content, self.config.clone());

        Box::pin(async_stream::stream! {
            if cancel.is_cancelled() {
                return;
            }
            yield None;

            tokio::pin!(clock);
            loop {
                let tick = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    tick = clock.next() => tick,
                };
                let Some(tick) = tick else {
                    break;
                };
                let Some(qualities) =
                    tracker.on_tick(tick.position_secs, surface.as_ref(), buffer.as_ref())
                else {
                    continue;
                };
                if cancel.is_cancelled() {
                    break;
                }
                yield Some(qualities);
            }
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// End every stream produced by [`get_qualities`](Self::get_qualities).
    pub fn dispose(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PlaybackQualityEstimator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
