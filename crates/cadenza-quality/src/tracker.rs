use std::collections::HashMap;

use cadenza_core::{Adaptation, Period, StreamId};

use crate::{
    BufferQuery, FrameLossSampler, PlaybackSurface, QualityConfig, QualityMap, QualityMeans,
};

/// The track whose representations are rated.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackContent {
    pub period: Period,
    pub adaptation: Adaptation,
}

impl TrackContent {
    pub fn new(period: Period, adaptation: Adaptation) -> Self {
        Self { period, adaptation }
    }
}

/// Quality state of one track, advanced one playback tick at a time.
#[derive(Debug)]
pub struct QualityTracker {
    content: TrackContent,
    config: QualityConfig,
    sampler: FrameLossSampler,
    last_position: Option<f64>,
    means: HashMap<StreamId, QualityMeans>,
    last_emitted: Option<QualityMap>,
}

impl QualityTracker {
    pub fn new(content: TrackContent, config: QualityConfig) -> Self {
        Self {
            content,
            config,
            sampler: FrameLossSampler::default(),
            last_position: None,
            means: HashMap::new(),
            last_emitted: None,
        }
    }

    /// Process the tick at `position_secs`.
    ///
    /// Returns the per-representation qualities when they differ from the
    /// last returned map.
    pub fn on_tick(
        &mut self,
        position_secs: f64,
        surface: &dyn PlaybackSurface,
        buffer: &dyn BufferQuery,
    ) -> Option<QualityMap> {
        let Some(last_position) = self.last_position.replace(position_secs) else {
            self.sampler.prime(surface.frame_counters());
            return None;
        };
        let sample_duration = position_secs - last_position;
        if sample_duration.is_nan() || sample_duration <= 0.0 {
            tracing::trace!(position_secs, last_position, "no playback progress");
            return None;
        }

        let frame_loss = self.sampler.sample(surface.frame_counters());
        let local_quality = frame_loss.map(|loss| 1.0 - loss);
        let buffered = buffer.buffered_streams(last_position..position_secs);
        let played = match buffered.as_slice() {
            [only] => Some(only),
            _ => None,
        };
        tracing::trace!(
            adaptation = %self.content.adaptation.id,
            sample_duration,
            ?frame_loss,
            buffered = buffered.len(),
            "quality sample"
        );

        let mut qualities = QualityMap::default();
        for representation in &self.content.adaptation.representations {
            let id = StreamId::new(&self.content.period, &self.content.adaptation, representation);
            let is_played = played == Some(&id);
            let is_buffered = is_played || buffered.contains(&id);
            let means = self
                .means
                .entry(id)
                .or_insert_with(|| QualityMeans::new(&self.config));

            let quality = match local_quality {
                Some(local) if is_played => means.add_sample(sample_duration, local),
                _ if !is_buffered => {
                    means.reset();
                    None
                }
                _ => means.quality(),
            };
            qualities.insert(representation.id.clone(), quality);
        }

        if self
            .last_emitted
            .as_ref()
            .is_some_and(|last| last.same_as(&qualities))
        {
            return None;
        }
        tracing::debug!(
            adaptation = %self.content.adaptation.id,
            ?qualities,
            "playback qualities"
        );
        self.last_emitted = Some(qualities.clone());
        Some(qualities)
    }
}
