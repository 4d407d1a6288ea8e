use cadenza_core::{Representation, TrackType};
use tokio::sync::watch;
use web_time::Instant;

use crate::{
    AbrConfig, AbrEstimation, AbrReason, BitrateBounds, BufferEvent, ClockTick, Estimator,
    PendingRequests, RequestEvent, SegmentMetric, SharedBounds, ThroughputEstimator,
    ThroughputSample,
    selection::{filter_by_bitrate, filter_by_width, select_by_ceiling},
};

/// Per-track decision state driven by routed telemetry and clock ticks.
///
/// All methods are called with the unit's lock held, one event at a time.
pub trait DecisionUnit {
    fn on_request(&mut self, event: RequestEvent);

    fn on_metric(&mut self, metric: &SegmentMetric);

    fn on_buffer_event(&mut self, event: &BufferEvent);

    /// Choose a representation among `representations` for this tick.
    ///
    /// Returns `None` when there is nothing to choose from.
    fn on_clock_tick(
        &mut self,
        representations: &[Representation],
        tick: &ClockTick,
    ) -> Option<AbrEstimation>;
}

/// Everything a decision unit receives from the coordinator when it is created.
#[derive(Clone, Debug)]
pub struct UnitContext {
    pub track_type: TrackType,
    pub config: AbrConfig,
    pub bounds: SharedBounds,
    pub initial_bitrate: Option<u64>,
    pub limit_width: Option<watch::Receiver<Option<u32>>>,
    pub throttle: Option<watch::Receiver<Option<u64>>>,
}

#[derive(Debug)]
struct AutoDecision {
    representation: Representation,
    reason: AbrReason,
    estimate: Option<u64>,
    urgent: bool,
}

/// Default [`DecisionUnit`]: throughput-based choice with buffer-aware
/// hysteresis, bounded by manual/automatic ceilings, width limit and throttle.
pub struct RepresentationChooser<E: Estimator = ThroughputEstimator> {
    ctx: UnitContext,
    estimator: E,
    pending: PendingRequests,
    current: Option<String>,
    last_switch_at: Option<Instant>,
}

impl RepresentationChooser<ThroughputEstimator> {
    pub fn new(ctx: UnitContext) -> Self {
        let estimator = ThroughputEstimator::new(&ctx.config);
        Self::with_estimator(ctx, estimator)
    }
}

impl<E: Estimator> RepresentationChooser<E> {
    pub fn with_estimator(ctx: UnitContext, estimator: E) -> Self {
        Self {
            ctx,
            estimator,
            pending: PendingRequests::default(),
            current: None,
            last_switch_at: None,
        }
    }

    /// Id of the representation chosen last (or reported by the buffer).
    pub fn current_representation(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn pending_requests(&self) -> &PendingRequests {
        &self.pending
    }

    fn can_switch_now(&self, now: Instant) -> bool {
        self.last_switch_at
            .is_none_or(|t| now.saturating_duration_since(t) >= self.ctx.config.min_switch_interval)
    }

    fn automatic_candidates<'a>(
        &self,
        representations: &'a [Representation],
        bounds: &BitrateBounds,
    ) -> Vec<&'a Representation> {
        let mut candidates: Vec<&Representation> = representations.iter().collect();

        if let Some(width) = self.ctx.limit_width.as_ref().and_then(|rx| *rx.borrow()) {
            candidates = filter_by_width(candidates, width);
        }

        let throttle = self.ctx.throttle.as_ref().and_then(|rx| *rx.borrow());
        let ceiling = [bounds.max_auto_bitrate, throttle].into_iter().flatten().min();
        if let Some(ceiling) = ceiling {
            candidates = filter_by_bitrate(candidates, ceiling);
        }
        candidates
    }

    /// Bandwidth estimate for this tick, capped by in-flight requests when
    /// the buffer is starving.
    fn estimate_for(&self, tick: &ClockTick) -> (Option<u64>, bool) {
        let estimate = self.estimator.estimate_bps();
        if tick.drain_secs() > self.ctx.config.starvation_gap_secs {
            return (estimate, false);
        }

        let overdue = self.pending.overdue(tick.at).next().is_some();
        match (estimate, self.pending.slowest_bandwidth()) {
            (Some(est), Some(in_flight)) if in_flight < est => (Some(in_flight), true),
            (None, Some(in_flight)) => (Some(in_flight), true),
            (estimate, _) => (estimate, overdue),
        }
    }

    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "bitrate precision loss is negligible for ABR"
    )]
    fn decide_auto(
        &self,
        candidates: &[&Representation],
        tick: &ClockTick,
    ) -> Option<AutoDecision> {
        let cfg = &self.ctx.config;
        let current = self
            .current
            .as_deref()
            .and_then(|id| candidates.iter().copied().find(|r| r.id == id));
        let (estimate, urgent) = self.estimate_for(tick);

        let decision = |representation: &Representation, reason| AutoDecision {
            representation: representation.clone(),
            reason,
            estimate,
            urgent,
        };
        let lost_reason = if self.current.is_some() {
            AbrReason::Constrained
        } else {
            AbrReason::Initial
        };

        let Some(estimate_bps) = estimate else {
            if let Some(current) = current {
                return Some(decision(current, AbrReason::NoEstimate));
            }
            let initial = self.ctx.initial_bitrate.unwrap_or(0);
            return select_by_ceiling(candidates, initial).map(|r| decision(r, lost_reason));
        };

        let adjusted_bps = (estimate_bps as f64 / cfg.throughput_safety_factor).max(0.0);
        let target = select_by_ceiling(candidates, adjusted_bps as u64)?;

        tracing::debug!(
            track_type = %self.ctx.track_type,
            current = ?self.current,
            estimate_bps,
            adjusted_bps,
            buffer_gap_secs = tick.buffer_gap_secs,
            urgent,
            target = %target.id,
            "ABR decide: evaluating"
        );

        let Some(current) = current else {
            return Some(decision(target, lost_reason));
        };

        if target.bitrate > current.bitrate {
            if !self.can_switch_now(tick.at) {
                return Some(decision(current, AbrReason::MinInterval));
            }
            let buffer_ok = cfg.min_buffer_for_up_switch_secs <= 0.0
                || tick.buffer_gap_secs >= cfg.min_buffer_for_up_switch_secs;
            let headroom_ok = adjusted_bps >= (target.bitrate as f64) * cfg.up_hysteresis_ratio;
            if buffer_ok && headroom_ok {
                return Some(decision(target, AbrReason::UpSwitch));
            }
            return Some(decision(current, AbrReason::BufferTooLowForUpSwitch));
        }

        if target.bitrate < current.bitrate {
            if urgent {
                return Some(decision(target, AbrReason::DownSwitch));
            }
            if !self.can_switch_now(tick.at) {
                return Some(decision(current, AbrReason::MinInterval));
            }
            let low_buffer = tick.buffer_gap_secs <= cfg.down_switch_buffer_secs;
            let margin_ok = adjusted_bps <= (current.bitrate as f64) * cfg.down_hysteresis_ratio;
            if low_buffer || margin_ok {
                return Some(decision(target, AbrReason::DownSwitch));
            }
        }

        Some(decision(current, AbrReason::AlreadyOptimal))
    }

    fn commit(&mut self, representation: &Representation, reason: AbrReason, now: Instant) {
        if self.current.as_deref() == Some(representation.id.as_str()) {
            return;
        }
        if matches!(
            reason,
            AbrReason::UpSwitch | AbrReason::DownSwitch | AbrReason::Constrained
        ) {
            self.last_switch_at = Some(now);
        }
        tracing::debug!(
            track_type = %self.ctx.track_type,
            from = ?self.current,
            to = %representation.id,
            ?reason,
            "ABR representation changed"
        );
        self.current = Some(representation.id.clone());
    }
}

impl<E: Estimator> DecisionUnit for RepresentationChooser<E> {
    fn on_request(&mut self, event: RequestEvent) {
        self.pending.apply(event);
    }

    fn on_metric(&mut self, metric: &SegmentMetric) {
        tracing::trace!(
            track_type = %self.ctx.track_type,
            representation = %metric.content.representation_id,
            size_bytes = metric.size_bytes,
            duration = ?metric.duration,
            "segment metric"
        );
        self.estimator.push_sample(ThroughputSample::from(metric));
    }

    fn on_buffer_event(&mut self, event: &BufferEvent) {
        match event {
            BufferEvent::RepresentationChange { representation_id } => {
                self.current = Some(representation_id.clone());
            }
            BufferEvent::Seeked => self.pending.clear(),
        }
    }

    fn on_clock_tick(
        &mut self,
        representations: &[Representation],
        tick: &ClockTick,
    ) -> Option<AbrEstimation> {
        if representations.is_empty() {
            return None;
        }
        let bounds = *self.ctx.bounds.read();

        if let Some(manual) = bounds.manual_bitrate {
            let chosen = select_by_ceiling(representations, manual)?.clone();
            self.commit(&chosen, AbrReason::ManualOverride, tick.at);
            return Some(AbrEstimation {
                bitrate: chosen.bitrate,
                representation: chosen,
                bandwidth_estimate: self.estimator.estimate_bps(),
                manual: true,
                urgent: false,
                reason: AbrReason::ManualOverride,
            });
        }

        let candidates = self.automatic_candidates(representations, &bounds);
        let decision = self.decide_auto(&candidates, tick)?;
        self.commit(&decision.representation, decision.reason, tick.at);

        Some(AbrEstimation {
            bitrate: decision.representation.bitrate,
            representation: decision.representation,
            bandwidth_estimate: decision.estimate,
            manual: false,
            urgent: decision.urgent,
            reason: decision.reason,
        })
    }
}
