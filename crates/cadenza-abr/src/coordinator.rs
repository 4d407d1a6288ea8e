use std::{collections::HashMap, pin::Pin, sync::Arc};

use cadenza_core::{Representation, TrackType};
use futures::{Stream, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::{
    AbrError, AbrEstimation, AbrOptions, AbrRequest, AbrResult, BitrateBounds, BufferEvent,
    ClockTick, DecisionUnit, RepresentationChooser, RequestEvent, SegmentMetric, SharedBounds,
    UnitContext,
};

/// Stream of estimations for one track type.
pub type EstimationStream = Pin<Box<dyn Stream<Item = AbrEstimation> + Send>>;

/// Builds the decision unit of a track type the first time it is needed.
pub type UnitFactory = Arc<dyn Fn(UnitContext) -> Box<dyn DecisionUnit + Send> + Send + Sync>;

type UnitHandle = Arc<Mutex<Box<dyn DecisionUnit + Send>>>;

enum Telemetry {
    Request(RequestEvent),
    Metric(SegmentMetric),
}

/// Telemetry received for a track type whose unit does not exist yet.
///
/// Only the latest progress of a request is kept, and at most `max_metrics`
/// segment metrics.
struct Backlog {
    events: Vec<Telemetry>,
    metrics: usize,
    max_metrics: usize,
}

impl Backlog {
    fn new(max_metrics: usize) -> Self {
        Self {
            events: Vec::new(),
            metrics: 0,
            max_metrics,
        }
    }

    fn push_request(&mut self, event: RequestEvent) {
        match &event {
            RequestEvent::End { id } => {
                let before = self.events.len();
                self.events
                    .retain(|t| !matches!(t, Telemetry::Request(e) if e.id() == *id));
                if self.events.len() != before {
                    // Begin..End completed before anyone asked: nothing left pending
                    return;
                }
            }
            RequestEvent::Progress(progress) => {
                let earlier = self.events.iter_mut().find_map(|t| match t {
                    Telemetry::Request(RequestEvent::Progress(p)) if p.id == progress.id => {
                        Some(p)
                    }
                    _ => None,
                });
                if let Some(earlier) = earlier {
                    *earlier = progress.clone();
                    return;
                }
            }
            RequestEvent::Begin(_) => {}
        }
        self.events.push(Telemetry::Request(event));
    }

    fn push_metric(&mut self, metric: SegmentMetric) {
        if self.max_metrics == 0 {
            return;
        }
        if self.metrics == self.max_metrics {
            if let Some(oldest) = self
                .events
                .iter()
                .position(|t| matches!(t, Telemetry::Metric(_)))
            {
                self.events.remove(oldest);
                self.metrics -= 1;
            }
        }
        self.events.push(Telemetry::Metric(metric));
        self.metrics += 1;
    }

    fn len(&self) -> usize {
        self.events.len()
    }

    fn replay_into(self, unit: &mut dyn DecisionUnit) {
        for event in self.events {
            match event {
                Telemetry::Request(event) => unit.on_request(event),
                Telemetry::Metric(metric) => unit.on_metric(&metric),
            }
        }
    }
}

#[derive(Default)]
struct Units {
    active: HashMap<TrackType, UnitHandle>,
    backlog: HashMap<TrackType, Backlog>,
    bounds: HashMap<TrackType, SharedBounds>,
}

struct Shared {
    options: AbrOptions,
    factory: UnitFactory,
    units: Mutex<Units>,
    cancel: CancellationToken,
}

impl Shared {
    fn ensure_active(&self) -> AbrResult<()> {
        if self.cancel.is_cancelled() {
            return Err(AbrError::Disposed);
        }
        Ok(())
    }

    fn bounds(&self, track_type: TrackType) -> AbrResult<SharedBounds> {
        self.ensure_active()?;
        let mut units = self.units.lock();
        Ok(self.bounds_in(&mut units, track_type))
    }

    fn bounds_in(&self, units: &mut Units, track_type: TrackType) -> SharedBounds {
        units
            .bounds
            .entry(track_type)
            .or_insert_with(|| {
                Arc::new(RwLock::new(BitrateBounds {
                    manual_bitrate: self.options.manual_bitrate.get(&track_type).copied(),
                    max_auto_bitrate: self.options.max_auto_bitrate.get(&track_type).copied(),
                }))
            })
            .clone()
    }

    /// Get-or-create the unit of `track_type`, replaying its backlog on creation.
    fn unit_for(&self, track_type: TrackType) -> AbrResult<UnitHandle> {
        self.ensure_active()?;
        let mut guard = self.units.lock();
        let units = &mut *guard;
        if let Some(unit) = units.active.get(&track_type) {
            return Ok(Arc::clone(unit));
        }

        let ctx = UnitContext {
            track_type,
            config: self.options.config.clone(),
            bounds: self.bounds_in(units, track_type),
            initial_bitrate: self.options.initial_bitrate.get(&track_type).copied(),
            limit_width: self.options.limit_width.get(&track_type).cloned(),
            throttle: self.options.throttle.get(&track_type).cloned(),
        };
        let mut unit = (self.factory)(ctx);
        if let Some(backlog) = units.backlog.remove(&track_type) {
            tracing::debug!(
                %track_type,
                events = backlog.len(),
                "replaying telemetry backlog"
            );
            backlog.replay_into(unit.as_mut());
        }

        let handle = Arc::new(Mutex::new(unit));
        units.active.insert(track_type, Arc::clone(&handle));
        tracing::debug!(%track_type, "decision unit created");
        Ok(handle)
    }

    fn route_request(&self, request: AbrRequest) {
        let mut guard = self.units.lock();
        if self.cancel.is_cancelled() {
            return;
        }
        let units = &mut *guard;
        if let Some(unit) = units.active.get(&request.track_type) {
            unit.lock().on_request(request.event);
            return;
        }
        let max_metrics = self.options.config.max_backlog_metrics;
        units
            .backlog
            .entry(request.track_type)
            .or_insert_with(|| Backlog::new(max_metrics))
            .push_request(request.event);
    }

    fn route_metric(&self, metric: SegmentMetric) {
        let mut guard = self.units.lock();
        if self.cancel.is_cancelled() {
            return;
        }
        let units = &mut *guard;
        if let Some(unit) = units.active.get(&metric.track_type) {
            unit.lock().on_metric(&metric);
            return;
        }
        let max_metrics = self.options.config.max_backlog_metrics;
        units
            .backlog
            .entry(metric.track_type)
            .or_insert_with(|| Backlog::new(max_metrics))
            .push_metric(metric);
    }
}

/// Owns one [`DecisionUnit`] per track type for a playback session.
///
/// Construction spawns a routing task on the current tokio runtime which
/// forwards every request-lifecycle event and segment metric to the unit of
/// its track type. Telemetry for a track type without a unit is kept and
/// replayed when the unit is created.
///
/// After [`dispose`](Self::dispose) (or drop) every method returns
/// [`AbrError::Disposed`] and all estimation streams end.
pub struct AbrCoordinator {
    shared: Arc<Shared>,
}

impl AbrCoordinator {
    /// Start routing telemetry with the default [`RepresentationChooser`] units.
    ///
    /// `requests` yields one sub-stream per segment request.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn new<Q, R, M>(requests: Q, metrics: M, options: AbrOptions) -> Self
    where
        Q: Stream<Item = R> + Send + 'static,
        R: Stream<Item = AbrRequest> + Send + Unpin + 'static,
        M: Stream<Item = SegmentMetric> + Send + 'static,
    {
        let factory: UnitFactory = Arc::new(|ctx: UnitContext| -> Box<dyn DecisionUnit + Send> {
            Box::new(RepresentationChooser::new(ctx))
        });
        Self::with_factory(requests, metrics, options, factory)
    }

    /// Same as [`new`](Self::new) with custom decision units.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn with_factory<Q, R, M>(
        requests: Q,
        metrics: M,
        options: AbrOptions,
        factory: UnitFactory,
    ) -> Self
    where
        Q: Stream<Item = R> + Send + 'static,
        R: Stream<Item = AbrRequest> + Send + Unpin + 'static,
        M: Stream<Item = SegmentMetric> + Send + 'static,
    {
        tracing::debug!(?options, "ABR coordinator created");
        let shared = Arc::new(Shared {
            options,
            factory,
            units: Mutex::new(Units::default()),
            cancel: CancellationToken::new(),
        });
        tokio::spawn(route_telemetry(Arc::clone(&shared), requests, metrics));
        Self { shared }
    }

    /// Estimations of the unit of `track_type`, driven by `clock` and `buffer_events`.
    ///
    /// Creates the unit on first call; later calls share it (and its bounds).
    /// The stream emits when the chosen representation, the manual flag or
    /// the urgency changes, and ends when `clock` ends or the coordinator is
    /// disposed. Without representations it never emits.
    pub fn decision_stream_for<C, B>(
        &self,
        track_type: TrackType,
        representations: Option<Vec<Representation>>,
        clock: C,
        buffer_events: B,
    ) -> AbrResult<EstimationStream>
    where
        C: Stream<Item = ClockTick> + Send + 'static,
        B: Stream<Item = BufferEvent> + Send + 'static,
    {
        let unit = self.shared.unit_for(track_type)?;
        let cancel = self.shared.cancel.child_token();
        Ok(Box::pin(estimations(
            track_type,
            unit,
            representations.unwrap_or_default(),
            clock,
            buffer_events,
            cancel,
        )))
    }

    /// Select the highest representation not above `bitrate` (or the lowest
    /// one) from now on, bypassing automatic selection.
    pub fn set_manual_bitrate(&self, track_type: TrackType, bitrate: u64) -> AbrResult<()> {
        self.shared.bounds(track_type)?.write().manual_bitrate = Some(bitrate);
        tracing::debug!(%track_type, bitrate, "manual bitrate set");
        Ok(())
    }

    /// Return `track_type` to automatic selection.
    pub fn clear_manual_bitrate(&self, track_type: TrackType) -> AbrResult<()> {
        self.shared.bounds(track_type)?.write().manual_bitrate = None;
        tracing::debug!(%track_type, "manual bitrate cleared");
        Ok(())
    }

    /// Cap automatic selection. Does not affect a manual bitrate.
    pub fn set_max_auto_bitrate(&self, track_type: TrackType, bitrate: u64) -> AbrResult<()> {
        self.shared.bounds(track_type)?.write().max_auto_bitrate = Some(bitrate);
        tracing::debug!(%track_type, bitrate, "max auto bitrate set");
        Ok(())
    }

    pub fn clear_max_auto_bitrate(&self, track_type: TrackType) -> AbrResult<()> {
        self.shared.bounds(track_type)?.write().max_auto_bitrate = None;
        Ok(())
    }

    pub fn get_manual_bitrate(&self, track_type: TrackType) -> AbrResult<Option<u64>> {
        Ok(self.shared.bounds(track_type)?.read().manual_bitrate)
    }

    pub fn get_max_auto_bitrate(&self, track_type: TrackType) -> AbrResult<Option<u64>> {
        Ok(self.shared.bounds(track_type)?.read().max_auto_bitrate)
    }

    /// Track types that currently own a decision unit, in sorted order.
    pub fn active_track_types(&self) -> Vec<TrackType> {
        let mut types: Vec<_> = self.shared.units.lock().active.keys().copied().collect();
        types.sort();
        types
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Stop routing, release every unit and end every estimation stream.
    pub fn dispose(&self) {
        if self.shared.cancel.is_cancelled() {
            return;
        }
        let mut units = self.shared.units.lock();
        self.shared.cancel.cancel();
        units.active.clear();
        units.backlog.clear();
        units.bounds.clear();
        tracing::debug!("ABR coordinator disposed");
    }
}

impl Drop for AbrCoordinator {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn route_telemetry<Q, R, M>(shared: Arc<Shared>, requests: Q, metrics: M)
where
    Q: Stream<Item = R> + Send + 'static,
    R: Stream<Item = AbrRequest> + Send + Unpin + 'static,
    M: Stream<Item = SegmentMetric> + Send + 'static,
{
    let requests = requests.flatten_unordered(None).fuse();
    let metrics = metrics.fuse();
    tokio::pin!(requests, metrics);

    loop {
        tokio::select! {
            biased;
            () = shared.cancel.cancelled() => break,
            Some(request) = requests.next() => shared.route_request(request),
            Some(metric) = metrics.next() => shared.route_metric(metric),
        }
    }
    tracing::trace!("telemetry routing stopped");
}

enum Step {
    Idle,
    Tick(Option<AbrEstimation>),
    Stop,
}

fn estimations<C, B>(
    track_type: TrackType,
    unit: UnitHandle,
    representations: Vec<Representation>,
    clock: C,
    buffer_events: B,
    cancel: CancellationToken,
) -> impl Stream<Item = AbrEstimation> + Send
where
    C: Stream<Item = ClockTick> + Send + 'static,
    B: Stream<Item = BufferEvent> + Send + 'static,
{
    async_stream::stream! {
        let clock = clock.fuse();
        let buffer_events = buffer_events.fuse();
        tokio::pin!(clock, buffer_events);
        let mut last: Option<AbrEstimation> = None;

        loop {
            let step = tokio::select! {
                biased;
                () = cancel.cancelled() => Step::Stop,
                Some(event) = buffer_events.next() => {
                    unit.lock().on_buffer_event(&event);
                    Step::Idle
                }
                tick = clock.next() => match tick {
                    Some(tick) => Step::Tick(unit.lock().on_clock_tick(&representations, &tick)),
                    None => Step::Stop,
                },
            };

            match step {
                Step::Stop => break,
                Step::Idle | Step::Tick(None) => {}
                Step::Tick(Some(estimation)) => {
                    if last.as_ref().is_some_and(|prev| prev.same_choice(&estimation)) {
                        continue;
                    }
                    if cancel.is_cancelled() {
                        break;
                    }
                    tracing::debug!(
                        %track_type,
                        representation = %estimation.representation.id,
                        bitrate = estimation.bitrate,
                        manual = estimation.manual,
                        urgent = estimation.urgent,
                        reason = ?estimation.reason,
                        "ABR estimation"
                    );
                    last = Some(estimation.clone());
                    yield estimation;
                }
            }
        }
    }
}
