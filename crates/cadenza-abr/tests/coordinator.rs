use std::{sync::Arc, time::Duration};

use cadenza_abr::{
    AbrCoordinator, AbrError, AbrEstimation, AbrOptions, AbrReason, AbrRequest, BufferEvent,
    ClockTick, DecisionUnit, RequestBegin, RequestEvent, RequestId, RequestProgress,
    SegmentContent, SegmentInfo, SegmentMetric, UnitContext, UnitFactory, selection,
};
use cadenza_core::{Representation, TrackType};
use futures::{
    StreamExt,
    stream::{self, Iter},
};
use parking_lot::Mutex;
use rstest::{fixture, rstest};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use web_time::Instant;

type RequestStream = Iter<std::vec::IntoIter<AbrRequest>>;
type Log = Arc<Mutex<Vec<(TrackType, String)>>>;

struct RecordingUnit {
    track_type: TrackType,
    log: Log,
}

impl RecordingUnit {
    fn record(&self, entry: String) {
        self.log.lock().push((self.track_type, entry));
    }
}

impl DecisionUnit for RecordingUnit {
    fn on_request(&mut self, event: RequestEvent) {
        let kind = match event {
            RequestEvent::Begin(_) => "begin",
            RequestEvent::Progress(_) => "progress",
            RequestEvent::End { .. } => "end",
        };
        self.record(format!("{kind} {}", event.id()));
    }

    fn on_metric(&mut self, metric: &SegmentMetric) {
        self.record(format!("metric {}", metric.size_bytes));
    }

    fn on_buffer_event(&mut self, event: &BufferEvent) {
        self.record(format!("buffer {event:?}"));
    }

    fn on_clock_tick(
        &mut self,
        representations: &[Representation],
        _tick: &ClockTick,
    ) -> Option<AbrEstimation> {
        let representation = selection::lowest(representations)?.clone();
        Some(AbrEstimation {
            bitrate: representation.bitrate,
            representation,
            bandwidth_estimate: None,
            manual: false,
            urgent: false,
            reason: AbrReason::Initial,
        })
    }
}

struct Harness {
    coordinator: AbrCoordinator,
    requests: mpsc::UnboundedSender<RequestStream>,
    metrics: mpsc::UnboundedSender<SegmentMetric>,
    log: Log,
}

impl Harness {
    fn recording() -> Self {
        let log: Log = Arc::default();
        let factory: UnitFactory = {
            let log = Arc::clone(&log);
            Arc::new(move |ctx: UnitContext| -> Box<dyn DecisionUnit + Send> {
                Box::new(RecordingUnit {
                    track_type: ctx.track_type,
                    log: Arc::clone(&log),
                })
            })
        };
        Self::build(
            |requests, metrics| {
                AbrCoordinator::with_factory(requests, metrics, AbrOptions::default(), factory)
            },
            log,
        )
    }

    fn with_options(options: AbrOptions) -> Self {
        Self::build(
            |requests, metrics| AbrCoordinator::new(requests, metrics, options),
            Arc::default(),
        )
    }

    fn build(
        make: impl FnOnce(
            UnboundedReceiverStream<RequestStream>,
            UnboundedReceiverStream<SegmentMetric>,
        ) -> AbrCoordinator,
        log: Log,
    ) -> Self {
        init_tracing();
        let (requests, requests_rx) = mpsc::unbounded_channel();
        let (metrics, metrics_rx) = mpsc::unbounded_channel();
        let coordinator = make(
            UnboundedReceiverStream::new(requests_rx),
            UnboundedReceiverStream::new(metrics_rx),
        );
        Self {
            coordinator,
            requests,
            metrics,
            log,
        }
    }

    fn send_request(&self, track_type: TrackType, events: Vec<RequestEvent>) {
        let events: Vec<_> = events
            .into_iter()
            .map(|event| AbrRequest { track_type, event })
            .collect();
        self.requests.send(stream::iter(events)).unwrap();
    }

    fn entries_for(&self, track_type: TrackType) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter(|(t, _)| *t == track_type)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Let the routing task drain everything queued so far.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[fixture]
fn ladder() -> Vec<Representation> {
    vec![
        Representation::new("low", 100_000),
        Representation::new("mid", 500_000),
        Representation::new("high", 1_000_000),
    ]
}

fn tick() -> ClockTick {
    ClockTick::new(0.0, 20.0, Instant::now())
}

fn begin(id: u64) -> RequestEvent {
    RequestEvent::Begin(RequestBegin {
        id: RequestId(id),
        duration_secs: 4.0,
        start_secs: 0.0,
        sent_at: Instant::now(),
    })
}

fn progress(id: u64) -> RequestEvent {
    RequestEvent::Progress(RequestProgress {
        id: RequestId(id),
        bytes: 10_000,
        at: Instant::now(),
    })
}

fn end(id: u64) -> RequestEvent {
    RequestEvent::End { id: RequestId(id) }
}

fn metric(track_type: TrackType, size_bytes: u64) -> SegmentMetric {
    SegmentMetric {
        track_type,
        duration: Duration::from_millis(500),
        size_bytes,
        content: SegmentContent {
            representation_id: "mid".to_owned(),
            adaptation_id: "a".to_owned(),
            segment: SegmentInfo {
                start_secs: 0.0,
                duration_secs: 4.0,
            },
        },
    }
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn routes_telemetry_to_the_unit_of_its_track_type(ladder: Vec<Representation>) {
    let harness = Harness::recording();
    let _video = harness
        .coordinator
        .decision_stream_for(TrackType::Video, Some(ladder), stream::pending(), stream::pending())
        .unwrap();

    harness.send_request(TrackType::Video, vec![begin(1), progress(1)]);
    harness.send_request(TrackType::Audio, vec![begin(2)]);
    settle().await;
    harness.metrics.send(metric(TrackType::Video, 42)).unwrap();
    settle().await;

    assert_eq!(
        harness.entries_for(TrackType::Video),
        vec!["begin req#1", "progress req#1", "metric 42"]
    );
    assert!(harness.entries_for(TrackType::Audio).is_empty());
    assert_eq!(harness.coordinator.active_track_types(), vec![TrackType::Video]);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn early_telemetry_is_replayed_when_the_unit_is_created(ladder: Vec<Representation>) {
    let harness = Harness::recording();
    harness.send_request(TrackType::Audio, vec![begin(1), progress(1), end(1)]);
    harness.send_request(TrackType::Audio, vec![begin(2), progress(2)]);
    settle().await;
    harness.metrics.send(metric(TrackType::Audio, 7)).unwrap();
    settle().await;
    assert!(harness.coordinator.active_track_types().is_empty());

    let _audio = harness
        .coordinator
        .decision_stream_for(TrackType::Audio, Some(ladder), stream::pending(), stream::pending())
        .unwrap();

    // the completed request leaves no trace; order is otherwise preserved
    assert_eq!(
        harness.entries_for(TrackType::Audio),
        vec!["begin req#2", "progress req#2", "metric 7"]
    );
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn buffer_events_reach_the_unit(ladder: Vec<Representation>) {
    let harness = Harness::recording();
    let (buffer_tx, buffer_rx) = mpsc::unbounded_channel();
    let (clock_tx, clock_rx) = mpsc::unbounded_channel();
    let mut video = harness
        .coordinator
        .decision_stream_for(
            TrackType::Video,
            Some(ladder),
            UnboundedReceiverStream::new(clock_rx),
            UnboundedReceiverStream::new(buffer_rx),
        )
        .unwrap();

    buffer_tx.send(BufferEvent::Seeked).unwrap();
    clock_tx.send(tick()).unwrap();
    let first = video.next().await.unwrap();

    assert_eq!(first.representation.id, "low");
    assert_eq!(harness.entries_for(TrackType::Video), vec!["buffer Seeked"]);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn repeated_choices_are_emitted_once(ladder: Vec<Representation>) {
    let harness = Harness::recording();
    let clock = stream::iter(vec![tick(), tick(), tick()]);
    let estimations: Vec<_> = harness
        .coordinator
        .decision_stream_for(TrackType::Video, Some(ladder), clock, stream::pending())
        .unwrap()
        .collect()
        .await;

    assert_eq!(estimations.len(), 1);
    assert_eq!(estimations[0].representation.id, "low");
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn no_representations_never_emit() {
    let harness = Harness::with_options(AbrOptions::default());
    let clock = stream::iter(vec![tick(), tick()]);
    let estimations: Vec<_> = harness
        .coordinator
        .decision_stream_for(TrackType::Text, None, clock, stream::pending())
        .unwrap()
        .collect()
        .await;

    assert!(estimations.is_empty());
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn manual_bitrate_selects_highest_under_ceiling(ladder: Vec<Representation>) {
    let harness = Harness::with_options(AbrOptions::default());
    harness
        .coordinator
        .set_manual_bitrate(TrackType::Video, 700_000)
        .unwrap();

    let mut video = harness
        .coordinator
        .decision_stream_for(
            TrackType::Video,
            Some(ladder),
            stream::iter(vec![tick()]),
            stream::pending(),
        )
        .unwrap();

    let estimation = video.next().await.unwrap();
    assert_eq!(estimation.representation.id, "mid");
    assert_eq!(estimation.bitrate, 500_000);
    assert!(estimation.manual);
    assert!(video.next().await.is_none(), "stream ends with the clock");
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn streams_of_one_track_share_bounds(ladder: Vec<Representation>) {
    let harness = Harness::with_options(AbrOptions::default());
    let (clock1_tx, clock1_rx) = mpsc::unbounded_channel();
    let (clock2_tx, clock2_rx) = mpsc::unbounded_channel();
    let mut first = harness
        .coordinator
        .decision_stream_for(
            TrackType::Video,
            Some(ladder.clone()),
            UnboundedReceiverStream::new(clock1_rx),
            stream::pending(),
        )
        .unwrap();
    let mut second = harness
        .coordinator
        .decision_stream_for(
            TrackType::Video,
            Some(ladder),
            UnboundedReceiverStream::new(clock2_rx),
            stream::pending(),
        )
        .unwrap();
    assert_eq!(harness.coordinator.active_track_types(), vec![TrackType::Video]);

    // no estimate and no initial bitrate: lowest
    clock1_tx.send(tick()).unwrap();
    let initial = first.next().await.unwrap();
    assert_eq!(initial.representation.id, "low");
    assert!(!initial.manual);

    harness
        .coordinator
        .set_manual_bitrate(TrackType::Video, 700_000)
        .unwrap();

    clock1_tx.send(tick()).unwrap();
    clock2_tx.send(tick()).unwrap();
    for estimations in [&mut first, &mut second] {
        let estimation = estimations.next().await.unwrap();
        assert_eq!(estimation.representation.id, "mid");
        assert!(estimation.manual);
    }
}

#[rstest]
#[case(TrackType::Video)]
#[case(TrackType::Audio)]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn bounds_start_from_options(#[case] track_type: TrackType) {
    let options = AbrOptions::default().with_max_auto_bitrate(track_type, 800_000);
    let harness = Harness::with_options(options);
    let coordinator = &harness.coordinator;

    assert_eq!(coordinator.get_manual_bitrate(track_type), Ok(None));
    assert_eq!(coordinator.get_max_auto_bitrate(track_type), Ok(Some(800_000)));
    assert_eq!(coordinator.get_max_auto_bitrate(TrackType::Image), Ok(None));

    coordinator.set_manual_bitrate(track_type, 300_000).unwrap();
    assert_eq!(coordinator.get_manual_bitrate(track_type), Ok(Some(300_000)));
    coordinator.clear_manual_bitrate(track_type).unwrap();
    coordinator.clear_max_auto_bitrate(track_type).unwrap();
    assert_eq!(coordinator.get_manual_bitrate(track_type), Ok(None));
    assert_eq!(coordinator.get_max_auto_bitrate(track_type), Ok(None));
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn dispose_is_terminal(ladder: Vec<Representation>) {
    let harness = Harness::recording();
    let (clock_tx, clock_rx) = mpsc::unbounded_channel();
    let mut video = harness
        .coordinator
        .decision_stream_for(
            TrackType::Video,
            Some(ladder.clone()),
            UnboundedReceiverStream::new(clock_rx),
            stream::pending(),
        )
        .unwrap();

    harness.coordinator.dispose();
    harness.coordinator.dispose();
    let _ = clock_tx.send(tick());

    assert!(video.next().await.is_none());
    assert!(harness.coordinator.is_disposed());
    assert!(harness.coordinator.active_track_types().is_empty());
    assert_eq!(
        harness.coordinator.set_manual_bitrate(TrackType::Video, 1),
        Err(AbrError::Disposed)
    );
    assert_eq!(
        harness.coordinator.get_max_auto_bitrate(TrackType::Video),
        Err(AbrError::Disposed)
    );
    assert!(matches!(
        harness.coordinator.decision_stream_for(
            TrackType::Video,
            Some(ladder),
            stream::pending(),
            stream::pending(),
        ),
        Err(AbrError::Disposed)
    ));

    // telemetry after disposal goes nowhere
    let _ = harness.requests.send(stream::iter(Vec::new()));
    let _ = harness.metrics.send(metric(TrackType::Video, 1));
    settle().await;
    assert!(harness.entries_for(TrackType::Video).is_empty());
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn dropping_the_coordinator_ends_its_streams(ladder: Vec<Representation>) {
    let Harness { coordinator, .. } = Harness::with_options(AbrOptions::default());
    let mut video = coordinator
        .decision_stream_for(TrackType::Video, Some(ladder), stream::pending(), stream::pending())
        .unwrap();

    drop(coordinator);
    assert!(video.next().await.is_none());
}
