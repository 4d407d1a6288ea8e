use std::{fmt, sync::Arc, time::Duration};

use cadenza_core::{Representation, TrackType};
use parking_lot::RwLock;
use web_time::Instant;

/// Identifier of one segment request on the request-lifecycle feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RequestBegin {
    pub id: RequestId,
    /// Duration of the requested segment, in seconds.
    pub duration_secs: f64,
    /// Presentation start time of the requested segment, in seconds.
    pub start_secs: f64,
    /// When the request was sent.
    pub sent_at: Instant,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RequestProgress {
    pub id: RequestId,
    /// Bytes received so far.
    pub bytes: u64,
    pub at: Instant,
}

/// Lifecycle of one segment request.
///
/// For a given id the producer emits exactly one `Begin`, zero or more
/// `Progress` (increasing in bytes and time), then exactly one `End`
/// (success, failure or cancellation alike). A `Begin` without `End` keeps
/// its entry alive in the pending-request table.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestEvent {
    Begin(RequestBegin),
    Progress(RequestProgress),
    End { id: RequestId },
}

impl RequestEvent {
    pub fn id(&self) -> RequestId {
        match self {
            Self::Begin(begin) => begin.id,
            Self::Progress(progress) => progress.id,
            Self::End { id } => *id,
        }
    }
}

/// A [`RequestEvent`] tagged with the track it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct AbrRequest {
    pub track_type: TrackType,
    pub event: RequestEvent,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SegmentInfo {
    pub start_secs: f64,
    pub duration_secs: f64,
}

/// What a completed download contained.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentContent {
    pub representation_id: String,
    pub adaptation_id: String,
    pub segment: SegmentInfo,
}

/// Emitted once per fully downloaded segment.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentMetric {
    pub track_type: TrackType,
    /// Wall-clock time the download took.
    pub duration: Duration,
    pub size_bytes: u64,
    pub content: SegmentContent,
}

/// Playback clock sample fed to a decision unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockTick {
    /// Current playback position, in seconds.
    pub position_secs: f64,
    /// Seconds of media buffered ahead of the position.
    pub buffer_gap_secs: f64,
    /// Playback rate (1.0 = normal speed).
    pub speed: f64,
    pub at: Instant,
}

impl ClockTick {
    pub fn new(position_secs: f64, buffer_gap_secs: f64, at: Instant) -> Self {
        Self {
            position_secs,
            buffer_gap_secs,
            speed: 1.0,
            at,
        }
    }

    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Wall-clock seconds until the buffer runs dry; infinite while paused.
    pub fn drain_secs(&self) -> f64 {
        if self.speed > 0.0 {
            self.buffer_gap_secs / self.speed
        } else {
            f64::INFINITY
        }
    }
}

/// Buffer-side lifecycle signals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BufferEvent {
    /// The buffer started appending segments of this representation.
    RepresentationChange { representation_id: String },
    /// Playback jumped; in-flight requests no longer say anything about starvation.
    Seeked,
}

/// Why a representation was chosen.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AbrReason {
    Initial,
    ManualOverride,
    UpSwitch,
    DownSwitch,
    /// The current representation no longer satisfies the automatic bounds.
    Constrained,
    MinInterval,
    NoEstimate,
    BufferTooLowForUpSwitch,
    AlreadyOptimal,
}

/// One output of a decision unit.
#[derive(Clone, Debug, PartialEq)]
pub struct AbrEstimation {
    pub representation: Representation,
    /// Nominal bitrate of the chosen representation.
    pub bitrate: u64,
    /// Bandwidth estimate the choice was based on, if any.
    pub bandwidth_estimate: Option<u64>,
    /// `true` when the choice comes from a manual bitrate.
    pub manual: bool,
    /// `true` when the buffer is starving and the switch should happen now.
    pub urgent: bool,
    pub reason: AbrReason,
}

impl AbrEstimation {
    /// Same decision from a consumer's point of view (ignores estimate drift).
    pub fn same_choice(&self, other: &Self) -> bool {
        self.representation.id == other.representation.id
            && self.manual == other.manual
            && self.urgent == other.urgent
    }
}

/// Manual and automatic bitrate ceilings for one track type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BitrateBounds {
    /// Hard ceiling; when set, selection is manual and ignores `max_auto_bitrate`.
    pub manual_bitrate: Option<u64>,
    /// Ceiling applied to automatic selection only.
    pub max_auto_bitrate: Option<u64>,
}

/// Bounds shared between the coordinator and the decision unit of a track type.
pub type SharedBounds = Arc<RwLock<BitrateBounds>>;

/// One completed download, as seen by a bandwidth estimator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThroughputSample {
    pub bytes: u64,
    pub duration: Duration,
    /// Media duration carried by the download, if known.
    pub content_duration: Option<Duration>,
}

impl From<&SegmentMetric> for ThroughputSample {
    fn from(metric: &SegmentMetric) -> Self {
        let content_duration = Duration::try_from_secs_f64(metric.content.segment.duration_secs).ok();
        Self {
            bytes: metric.size_bytes,
            duration: metric.duration,
            content_duration,
        }
    }
}
