//! Adaptive bitrate (ABR) coordination.
//!
//! An [`AbrCoordinator`] owns one [`DecisionUnit`] per track type. It routes
//! segment-request lifecycle events and segment metrics to the unit of their
//! track type, and exposes a stream of [`AbrEstimation`]s per track type,
//! driven by a playback clock and buffer events.
//!
//! ## Features
//!
//! - **Lazy units**: a track type gets a unit on the first estimation request;
//!   earlier telemetry is kept and replayed.
//! - **Manual and automatic modes**: a manual bitrate bypasses throughput
//!   estimation; a max automatic bitrate only caps automatic choices.
//! - **Throughput and buffer aware**: the default [`RepresentationChooser`]
//!   combines a dual-EWMA throughput estimate with buffer-level hysteresis.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cadenza_abr::{AbrCoordinator, AbrOptions, AbrRequest, ClockTick};
//! use cadenza_core::{Representation, TrackType};
//! use futures::{StreamExt, stream};
//! use web_time::Instant;
//!
//! # async fn run() -> cadenza_abr::AbrResult<()> {
//! let requests = stream::empty::<stream::Empty<AbrRequest>>();
//! let coordinator = AbrCoordinator::new(requests, stream::empty(), AbrOptions::default());
//! coordinator.set_manual_bitrate(TrackType::Video, 700_000)?;
//!
//! let ladder = vec![
//!     Representation::new("low", 100_000),
//!     Representation::new("mid", 500_000),
//!     Representation::new("high", 1_000_000),
//! ];
//! let clock = stream::iter([ClockTick::new(0.0, 10.0, Instant::now())]);
//! let mut estimations = coordinator.decision_stream_for(
//!     TrackType::Video,
//!     Some(ladder),
//!     clock,
//!     stream::empty(),
//! )?;
//! let first = estimations.next().await;
//! assert_eq!(first.map(|e| e.representation.id), Some("mid".to_owned()));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod chooser;
mod config;
mod coordinator;
mod error;
mod estimator;
mod requests;
pub mod selection;
mod types;

pub use chooser::{DecisionUnit, RepresentationChooser, UnitContext};
pub use config::{AbrConfig, AbrOptions};
pub use coordinator::{AbrCoordinator, EstimationStream, UnitFactory};
pub use error::{AbrError, AbrResult};
pub use estimator::{Estimator, ThroughputEstimator};
pub use requests::PendingRequests;
pub use types::{
    AbrEstimation, AbrReason, AbrRequest, BitrateBounds, BufferEvent, ClockTick, RequestBegin,
    RequestEvent, RequestId, RequestProgress, SegmentContent, SegmentInfo, SegmentMetric,
    SharedBounds, ThroughputSample,
};
