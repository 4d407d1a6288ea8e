//! Perceived playback quality per representation.
//!
//! For each tick of the playback clock, the frames dropped since the previous
//! tick are attributed to the single stream that was buffered over that
//! interval (if there is exactly one). Each stream keeps a fast and a slow
//! average of `1 - frame_loss`; its quality is the lower of the two.
//!
//! [`PlaybackQualityEstimator::get_qualities`] turns a playback clock into a
//! stream of [`QualityMap`]s; [`QualityTracker`] is the same logic driven by
//! hand.

#![forbid(unsafe_code)]

mod buffer;
mod config;
mod estimator;
mod frame_loss;
mod map;
mod means;
mod surface;
mod tracker;

pub use buffer::{BufferQuery, BufferedSegment};
pub use config::QualityConfig;
pub use estimator::{PlaybackQualityEstimator, PlaybackTick, QualityStream};
pub use frame_loss::FrameLossSampler;
pub use map::QualityMap;
pub use means::QualityMeans;
pub use surface::{FrameCounters, PlaybackSurface};
pub use tracker::{QualityTracker, TrackContent};
