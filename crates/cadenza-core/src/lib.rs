//! Building blocks shared by the ABR and playback-quality crates.
//!
//! - [`TrackType`]: the unit of independence for decisions and telemetry.
//! - [`Period`], [`Adaptation`], [`Representation`]: the manifest view the
//!   decision logic needs (identity, bitrate, dimensions).
//! - [`StreamId`]: collision-free key for a period/adaptation/representation triple.
//! - [`Ewma`]: exponentially-weighted moving average with a configurable half-life.

#![forbid(unsafe_code)]

mod ewma;
mod manifest;
mod stream_id;
mod track;

pub use ewma::Ewma;
pub use manifest::{Adaptation, Period, Representation};
pub use stream_id::StreamId;
pub use track::TrackType;
