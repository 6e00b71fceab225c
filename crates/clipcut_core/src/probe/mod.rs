//! Read-only media inspection via the external prober.
//!
//! [`probe_media`] gathers per-source facts (duration, dimensions, frame
//! rate, audio presence) with safe defaults; [`keyframe_near`] answers
//! bounded cut-point queries for fast-path eligibility.

mod keyframes;
mod media;

pub use keyframes::{keyframe_near, DEFAULT_TOLERANCE_MS};
pub use media::probe_media;
