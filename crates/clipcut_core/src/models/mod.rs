//! Data models for the export engine.
//!
//! This module contains the value types that cross the engine's boundary:
//! - Job structures (segments, target resolution, the export job itself)
//! - Probed media facts ([`MediaInfo`])

mod jobs;
mod media;

// Re-export all public types
pub use jobs::{ExportJob, Resolution, Segment};
pub use media::{MediaInfo, DEFAULT_FPS};
