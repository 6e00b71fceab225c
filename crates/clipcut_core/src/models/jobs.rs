//! Export job data structures (segments, resolution, validation).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One timeline clip: take `[start_ms, end_ms)` from `source`.
///
/// Owned by the caller's timeline and copied into the job; immutable once
/// constructed. `start_ms < end_ms` is checked by [`ExportJob::validate`]
/// before any work starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Path to the source media file.
    pub source: PathBuf,
    /// Start of the cut in milliseconds.
    pub start_ms: u64,
    /// End of the cut in milliseconds (exclusive).
    pub end_ms: u64,
}

impl Segment {
    /// Create a new segment.
    pub fn new(source: impl Into<PathBuf>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            source: source.into(),
            start_ms,
            end_ms,
        }
    }

    /// Duration of the cut in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Output resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Create a new resolution.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A complete export request: ordered segments, target resolution, output
/// path.
///
/// Created per export request and discarded after success or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportJob {
    /// Segments in timeline order.
    pub segments: Vec<Segment>,
    /// Resolution every rendered segment is normalized to.
    pub target: Resolution,
    /// Where the final container file goes.
    pub output: PathBuf,
}

impl ExportJob {
    /// Create a new export job.
    pub fn new(segments: Vec<Segment>, target: Resolution, output: impl Into<PathBuf>) -> Self {
        Self {
            segments,
            target,
            output: output.into(),
        }
    }

    /// Total output duration: the sum of segment durations.
    pub fn total_duration_ms(&self) -> u64 {
        self.segments.iter().map(Segment::duration_ms).sum()
    }

    /// Check the job invariants: a non-empty segment list, ordered cut
    /// bounds in every segment, and a positive target resolution.
    ///
    /// Returns the human-readable reason when the job is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.segments.is_empty() {
            return Err("no segments to export".to_string());
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if seg.start_ms >= seg.end_ms {
                return Err(format!(
                    "segment {} has inverted bounds ({} >= {})",
                    i, seg.start_ms, seg.end_ms
                ));
            }
        }
        if self.target.width == 0 || self.target.height == 0 {
            return Err(format!(
                "target resolution {}x{} is not positive",
                self.target.width, self.target.height
            ));
        }
        Ok(())
    }
}
