//! Probed media facts for a single source file.

use serde::{Deserialize, Serialize};

/// Frame rate assumed when the prober cannot report one.
pub const DEFAULT_FPS: f64 = 30.0;

/// Container and stream facts for one source, as reported by the prober.
///
/// Values are best-effort: the probe substitutes documented defaults
/// instead of failing, so downstream code never divides by zero and never
/// has to handle a probe error. Recomputed per source on demand, never
/// cached across jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Container duration in milliseconds. Never zero; 1 when unknown.
    pub duration_ms: u64,
    /// Video width in pixels. 0 means unknown.
    pub width: u32,
    /// Video height in pixels. 0 means unknown.
    pub height: u32,
    /// Average video frame rate. [`DEFAULT_FPS`] when unknown.
    pub fps: f64,
    /// Whether the file carries at least one audio stream.
    pub has_audio: bool,
}

impl MediaInfo {
    /// Facts used when the probe process itself fails.
    ///
    /// Audio is assumed present so a later encode fails loudly instead of
    /// silently dropping a stream.
    pub fn fallback() -> Self {
        Self {
            duration_ms: 1,
            width: 0,
            height: 0,
            fps: DEFAULT_FPS,
            has_audio: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_safe_for_ratios() {
        let info = MediaInfo::fallback();
        assert!(info.duration_ms > 0);
        assert!(info.fps > 0.0);
        assert!(info.has_audio);
    }
}
