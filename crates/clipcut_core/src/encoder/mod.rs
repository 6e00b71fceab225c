//! Encoder capability detection and candidate selection.
//!
//! Hardware detection runs the transcoder's capability-listing mode once
//! per process; the result is an immutable value handed to
//! [`EncoderSelector`], which produces the ordered fallback cascade:
//! hardware variants first, each with an audio-passthrough variant before
//! an audio re-encode, the universal software encoder last. The ordering
//! encodes intent: prefer speed, prefer not touching audio, fall back
//! progressively.

use once_cell::sync::OnceCell;

use crate::process::runner;
use crate::tools::ToolPaths;

/// Hardware encoder availability for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncoderCapabilities {
    /// The build exposes the NVIDIA NVENC H.264 encoder (`h264_nvenc`).
    pub nvenc: bool,
}

static DETECTED: OnceCell<EncoderCapabilities> = OnceCell::new();

/// Detect hardware encoder availability by listing the transcoder's
/// encoders. A failed invocation means "software only".
pub fn detect_capabilities(tools: &ToolPaths) -> EncoderCapabilities {
    let args: Vec<String> = vec!["-hide_banner".into(), "-encoders".into()];
    match runner::run(&tools.ffmpeg, &args) {
        Ok(out) => {
            let caps = EncoderCapabilities {
                nvenc: out.contains("h264_nvenc"),
            };
            tracing::info!("Encoder capabilities: nvenc={}", caps.nvenc);
            caps
        }
        Err(e) => {
            tracing::warn!("Encoder detection failed, assuming software only: {}", e);
            EncoderCapabilities::default()
        }
    }
}

/// Process-wide memoized [`detect_capabilities`].
///
/// The first caller performs the detection; concurrent first calls are
/// serialized by the cell, so two exports starting together see one
/// consistent result.
pub fn cached_capabilities(tools: &ToolPaths) -> EncoderCapabilities {
    *DETECTED.get_or_init(|| detect_capabilities(tools))
}

/// One complete encoder configuration attempted during the render path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderCandidate {
    /// Short tag for logs and outcomes (e.g. `nvenc+copy`).
    pub label: &'static str,
    /// Video codec arguments.
    pub video_args: Vec<String>,
    /// Audio codec arguments.
    pub audio_args: Vec<String>,
}

/// Produces the ordered encoder cascade for a capability set.
#[derive(Debug, Clone, Copy)]
pub struct EncoderSelector {
    caps: EncoderCapabilities,
}

impl EncoderSelector {
    /// Create a selector over an explicit capability set.
    pub fn new(caps: EncoderCapabilities) -> Self {
        Self { caps }
    }

    /// The ordered candidate list. Never empty: the software encoder is
    /// always present as the final fallback.
    pub fn candidates(&self) -> Vec<EncoderCandidate> {
        let mut list = Vec::new();
        if self.caps.nvenc {
            list.push(EncoderCandidate {
                label: "nvenc+copy",
                video_args: nvenc_args(),
                audio_args: audio_copy_args(),
            });
            list.push(EncoderCandidate {
                label: "nvenc+aac",
                video_args: nvenc_args(),
                audio_args: audio_aac_args(),
            });
        }
        list.push(EncoderCandidate {
            label: "x264+copy",
            video_args: x264_args(),
            audio_args: audio_copy_args(),
        });
        list.push(EncoderCandidate {
            label: "x264+aac",
            video_args: x264_args(),
            audio_args: audio_aac_args(),
        });
        list
    }
}

fn svec(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn nvenc_args() -> Vec<String> {
    svec(&[
        "-c:v", "h264_nvenc", "-preset", "p4", "-rc", "vbr", "-cq", "19", "-b:v", "0",
    ])
}

fn x264_args() -> Vec<String> {
    svec(&["-c:v", "libx264", "-preset", "veryfast", "-crf", "18"])
}

fn audio_copy_args() -> Vec<String> {
    svec(&["-c:a", "copy"])
}

fn audio_aac_args() -> Vec<String> {
    svec(&["-c:a", "aac", "-b:a", "192k"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn software_only_cascade() {
        let list = EncoderSelector::new(EncoderCapabilities::default()).candidates();
        let labels: Vec<_> = list.iter().map(|c| c.label).collect();
        assert_eq!(labels, vec!["x264+copy", "x264+aac"]);
        assert!(list[0].video_args.contains(&"libx264".to_string()));
        assert_eq!(list[0].audio_args, vec!["-c:a", "copy"]);
    }

    #[test]
    fn hardware_variants_come_first() {
        let caps = EncoderCapabilities { nvenc: true };
        let list = EncoderSelector::new(caps).candidates();
        let labels: Vec<_> = list.iter().map(|c| c.label).collect();
        assert_eq!(labels, vec!["nvenc+copy", "nvenc+aac", "x264+copy", "x264+aac"]);
        assert!(list[0].video_args.contains(&"h264_nvenc".to_string()));
    }

    #[test]
    fn audio_passthrough_precedes_reencode() {
        let caps = EncoderCapabilities { nvenc: true };
        let list = EncoderSelector::new(caps).candidates();
        assert_eq!(list[0].audio_args, vec!["-c:a", "copy"]);
        assert_eq!(list[1].audio_args, vec!["-c:a", "aac", "-b:a", "192k"]);
    }

    #[test]
    fn detection_failure_means_software_only() {
        let tools = ToolPaths::new("missing-tool", "missing-tool");
        assert_eq!(detect_capabilities(&tools), EncoderCapabilities::default());
    }
}
