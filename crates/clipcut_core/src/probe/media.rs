//! Source capability probing (duration, dimensions, frame rate, audio).

use std::path::Path;

use crate::models::{MediaInfo, DEFAULT_FPS};
use crate::process::runner;
use crate::tools::ToolPaths;

/// Probe a source file's container and stream facts.
///
/// Every query is best-effort: a failed or unparsable probe is absorbed
/// with the documented defaults (duration 1 ms, unknown 0x0 dimensions,
/// 30 fps, audio assumed present) so export never aborts on a probe.
pub fn probe_media(tools: &ToolPaths, path: &Path) -> MediaInfo {
    tracing::debug!("Probing {}", path.display());

    let args = probe_args(&[
        "-show_entries",
        "format=duration:stream=width,height",
        "-of",
        "default=noprint_wrappers=1:nokey=0",
    ], path);

    let (duration_ms, width, height) = match runner::run(&tools.ffprobe, &args) {
        Ok(out) => parse_format_fields(&out),
        Err(e) => {
            tracing::warn!("Probe of {} failed, using fallback facts: {}", path.display(), e);
            return MediaInfo::fallback();
        }
    };

    MediaInfo {
        duration_ms,
        width,
        height,
        fps: probe_fps(tools, path),
        has_audio: probe_has_audio(tools, path),
    }
}

/// True if the file carries at least one audio stream.
///
/// A failed query assumes audio IS present: a later encode then fails
/// loudly instead of silently dropping the stream.
fn probe_has_audio(tools: &ToolPaths, path: &Path) -> bool {
    let args = probe_args(&[
        "-select_streams",
        "a:0",
        "-show_entries",
        "stream=index",
        "-of",
        "csv=p=0",
    ], path);

    match runner::run(&tools.ffprobe, &args) {
        Ok(out) => !out.trim().is_empty(),
        Err(e) => {
            tracing::warn!("Audio probe of {} failed, assuming audio: {}", path.display(), e);
            true
        }
    }
}

/// Average frame rate of the first video stream, or [`DEFAULT_FPS`].
fn probe_fps(tools: &ToolPaths, path: &Path) -> f64 {
    let args = probe_args(&[
        "-select_streams",
        "v:0",
        "-show_entries",
        "stream=avg_frame_rate",
        "-of",
        "default=noprint_wrappers=1:nokey=0",
    ], path);

    match runner::run(&tools.ffprobe, &args) {
        Ok(out) => parse_frame_rate_field(&out).unwrap_or(DEFAULT_FPS),
        Err(e) => {
            tracing::warn!("Frame-rate probe of {} failed: {}", path.display(), e);
            DEFAULT_FPS
        }
    }
}

/// Prefix every probe with quiet error reporting, suffix with the file.
fn probe_args(middle: &[&str], path: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec!["-v".into(), "error".into()];
    args.extend(middle.iter().map(|s| s.to_string()));
    args.push(path.display().to_string());
    args
}

/// Parse `key=value` probe output into (duration_ms, width, height).
///
/// Duration defaults to 1 ms when absent so downstream ratios never divide
/// by zero; dimensions default to 0 ("unknown", caller substitutes a
/// fallback resolution).
fn parse_format_fields(out: &str) -> (u64, u32, u32) {
    let mut duration_ms: u64 = 0;
    let mut width: u32 = 0;
    let mut height: u32 = 0;

    for line in out.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "duration" if duration_ms == 0 => {
                if let Ok(secs) = value.parse::<f64>() {
                    if secs.is_finite() && secs > 0.0 {
                        duration_ms = (secs * 1000.0) as u64;
                    }
                }
            }
            "width" if width == 0 => width = value.parse().unwrap_or(0),
            "height" if height == 0 => height = value.parse().unwrap_or(0),
            _ => {}
        }
    }

    (duration_ms.max(1), width, height)
}

/// Parse an `avg_frame_rate=N/D` rational into frames per second.
///
/// Falls back to a plain decimal; `None` for degenerate rationals (`0/0`)
/// and non-positive rates.
fn parse_frame_rate_field(out: &str) -> Option<f64> {
    for line in out.lines() {
        let Some(value) = line.trim().strip_prefix("avg_frame_rate=") else {
            continue;
        };
        let rate = match value.split_once('/') {
            Some((num, den)) => {
                let num: f64 = num.parse().ok()?;
                let den: f64 = den.parse().ok()?;
                if den == 0.0 {
                    return None;
                }
                num / den
            }
            None => value.parse().ok()?,
        };
        if rate > 0.0 && rate.is_finite() {
            return Some(rate);
        }
        return None;
    }
    None
}
