//! Keyframe proximity queries for cut-point validation.

use std::path::Path;

use crate::process::runner;
use crate::tools::ToolPaths;

/// Default cut-point tolerance in milliseconds.
pub const DEFAULT_TOLERANCE_MS: u64 = 20;

/// Extra read window past the tolerance, in seconds. Bounds how much of
/// the file the prober decodes for one query.
const READ_MARGIN_SECS: f64 = 0.100;

/// True iff a decodable keyframe lies within `tolerance_ms` of
/// `timestamp_ms` in the first video stream.
///
/// Only the window `[timestamp - tolerance, timestamp + tolerance +
/// margin]` is read, never the whole file. Probe failures count as "no
/// keyframe"; the caller then takes the always-correct render path. Used
/// for fast-path eligibility only, never for frame display.
pub fn keyframe_near(tools: &ToolPaths, path: &Path, timestamp_ms: u64, tolerance_ms: u64) -> bool {
    let target_secs = timestamp_ms as f64 / 1000.0;
    let tol_secs = tolerance_ms as f64 / 1000.0;
    let window_start = (target_secs - tol_secs).max(0.0);
    let window_secs = tol_secs * 2.0 + READ_MARGIN_SECS;

    let args: Vec<String> = vec![
        "-v".into(),
        "error".into(),
        "-select_streams".into(),
        "v:0".into(),
        "-read_intervals".into(),
        format!("{:.3}%+{:.3}", window_start, window_secs),
        "-show_frames".into(),
        "-show_entries".into(),
        "frame=key_frame,best_effort_timestamp_time".into(),
        "-of".into(),
        "csv=p=0".into(),
        path.display().to_string(),
    ];

    match runner::run(&tools.ffprobe, &args) {
        Ok(out) => contains_keyframe_near(&out, target_secs, tol_secs),
        Err(e) => {
            tracing::warn!(
                "Keyframe probe of {} at {} ms failed: {}",
                path.display(),
                timestamp_ms,
                e
            );
            false
        }
    }
}

/// Scan csv frame lines (`key_frame,best_effort_timestamp_time`) for a
/// keyframe whose decoded timestamp is within tolerance of the target.
fn contains_keyframe_near(out: &str, target_secs: f64, tol_secs: f64) -> bool {
    for line in out.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split(',');
        let (Some(flag), Some(ts)) = (fields.next(), fields.next()) else {
            continue;
        };
        if flag.trim() != "1" {
            continue;
        }
        let Ok(ts) = ts.trim().parse::<f64>() else {
            continue;
        };
        if (ts - target_secs).abs() <= tol_secs {
            return true;
        }
    }
    false
}
