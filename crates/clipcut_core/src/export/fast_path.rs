//! Lossless fast path: same-source, keyframe-aligned stream copy.

use std::path::{Path, PathBuf};

use crate::models::ExportJob;
use crate::probe;
use crate::process::runner;
use crate::tools::ToolPaths;

use super::errors::{ExportError, ExportResult};
use super::temp::TempFileArena;

/// Whether the fast path ran, and if not, why.
#[derive(Debug)]
pub(crate) enum FastPath {
    /// Stream copy + concat completed; the output file is written.
    Completed,
    /// An eligibility predicate failed; the render path must run.
    Ineligible(String),
}

/// Attempt the lossless fast path.
///
/// Eligible when every segment resolves to the same source file and every
/// cut boundary lies within tolerance of a keyframe (start-of-file and
/// end-of-file boundaries are exempt). When eligible, each segment is
/// stream-copied into an arena temp file and the parts are joined with a
/// demuxer-level concat; no frame is re-encoded, so the result is
/// bit-identical to the source inside each segment.
pub(crate) fn try_fast_copy(
    tools: &ToolPaths,
    job: &ExportJob,
    tolerance_ms: u64,
    progress: &mut dyn FnMut(f64),
) -> ExportResult<FastPath> {
    let source = match single_source(job) {
        Some(path) => path,
        None => {
            return Ok(FastPath::Ineligible(
                "segments span multiple source files".to_string(),
            ))
        }
    };

    let source_ms = probe::probe_media(tools, &source).duration_ms;

    for seg in &job.segments {
        if seg.start_ms > 0 && !probe::keyframe_near(tools, &source, seg.start_ms, tolerance_ms) {
            return Ok(FastPath::Ineligible(format!(
                "cut at {} ms is not on a keyframe",
                seg.start_ms
            )));
        }
        // End boundaries within 1 ms of the container end are exempt.
        if seg.end_ms + 1 < source_ms
            && !probe::keyframe_near(tools, &source, seg.end_ms, tolerance_ms)
        {
            return Ok(FastPath::Ineligible(format!(
                "cut at {} ms is not on a keyframe",
                seg.end_ms
            )));
        }
    }

    tracing::info!(
        "Fast path eligible: stream-copying {} segments from {}",
        job.segments.len(),
        source.display()
    );

    let total_ms = job.total_duration_ms().max(1);
    let mut arena = TempFileArena::new();
    let mut parts: Vec<PathBuf> = Vec::with_capacity(job.segments.len());
    let mut done_ms: u64 = 0;

    for (i, seg) in job.segments.iter().enumerate() {
        let part = arena
            .create(&format!("seg-copy-{}-", i), ".mp4")
            .map_err(|e| ExportError::io("creating segment temp file", e))?;
        cut_copy(tools, &source, seg.start_ms, seg.end_ms, &part)?;
        parts.push(part);

        done_ms += seg.duration_ms();
        progress((done_ms as f64 / total_ms as f64).min(0.98));
    }

    concat_parts(tools, &mut arena, &parts, &job.output)?;
    Ok(FastPath::Completed)
}

/// The single canonical source behind every segment, or `None` when the
/// segments span more than one file.
fn single_source(job: &ExportJob) -> Option<PathBuf> {
    let first = canonical(&job.segments.first()?.source);
    for seg in &job.segments[1..] {
        if canonical(&seg.source) != first {
            return None;
        }
    }
    Some(first)
}

/// Resolve to a canonical absolute path; falls back to the path as given
/// when resolution fails (comparison still catches the common cases).
fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Stream-copy `[start, end)` into `out`: exact packet copy with the
/// container timestamps reset to start at zero.
fn cut_copy(
    tools: &ToolPaths,
    input: &Path,
    start_ms: u64,
    end_ms: u64,
    out: &Path,
) -> ExportResult<()> {
    let dur_ms = end_ms.saturating_sub(start_ms);

    let mut args: Vec<String> = Vec::new();
    args.extend(["-y", "-hide_banner", "-loglevel", "error"].map(String::from));
    args.push("-ss".into());
    args.push(format_secs(start_ms));
    args.push("-t".into());
    args.push(format_secs(dur_ms));
    args.push("-i".into());
    args.push(input.display().to_string());
    args.extend(
        ["-c", "copy", "-avoid_negative_ts", "make_zero", "-reset_timestamps", "1"]
            .map(String::from),
    );
    args.push(out.display().to_string());

    runner::run(&tools.ffmpeg, &args)?;
    Ok(())
}

/// Join the copied parts with the demuxer-level concat (no re-encode).
fn concat_parts(
    tools: &ToolPaths,
    arena: &mut TempFileArena,
    parts: &[PathBuf],
    output: &Path,
) -> ExportResult<()> {
    let list = arena
        .create("concat-", ".txt")
        .map_err(|e| ExportError::io("creating concat list file", e))?;
    std::fs::write(&list, concat_list_body(parts))
        .map_err(|e| ExportError::io("writing concat list file", e))?;

    let mut args: Vec<String> = Vec::new();
    args.extend(["-y", "-f", "concat", "-safe", "0", "-i"].map(String::from));
    args.push(list.display().to_string());
    args.extend(["-c", "copy"].map(String::from));
    args.push(output.display().to_string());

    runner::run(&tools.ffmpeg, &args)?;
    Ok(())
}

/// The concat demuxer list: one `file '<absolute path>'` line per part.
fn concat_list_body(parts: &[PathBuf]) -> String {
    let mut body = String::new();
    for part in parts {
        body.push_str(&format!("file '{}'\n", part.display()));
    }
    body
}

/// Milliseconds as a seconds string with 3 decimals (`12500` -> `12.500`).
fn format_secs(ms: u64) -> String {
    format!("{:.3}", ms as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Resolution, Segment};
    use std::fs::File;

    fn job_with(segments: Vec<Segment>) -> ExportJob {
        ExportJob::new(segments, Resolution::new(1280, 720), "/tmp/out.mp4")
    }

    #[test]
    fn format_secs_has_three_decimals() {
        assert_eq!(format_secs(0), "0.000");
        assert_eq!(format_secs(12_500), "12.500");
        assert_eq!(format_secs(30_001), "30.001");
    }

    #[test]
    fn concat_list_quotes_paths() {
        let parts = vec![PathBuf::from("/tmp/a.mp4"), PathBuf::from("/tmp/b.mp4")];
        assert_eq!(
            concat_list_body(&parts),
            "file '/tmp/a.mp4'\nfile '/tmp/b.mp4'\n"
        );
    }

    #[test]
    fn single_source_accepts_one_file_via_different_spellings() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        File::create(&file).unwrap();

        let dotted = dir.path().join(".").join("clip.mp4");
        let j = job_with(vec![
            Segment::new(&file, 0, 1_000),
            Segment::new(&dotted, 2_000, 3_000),
        ]);
        assert!(single_source(&j).is_some());
    }

    #[test]
    fn single_source_rejects_two_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mp4");
        let b = dir.path().join("b.mp4");
        File::create(&a).unwrap();
        File::create(&b).unwrap();

        let j = job_with(vec![Segment::new(&a, 0, 1_000), Segment::new(&b, 0, 1_000)]);
        assert!(single_source(&j).is_none());
    }

    #[test]
    fn multi_source_job_is_ineligible_without_probing() {
        // Two distinct sources: the decision is made before any process
        // could spawn, so missing tools must not matter.
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mp4");
        let b = dir.path().join("b.mp4");
        File::create(&a).unwrap();
        File::create(&b).unwrap();

        let tools = ToolPaths::new("missing-tool", "missing-tool");
        let j = job_with(vec![Segment::new(&a, 0, 1_000), Segment::new(&b, 0, 1_000)]);
        let outcome = try_fast_copy(&tools, &j, 20, &mut |_| {}).unwrap();
        assert!(matches!(outcome, FastPath::Ineligible(_)));
    }
}
