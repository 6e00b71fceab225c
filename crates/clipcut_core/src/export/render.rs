//! General render path: per-segment filter chains, concat, encode cascade.

use crate::encoder::{EncoderCandidate, EncoderSelector};
use crate::models::{ExportJob, MediaInfo, Resolution, DEFAULT_FPS};
use crate::probe;
use crate::process::{runner, ProcessError, ProgressTranslator};
use crate::tools::ToolPaths;

use super::errors::{ExportError, ExportResult};

/// Run the always-correct render path.
///
/// Builds one filter graph over all segments (trim, scale-to-fit, centered
/// pad, frame-rate and pixel-format normalization, real or synthesized
/// audio), then tries each encoder candidate in order until one completes.
/// Each attempt assembles its argument vector from scratch; nothing is
/// carried between attempts.
///
/// Returns the label of the candidate that produced the output.
pub(crate) fn render(
    tools: &ToolPaths,
    job: &ExportJob,
    selector: &EncoderSelector,
    progress: &mut dyn FnMut(f64),
) -> ExportResult<&'static str> {
    let infos: Vec<MediaInfo> = job
        .segments
        .iter()
        .map(|seg| probe::probe_media(tools, &seg.source))
        .collect();

    let rates: Vec<f64> = infos.iter().map(|info| info.fps).collect();
    let fps = select_target_fps(&rates);
    let graph = build_filter_graph(job, &infos, job.target, fps);
    let total_ms = job.total_duration_ms().max(1);

    let candidates = selector.candidates();
    let attempts = candidates.len();
    let mut last_failure: Option<ProcessError> = None;

    for candidate in candidates {
        tracing::info!("Render attempt with encoder candidate '{}'", candidate.label);
        let args = build_render_args(job, &graph, &candidate);
        let mut translator = ProgressTranslator::new(total_ms);

        let attempt = runner::run_with_line_handler(&tools.ffmpeg, &args, &mut |line| {
            if let Some(fraction) = translator.observe_line(line) {
                progress(fraction);
            }
        });

        match attempt {
            Ok(_) => return Ok(candidate.label),
            Err(e) => {
                tracing::warn!("Encoder candidate '{}' failed: {}", candidate.label, e);
                last_failure = Some(e);
            }
        }
    }

    match last_failure {
        Some(source) => Err(ExportError::EncoderExhausted { attempts, source }),
        // The candidate list is never empty, so this cannot be reached.
        None => Err(ExportError::invalid_job("no encoder candidates available")),
    }
}

/// Pick the target frame rate: the most frequent probed rate across
/// segments; on a tie the first value to reach the top count wins.
pub(crate) fn select_target_fps(rates: &[f64]) -> f64 {
    // Counted in first-occurrence order, keyed on milli-fps so equal
    // rationals compare equal.
    let mut counted: Vec<(u64, f64, usize)> = Vec::new();
    for &rate in rates {
        let key = (rate * 1000.0).round() as u64;
        if let Some(entry) = counted.iter_mut().find(|(k, _, _)| *k == key) {
            entry.2 += 1;
        } else {
            counted.push((key, rate, 1));
        }
    }

    let mut best = DEFAULT_FPS;
    let mut best_count = 0;
    for (_, value, count) in counted {
        if count > best_count {
            best = value;
            best_count = count;
        }
    }
    best
}

/// Build the complete `-filter_complex` graph.
///
/// Per segment: trim to the cut, reset presentation timestamps, scale to
/// fit the target preserving aspect ratio, pad to exactly fill it
/// (centered), normalize frame rate and pixel format. Sources without
/// audio contribute synthesized silence of exactly the segment's duration
/// so the final concat always sees one video plus one audio stream per
/// segment.
pub(crate) fn build_filter_graph(
    job: &ExportJob,
    infos: &[MediaInfo],
    target: Resolution,
    fps: f64,
) -> String {
    let mut graph = String::new();

    for (i, (seg, info)) in job.segments.iter().zip(infos).enumerate() {
        let start = seg.start_ms as f64 / 1000.0;
        let end = seg.end_ms as f64 / 1000.0;
        let dur = (seg.duration_ms() as f64 / 1000.0).max(0.001);

        graph.push_str(&format!(
            "[{i}:v]trim=start={start:.6}:end={end:.6},setpts=PTS-STARTPTS,\
             scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,\
             fps=fps={fps:.3},format=yuv420p[v{i}];",
            w = target.width,
            h = target.height,
        ));

        if info.has_audio {
            graph.push_str(&format!(
                "[{i}:a]atrim=start={start:.6}:end={end:.6},asetpts=PTS-STARTPTS,aresample=48000[a{i}];"
            ));
        } else {
            graph.push_str(&format!(
                "anullsrc=r=48000:cl=stereo,atrim=0:{dur:.6},asetpts=PTS-STARTPTS[a{i}];"
            ));
        }
    }

    for i in 0..job.segments.len() {
        graph.push_str(&format!("[v{i}][a{i}]"));
    }
    graph.push_str(&format!(
        "concat=n={}:v=1:a=1[vout][aout]",
        job.segments.len()
    ));
    graph
}

/// Assemble the full transcoder argument vector for one candidate attempt.
///
/// The progress stream flags sit immediately before the output path so
/// the runner sees `pipe:1` lines as they arrive.
pub(crate) fn build_render_args(
    job: &ExportJob,
    graph: &str,
    candidate: &EncoderCandidate,
) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    args.extend(["-y", "-hide_banner", "-loglevel", "error"].map(String::from));
    for seg in &job.segments {
        args.push("-i".into());
        args.push(seg.source.display().to_string());
    }
    args.push("-filter_complex".into());
    args.push(graph.to_string());
    args.extend(["-map", "[vout]", "-map", "[aout]", "-movflags", "+faststart"].map(String::from));
    args.extend(candidate.video_args.iter().cloned());
    args.extend(candidate.audio_args.iter().cloned());
    args.extend(["-progress", "pipe:1", "-nostats"].map(String::from));
    args.push(job.output.display().to_string());
    args
}
