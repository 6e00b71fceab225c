//! Timeline export orchestration.
//!
//! Entry point for collaborators: build an [`ExportJob`], hand it to
//! [`ExportEngine::export`] with an optional progress sink, and get back
//! the strategy that produced the output file or a diagnostic failure.
//!
//! The engine validates the job, attempts the lossless fast path (one
//! source, keyframe-aligned cuts), and falls through to the always-correct
//! render path otherwise. The whole sequence blocks the calling thread;
//! [`spawn_export`] wraps it in a dedicated worker so an interactive
//! caller stays responsive. Progress callbacks fire synchronously on
//! whichever thread runs the export; marshaling onto another context is
//! the sink's business.

mod errors;
mod fast_path;
mod render;
mod temp;

use std::thread;

use crate::encoder::{self, EncoderCapabilities, EncoderSelector};
use crate::models::ExportJob;
use crate::probe;
use crate::tools::ToolPaths;

pub use errors::{ExportError, ExportResult};
pub use temp::TempFileArena;

use fast_path::FastPath;

/// Progress sink: receives an initial `0.0`, then strictly increasing
/// fractions in `(0, 1)`, then exactly one terminal `1.0` on success.
/// Nothing is reported after a failure.
pub type ProgressSink = Box<dyn FnMut(f64) + Send>;

/// Which strategy produced the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStrategy {
    /// Lossless stream copy plus demuxer concat.
    FastCopy,
    /// Filter-graph render through an encoder candidate.
    Render,
}

/// A successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    /// Strategy that wrote the output.
    pub strategy: ExportStrategy,
    /// Label of the encoder candidate that completed (render path only).
    pub encoder: Option<&'static str>,
}

/// What to do when the fast path fails while executing, after it was
/// judged eligible.
///
/// `Propagate` preserves the historical behavior (the failure is the
/// job's terminal error); `FallBackToRender` treats any execution failure
/// like ineligibility and re-runs the job through the render path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FastPathFailure {
    /// Propagate the failure as the job's terminal error.
    #[default]
    Propagate,
    /// Log the failure and run the render path instead.
    FallBackToRender,
}

/// Tunables for one engine instance.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Keyframe alignment tolerance for fast-path cuts, in milliseconds.
    pub keyframe_tolerance_ms: u64,
    /// Mid-fast-path failure policy.
    pub fast_path_failure: FastPathFailure,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            keyframe_tolerance_ms: probe::DEFAULT_TOLERANCE_MS,
            fast_path_failure: FastPathFailure::default(),
        }
    }
}

/// Timeline export engine.
///
/// Holds resolved tool paths and options; one instance can run any number
/// of jobs, one at a time.
pub struct ExportEngine {
    tools: ToolPaths,
    options: ExportOptions,
    capabilities: Option<EncoderCapabilities>,
}

impl ExportEngine {
    /// Create an engine over the given tools with default options.
    /// Encoder capabilities are detected lazily on the first render and
    /// memoized process-wide.
    pub fn new(tools: ToolPaths) -> Self {
        Self {
            tools,
            options: ExportOptions::default(),
            capabilities: None,
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Inject a pre-computed capability set, skipping detection. Useful
    /// when capabilities were detected at startup, and in tests.
    pub fn with_capabilities(mut self, caps: EncoderCapabilities) -> Self {
        self.capabilities = Some(caps);
        self
    }

    /// Export the job to its output path, blocking until done.
    pub fn export(
        &self,
        job: &ExportJob,
        progress: Option<ProgressSink>,
    ) -> ExportResult<ExportOutcome> {
        job.validate().map_err(ExportError::InvalidJob)?;

        tracing::info!(
            "Export planned: {} segments, {} ms -> {}",
            job.segments.len(),
            job.total_duration_ms(),
            job.output.display()
        );

        let mut sink = GatedSink::start(progress);

        let fast = fast_path::try_fast_copy(
            &self.tools,
            job,
            self.options.keyframe_tolerance_ms,
            &mut |p| sink.advance(p),
        );
        match fast {
            Ok(FastPath::Completed) => {
                sink.finish();
                tracing::info!("Export succeeded via fast copy");
                return Ok(ExportOutcome {
                    strategy: ExportStrategy::FastCopy,
                    encoder: None,
                });
            }
            Ok(FastPath::Ineligible(reason)) => {
                tracing::info!("Fast path ineligible: {}", reason);
            }
            Err(e) => match self.options.fast_path_failure {
                FastPathFailure::Propagate => return Err(e),
                FastPathFailure::FallBackToRender => {
                    tracing::warn!("Fast path failed, falling back to render: {}", e);
                }
            },
        }

        let caps = self
            .capabilities
            .unwrap_or_else(|| encoder::cached_capabilities(&self.tools));
        let selector = EncoderSelector::new(caps);

        let label = render::render(&self.tools, job, &selector, &mut |p| sink.advance(p))?;
        sink.finish();
        tracing::info!("Export succeeded via render ('{}')", label);
        Ok(ExportOutcome {
            strategy: ExportStrategy::Render,
            encoder: Some(label),
        })
    }
}

/// Run [`ExportEngine::export`] on a dedicated worker thread.
///
/// The worker blocks for the whole export while the caller's thread stays
/// free; join the handle for the result. Progress callbacks fire on the
/// worker.
pub fn spawn_export(
    engine: ExportEngine,
    job: ExportJob,
    progress: Option<ProgressSink>,
) -> std::io::Result<thread::JoinHandle<ExportResult<ExportOutcome>>> {
    thread::Builder::new()
        .name("export-worker".to_string())
        .spawn(move || engine.export(&job, progress))
}

/// Enforces the sink contract across both paths and across encoder
/// retries: values forwarded strictly increase, stay below 1.0, and the
/// single terminal 1.0 is only sent by [`GatedSink::finish`]. A retried
/// attempt restarting its own progress from zero is therefore invisible
/// to the sink.
struct GatedSink {
    sink: Option<ProgressSink>,
    floor: f64,
}

impl GatedSink {
    /// Wrap the sink and emit the initial `0.0`.
    fn start(sink: Option<ProgressSink>) -> Self {
        let mut gated = Self { sink, floor: 0.0 };
        gated.raw(0.0);
        gated
    }

    /// Forward a fraction if it strictly advances the floor.
    fn advance(&mut self, fraction: f64) {
        if fraction > self.floor && fraction < 1.0 {
            self.floor = fraction;
            self.raw(fraction);
        }
    }

    /// The single terminal value on success.
    fn finish(&mut self) {
        self.raw(1.0);
    }

    fn raw(&mut self, fraction: f64) {
        if let Some(cb) = self.sink.as_mut() {
            cb(fraction);
        }
    }
}
