//! Export failure taxonomy.
//!
//! Probe-level trouble never surfaces here (the probe layer absorbs it
//! with defaults), and fast-path ineligibility is an outcome rather than
//! an error. What remains terminal: job validation, external process
//! failures, and encoder exhaustion.

use std::io;

use thiserror::Error;

use crate::process::ProcessError;

/// Terminal failure of one export invocation.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The job was rejected before any process was spawned.
    #[error("invalid export job: {0}")]
    InvalidJob(String),

    /// An external process failed; carries the exact command line and its
    /// captured output.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Every encoder candidate failed; carries the last failure.
    #[error("all {attempts} encoder candidates failed; last: {source}")]
    EncoderExhausted {
        attempts: usize,
        #[source]
        source: ProcessError,
    },

    /// Filesystem work around the export failed (temp files, list files).
    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl ExportError {
    /// Create an invalid-job error.
    pub fn invalid_job(message: impl Into<String>) -> Self {
        Self::InvalidJob(message.into())
    }

    /// Create an I/O error with operation context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_job_displays_reason() {
        let err = ExportError::invalid_job("no segments to export");
        assert!(err.to_string().contains("no segments"));
    }

    #[test]
    fn encoder_exhausted_keeps_last_failure() {
        let last = ProcessError::NonZeroExit {
            program: "ffmpeg".to_string(),
            exit_code: 1,
            command: "ffmpeg -i in.mp4 out.mp4".to_string(),
            output: "Unknown encoder 'h264_nvenc'".to_string(),
        };
        let err = ExportError::EncoderExhausted {
            attempts: 4,
            source: last,
        };
        let msg = err.to_string();
        assert!(msg.contains("all 4 encoder candidates failed"));
        assert!(msg.contains("Unknown encoder"));
    }
}
