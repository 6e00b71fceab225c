//! External transcoder process management.
//!
//! [`runner`] spawns the transcoder with a fully-built argument vector and
//! streams its output line by line; [`progress`] turns recognized progress
//! lines into monotonic normalized fractions.

pub mod progress;
pub mod runner;

pub use progress::{normalize_out_time, parse_progress_line, OutTime, ProgressTranslator};
pub use runner::{render_command, run, run_with_line_handler, ProcessError, ProcessResult};
