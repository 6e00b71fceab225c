//! External process execution with line-streamed output.

use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};

use parking_lot::Mutex;
use thiserror::Error;

/// Error from spawning or waiting on an external process.
///
/// Both variants carry the exact command line that was attempted; the
/// diagnostic text is meant for direct display to the operator, so nothing
/// is redacted.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The executable could not be launched at all.
    #[error("failed to launch {program}: {source}\ncommand: {command}")]
    Spawn {
        program: String,
        command: String,
        #[source]
        source: io::Error,
    },

    /// The process ran but exited with a non-zero status.
    #[error("{program} failed (exit={exit_code})\n{command}\n{output}")]
    NonZeroExit {
        program: String,
        exit_code: i32,
        command: String,
        output: String,
    },
}

/// Result type for process operations.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Render an argument vector as a single diagnostic command line.
pub fn render_command(program: &Path, args: &[String]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Run a process to completion, capturing its combined output.
///
/// Returns the merged stdout+stderr transcript on success. A non-zero exit
/// becomes a [`ProcessError::NonZeroExit`] carrying the exact command line
/// and the full transcript for diagnosis.
pub fn run(program: &Path, args: &[String]) -> ProcessResult<String> {
    run_with_line_handler(program, args, &mut |_| {})
}

/// Run a process, feeding each stdout line to `on_line` as it arrives.
///
/// stdout is read line by line on the calling thread while stderr drains
/// concurrently; both streams land in the captured transcript. The call
/// blocks until the process exits.
pub fn run_with_line_handler(
    program: &Path,
    args: &[String],
    on_line: &mut dyn FnMut(&str),
) -> ProcessResult<String> {
    let command = render_command(program, args);
    tracing::debug!("Running: {}", command);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.display().to_string(),
            command: command.clone(),
            source,
        })?;

    let transcript = Mutex::new(String::new());
    let transcript_ref = &transcript;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    std::thread::scope(|scope| {
        if let Some(pipe) = stderr {
            scope.spawn(move || {
                for line in BufReader::new(pipe).lines().map_while(Result::ok) {
                    let mut t = transcript_ref.lock();
                    t.push_str(&line);
                    t.push('\n');
                }
            });
        }
        if let Some(pipe) = stdout {
            for line in BufReader::new(pipe).lines().map_while(Result::ok) {
                on_line(&line);
                let mut t = transcript_ref.lock();
                t.push_str(&line);
                t.push('\n');
            }
        }
    });

    let status = child.wait().map_err(|source| ProcessError::Spawn {
        program: program.display().to_string(),
        command: command.clone(),
        source,
    })?;

    let output = transcript.into_inner();

    if !status.success() {
        return Err(ProcessError::NonZeroExit {
            program: program.display().to_string(),
            exit_code: status.code().unwrap_or(-1),
            command,
            output,
        });
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn render_command_joins_args() {
        let line = render_command(Path::new("ffmpeg"), &args(&["-y", "-i", "in.mp4"]));
        assert_eq!(line, "ffmpeg -y -i in.mp4");
    }

    #[test]
    fn missing_executable_reports_command() {
        let program = PathBuf::from("definitely-missing-transcoder");
        let err = run(&program, &args(&["-version"])).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, ProcessError::Spawn { .. }));
        assert!(msg.contains("definitely-missing-transcoder -version"));
    }

    #[cfg(unix)]
    #[test]
    fn captures_output_and_streams_lines() {
        let mut seen = Vec::new();
        let out = run_with_line_handler(
            Path::new("sh"),
            &args(&["-c", "printf 'alpha\\nbeta\\n'"]),
            &mut |line| seen.push(line.to_string()),
        )
        .unwrap();
        assert_eq!(seen, vec!["alpha", "beta"]);
        assert!(out.contains("alpha\nbeta\n"));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_carries_transcript() {
        let err = run(Path::new("sh"), &args(&["-c", "echo boom >&2; exit 3"])).unwrap_err();
        match err {
            ProcessError::NonZeroExit {
                exit_code, output, ..
            } => {
                assert_eq!(exit_code, 3);
                assert!(output.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
