//! External process execution
//!
//! Runs the build tool and test runner. `Command::output` reads stdout and stderr to the
//! end before reaping the child, so a chatty tool cannot block on a full pipe.

use std::path::Path;
use std::process::Command;

use crate::core::text::tabify;
use crate::error::ProcessError;

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub status_code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }
}

/// Runs external programs to completion
pub trait ProcessRunner {
    fn run(&self, program: &Path, args: &[String]) -> Result<ProcessOutput, ProcessError>;
}

/// Runs programs with `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, program: &Path, args: &[String]) -> Result<ProcessOutput, ProcessError> {
        tracing::debug!("Running: {} {}", program.display(), args.join(" "));
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| ProcessError::Spawn {
                program: program.to_path_buf(),
                error: e.to_string(),
            })?;

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status_code: output.status.code(),
        })
    }
}

/// Run a program, log its output and fail on a non-zero exit code
pub fn run_checked(
    runner: &dyn ProcessRunner,
    program: &Path,
    args: &[String],
    log_prefix: &str,
    error_message: &str,
) -> Result<ProcessOutput, ProcessError> {
    let output = runner.run(program, args)?;
    log_process_output(program, args, log_prefix, &output);

    if !output.success() {
        tracing::warn!("{error_message}");
        return Err(ProcessError::FailedExitCode {
            message: error_message.to_string(),
            code: output.status_code,
        });
    }
    Ok(output)
}

fn log_process_output(program: &Path, args: &[String], prefix: &str, output: &ProcessOutput) {
    let stdout = output.stdout.trim();
    if !stdout.is_empty() {
        tracing::info!(
            "{prefix}: stdout of '{} {}':\n\n{}\n",
            program.display(),
            args.join(" "),
            tabify(stdout.lines())
        );
    }
    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        tracing::warn!(
            "{prefix}: stderr of '{} {}':\n\n{}\n",
            program.display(),
            args.join(" "),
            tabify(stderr.lines())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(ProcessOutput);

    impl ProcessRunner for Canned {
        fn run(&self, _program: &Path, _args: &[String]) -> Result<ProcessOutput, ProcessError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_run_checked_accepts_zero_exit() {
        let runner = Canned(ProcessOutput {
            stdout: "ok".to_string(),
            stderr: String::new(),
            status_code: Some(0),
        });
        let output = run_checked(&runner, Path::new("tool"), &[], "test", "failed").unwrap();
        assert_eq!(output.stdout, "ok");
    }

    #[test]
    fn test_run_checked_rejects_non_zero_exit() {
        let runner = Canned(ProcessOutput {
            stdout: String::new(),
            stderr: "boom".to_string(),
            status_code: Some(3),
        });
        let err = run_checked(&runner, Path::new("tool"), &[], "test", "Build failed: x").unwrap_err();
        match err {
            ProcessError::FailedExitCode { message, code } => {
                assert_eq!(message, "Build failed: x");
                assert_eq!(code, Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_system_runner_reports_spawn_failure() {
        let err = SystemProcessRunner
            .run(Path::new("/definitely/not/a/real/program"), &[])
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
