//! Timeout-bounded execution of external analyzers.
//!
//! Exit codes are captured, never interpreted here: most analyzers exit
//! non-zero precisely when they found something.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// Captured output of one finished process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("executable not found: {}", .program.display())]
    NotFound { program: PathBuf },

    #[error("{} timed out after {timeout:?}", .program.display())]
    TimedOut { program: PathBuf, timeout: Duration },

    #[error("failed to launch {}: {source}", .program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Run `program` with `args`, capturing stdout, stderr and exit code.
///
/// The child is killed if `timeout` elapses first.
pub async fn run_command(
    program: &Path,
    args: &[OsString],
    timeout: Duration,
) -> Result<ToolOutput, ExecError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Err(_) => {
            return Err(ExecError::TimedOut {
                program: program.to_path_buf(),
                timeout,
            })
        }
        Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ExecError::NotFound {
                program: program.to_path_buf(),
            })
        }
        Ok(Err(e)) => {
            return Err(ExecError::Launch {
                program: program.to_path_buf(),
                source: e,
            })
        }
        Ok(Ok(output)) => output,
    };

    Ok(ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
    })
}

/// Render a command line for log output.
pub fn display_command(program: &Path, args: &[OsString]) -> String {
    std::iter::once(program.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_executable_is_not_found() {
        let err = run_command(
            Path::new("/definitely/not/a/real/tool-xyz"),
            &[],
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExecError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_streams_and_exit_code() {
        let args: Vec<OsString> = vec!["-c".into(), "echo out; echo err >&2; exit 3".into()];
        let output = run_command(Path::new("sh"), &args, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_process_times_out() {
        let args: Vec<OsString> = vec!["-c".into(), "sleep 5".into()];
        let err = run_command(Path::new("sh"), &args, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::TimedOut { .. }));
    }

    #[test]
    fn display_joins_program_and_args() {
        let args: Vec<OsString> = vec!["--json".into(), "app.py".into()];
        assert_eq!(
            display_command(Path::new("semgrep"), &args),
            "semgrep --json app.py"
        );
    }
}
