use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use di_platform::HideWindow;
use log::{debug, info};
use tokio::process::Command;

use crate::error::InstallError;
use crate::release::response_snippet;
use crate::traits::{Invocation, OutputMode, ProcessRunner};

const STDERR_SNIPPET_CHARS: usize = 400;

/// Runs child processes with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    fn build_command(invocation: &Invocation) -> Result<Command, InstallError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        cmd.current_dir(&invocation.cwd);

        if !invocation.search_path.dirs().is_empty() {
            let path = invocation
                .search_path
                .to_os_string()
                .map_err(|error| InstallError::Spawn {
                    command: invocation.display_command(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidInput, error),
                })?;
            cmd.env("PATH", path);
        }

        Ok(cmd)
    }

    fn spawn_error(invocation: &Invocation, source: std::io::Error) -> InstallError {
        InstallError::Spawn {
            command: invocation.display_command(),
            source,
        }
    }

    fn check_status(
        invocation: &Invocation,
        status: ExitStatus,
        stderr: &[u8],
    ) -> Result<(), InstallError> {
        if status.success() {
            return Ok(());
        }

        Err(InstallError::Subprocess {
            command: invocation.display_command(),
            code: status.code(),
            stderr: response_snippet(&String::from_utf8_lossy(stderr), STDERR_SNIPPET_CHARS),
        })
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<(), InstallError> {
        let mut cmd = Self::build_command(invocation)?;
        info!(
            "Running `{}` in {}",
            invocation.display_command(),
            invocation.cwd.display()
        );

        match invocation.output {
            OutputMode::Inherit => {
                let status = cmd
                    .status()
                    .await
                    .map_err(|error| Self::spawn_error(invocation, error))?;
                Self::check_status(invocation, status, &[])
            }
            OutputMode::Silent => {
                let output = cmd
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::piped())
                    .hide_window()
                    .output()
                    .await
                    .map_err(|error| Self::spawn_error(invocation, error))?;
                Self::check_status(invocation, output.status, &output.stderr)
            }
        }
    }

    async fn capture(&self, invocation: &Invocation) -> Result<String, InstallError> {
        let mut cmd = Self::build_command(invocation)?;
        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .hide_window()
            .output()
            .await
            .map_err(|error| Self::spawn_error(invocation, error))?;
        Self::check_status(invocation, output.status, &output.stderr)?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("`{}` printed {stdout:?}", invocation.display_command());
        Ok(stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::TokioProcessRunner;
    use crate::error::{ErrorKind, InstallError};
    use crate::traits::{Invocation, OutputMode, ProcessRunner};

    fn sh(script: &str, cwd: &std::path::Path) -> Invocation {
        Invocation::new("/bin/sh", ["-c", script], cwd)
    }

    #[tokio::test]
    async fn capture_returns_trimmed_stdout_from_cwd() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        std::fs::write(temp.path().join("marker"), "v8.4.0\n").expect("marker should be written");

        let stdout = TokioProcessRunner
            .capture(&sh("cat marker", temp.path()))
            .await
            .expect("command should succeed");

        assert_eq!(stdout, "v8.4.0");
    }

    #[tokio::test]
    async fn silent_failure_reports_exit_code_and_stderr() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let invocation = sh("echo 'ERR! missing' >&2; exit 3", temp.path()).output(OutputMode::Silent);

        let error = TokioProcessRunner
            .run(&invocation)
            .await
            .expect_err("non-zero exit should fail");

        match &error {
            InstallError::Subprocess { code, stderr, .. } => {
                assert_eq!(*code, Some(3));
                assert!(stderr.contains("ERR! missing"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(error.kind(), ErrorKind::Subprocess);
        assert!(error.to_string().starts_with("`sh -c"));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let invocation = Invocation::new(temp.path().join("no-such-node"), ["-v"], temp.path());

        let error = TokioProcessRunner
            .run(&invocation)
            .await
            .expect_err("missing program should fail");

        assert!(matches!(error, InstallError::Spawn { .. }));
    }
}
