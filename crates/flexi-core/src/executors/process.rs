// src/executors/process.rs
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use which::which;

use crate::core_types::ProcessResult;
use crate::errors::ExecutorError;

/// Spawns child processes and collects their merged output.
///
/// stdout and stderr share one pipe, so the captured text keeps the order in
/// which the child wrote it. There is no timeout: a child that never exits
/// keeps the calling worker waiting.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(
        &self,
        command: &str,
        args: &[String],
        working_dir: &Path,
    ) -> Result<ProcessResult, ExecutorError> {
        let program = resolve_command(command, &std::env::current_dir()?)?;
        log::debug!(
            "Running {} {:?} in {}",
            program.display(),
            args,
            working_dir.display()
        );

        let (mut reader, writer) = std::io::pipe()?;
        let stderr_writer = writer.try_clone()?;

        // The builder owns the write ends; it must be dropped once the child
        // is spawned or the reader never sees EOF.
        let mut child = {
            let mut cmd = Command::new(&program);
            cmd.args(args)
                .current_dir(working_dir)
                .stdin(Stdio::null())
                .stdout(writer)
                .stderr(stderr_writer)
                .kill_on_drop(true);
            cmd.spawn().map_err(|e| ExecutorError::SpawnFailed {
                command: command.to_string(),
                message: e.to_string(),
            })?
        };

        let collector = tokio::task::spawn_blocking(move || {
            let mut output = Vec::new();
            reader.read_to_end(&mut output).map(|_| output)
        });

        let status = child.wait().await?;
        let output = collector
            .await
            .map_err(|e| ExecutorError::IoError(format!("output reader failed: {}", e)))??;
        let exit_code = status.code().unwrap_or(-1);
        log::debug!("{} exited with code {}", program.display(), exit_code);

        Ok(ProcessResult {
            exit_code,
            combined_output: normalize_output(&output),
        })
    }
}

// CRLF to LF, lossy UTF-8, trailing whitespace dropped.
fn normalize_output(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .replace("\r\n", "\n")
        .trim_end()
        .to_string()
}

/// Bare names are looked up on PATH; anything with a directory part is taken
/// as a path, relative ones against `base_dir`.
fn resolve_command(command: &str, base_dir: &Path) -> Result<PathBuf, ExecutorError> {
    let candidate = Path::new(command);
    if candidate.components().count() > 1 {
        let path = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            base_dir.join(candidate)
        };
        if path.exists() {
            return Ok(path);
        }
        return Err(ExecutorError::CommandNotFound {
            command: command.to_string(),
            message: format!("{} does not exist", path.display()),
        });
    }

    which(command).map_err(|e| ExecutorError::CommandNotFound {
        command: command.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let dir = tempdir().unwrap();
        let result = ProcessRunner::new()
            .run("sh", &sh("echo hello; echo world"), dir.path())
            .await
            .unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.combined_output, "hello\nworld");
    }

    #[tokio::test]
    async fn test_merges_stderr_and_trims_trailing_whitespace() {
        let dir = tempdir().unwrap();
        let result = ProcessRunner::new()
            .run("sh", &sh("echo oops 1>&2; printf 'done  \\n\\n'; exit 3"), dir.path())
            .await
            .unwrap();
        assert_eq!(result.exit_code, 3);
        assert!(result.combined_output.contains("oops"));
        assert!(result.combined_output.contains("done"));
        assert!(!result.combined_output.ends_with(char::is_whitespace));
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let result = ProcessRunner::new()
            .run("sh", &sh("cat marker.txt"), dir.path())
            .await
            .unwrap();
        assert_eq!(result.combined_output, "here");
    }

    #[tokio::test]
    async fn test_missing_command_is_reported() {
        let dir = tempdir().unwrap();
        let err = ProcessRunner::new()
            .run("flexi-no-such-binary", &[], dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::CommandNotFound { .. }));
        assert!(err.to_string().contains("flexi-no-such-binary"));
    }

    #[tokio::test]
    async fn test_empty_output_is_empty_string() {
        let dir = tempdir().unwrap();
        let result = ProcessRunner::new()
            .run("sh", &sh("exit 0"), dir.path())
            .await
            .unwrap();
        assert_eq!(result.combined_output, "");
        assert!(result.success());
    }

    #[tokio::test]
    async fn test_stdout_and_stderr_keep_write_order() {
        let dir = tempdir().unwrap();
        let script = "i=0; while [ $i -lt 200 ]; do echo out$i; echo err$i 1>&2; i=$((i+1)); done";
        let expected: Vec<String> = (0..200)
            .flat_map(|i| [format!("out{}", i), format!("err{}", i)])
            .collect();

        for _ in 0..3 {
            let result = ProcessRunner::new()
                .run("sh", &sh(script), dir.path())
                .await
                .unwrap();
            let lines: Vec<&str> = result.combined_output.lines().collect();
            assert_eq!(lines, expected);
        }
    }

    #[tokio::test]
    async fn test_crlf_and_invalid_utf8_are_normalized() {
        let dir = tempdir().unwrap();
        let result = ProcessRunner::new()
            .run("sh", &sh("printf 'a\\r\\nb\\377\\n'"), dir.path())
            .await
            .unwrap();
        assert_eq!(result.combined_output, "a\nb\u{FFFD}");
    }

    #[test]
    fn test_relative_path_resolves_against_base_dir_not_workspace() {
        let base = tempdir().unwrap();
        let tool = base.path().join("venv").join("bin").join("python");
        std::fs::create_dir_all(tool.parent().unwrap()).unwrap();
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();

        let resolved = resolve_command("venv/bin/python", base.path()).unwrap();
        assert_eq!(resolved, tool);

        let elsewhere = tempdir().unwrap();
        let err = resolve_command("venv/bin/python", elsewhere.path()).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_relative_command_is_not_looked_up_in_working_dir() {
        let workspace = tempdir().unwrap();
        let tool = workspace.path().join("tools").join("fake");
        std::fs::create_dir_all(tool.parent().unwrap()).unwrap();
        std::fs::write(&tool, "#!/bin/sh\necho from-workspace\n").unwrap();

        let err = ProcessRunner::new()
            .run("tools/fake", &[], workspace.path())
            .await
            .unwrap_err();
        match err {
            ExecutorError::CommandNotFound { message, .. } => {
                let cwd = std::env::current_dir().unwrap();
                assert!(message.contains(&cwd.join("tools").join("fake").display().to_string()));
            }
            other => panic!("expected CommandNotFound, got {:?}", other),
        }
    }
}
