use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{BuildRunStrategy, ProcessRunner};
use crate::core_types::ProcessResult;
use crate::errors::ExecutorError;
use crate::workspace::{ScopedDir, WorkspaceLayout};

/// Runs a source file directly with an interpreter (python, node).
pub struct InterpretedStrategy {
    interpreter: String,
    extension: String,
    runner: ProcessRunner,
}

impl InterpretedStrategy {
    pub fn new(interpreter: String, extension: &str, runner: ProcessRunner) -> Self {
        Self {
            interpreter,
            extension: extension.trim_start_matches('.').to_string(),
            runner,
        }
    }
}

#[async_trait]
impl BuildRunStrategy for InterpretedStrategy {
    fn layout(&self) -> WorkspaceLayout {
        WorkspaceLayout::Flat
    }

    async fn execute(
        &self,
        code: &[u8],
        args: &[String],
        workspace: &ScopedDir,
    ) -> Result<ProcessResult, ExecutorError> {
        let script_path = workspace.path().join(format!("main.{}", self.extension));
        let mut file = fs::File::create(&script_path).await?;
        file.write_all(code).await?;
        file.flush().await?;

        let mut command_args = Vec::with_capacity(args.len() + 1);
        command_args.push(script_path.to_string_lossy().into_owned());
        command_args.extend(args.iter().cloned());

        self.runner
            .run(&self.interpreter, &command_args, workspace.path())
            .await
    }
}
