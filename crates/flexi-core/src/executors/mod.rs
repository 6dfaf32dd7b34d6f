//! Build/run strategies for submitted code.
//!
//! Each canonical runtime has one strategy that knows how to lay out the
//! decrypted source in a workspace, compile it when needed and run it through
//! the [`process::ProcessRunner`]. Strategies are looked up in a
//! [`StrategyRegistry`], so supporting a new runtime means registering a new
//! implementation rather than growing a branch chain.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::RuntimeCommands;
use crate::core_types::ProcessResult;
use crate::errors::ExecutorError;
use crate::runtime::CanonicalRuntime;
use crate::workspace::{ScopedDir, WorkspaceLayout};

pub mod interpreted;
pub mod java;
pub mod process;

pub use interpreted::InterpretedStrategy;
pub use java::JavaStrategy;
pub use process::ProcessRunner;

#[async_trait]
pub trait BuildRunStrategy: Send + Sync {
    /// Workspace shape this strategy expects to be handed.
    fn layout(&self) -> WorkspaceLayout;

    async fn execute(
        &self,
        code: &[u8],
        args: &[String],
        workspace: &ScopedDir,
    ) -> Result<ProcessResult, ExecutorError>;
}

// Registry mapping canonical runtimes to their strategies
pub struct StrategyRegistry {
    strategies: HashMap<CanonicalRuntime, Arc<dyn BuildRunStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Registry with the built-in Java, Python and JavaScript strategies.
    pub fn with_defaults(commands: &RuntimeCommands) -> Self {
        let runner = ProcessRunner::new();
        let mut registry = Self::new();
        registry.register(
            CanonicalRuntime::Java,
            Arc::new(JavaStrategy::new(
                commands.javac.clone(),
                commands.java.clone(),
                runner.clone(),
            )),
        );
        registry.register(
            CanonicalRuntime::Python,
            Arc::new(InterpretedStrategy::new(
                commands.python.clone(),
                CanonicalRuntime::Python.extension(),
                runner.clone(),
            )),
        );
        registry.register(
            CanonicalRuntime::JavaScript,
            Arc::new(InterpretedStrategy::new(
                commands.node.clone(),
                CanonicalRuntime::JavaScript.extension(),
                runner,
            )),
        );
        registry
    }

    pub fn register(&mut self, runtime: CanonicalRuntime, strategy: Arc<dyn BuildRunStrategy>) {
        self.strategies.insert(runtime, strategy);
    }

    pub fn get(&self, runtime: CanonicalRuntime) -> Option<Arc<dyn BuildRunStrategy>> {
        self.strategies.get(&runtime).cloned()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults(&RuntimeCommands::default())
    }
}

/// Splits an input payload into process arguments on runs of whitespace.
pub fn split_args(payload: &str) -> Vec<String> {
    payload.split_whitespace().map(str::to_string).collect()
}
