//! Execution dispatcher
//!
//! Handles one dequeued [`ExecutionRequest`] end to end: attribution,
//! runtime selection, decryption, workspace setup, build and run,
//! classification, cleanup and the single log write. Every failure is turned
//! into an [`ExecutionOutcome`]; nothing propagates back to the queue.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

use crate::blob::resolve_code_location;
use crate::config::FlexiConfig;
use crate::core_types::{
    ExecutionLog, ExecutionOutcome, ExecutionRequest, Function, ProcessResult, User,
};
use crate::crypto::{CryptoClient, CryptoService, HttpCryptoService};
use crate::errors::{CryptoServiceError, DispatchError};
use crate::executors::{split_args, StrategyRegistry};
use crate::runtime::normalize;
use crate::store::{ExecutionLogSink, FunctionStore, UserStore};
use crate::workspace::WorkspaceManager;

pub struct Dispatcher {
    functions: Arc<dyn FunctionStore>,
    users: Arc<dyn UserStore>,
    log_sink: Arc<dyn ExecutionLogSink>,
    crypto: CryptoClient,
    strategies: StrategyRegistry,
    workspaces: WorkspaceManager,
    uploads_dir: PathBuf,
}

impl Dispatcher {
    pub fn new(
        config: &FlexiConfig,
        functions: Arc<dyn FunctionStore>,
        users: Arc<dyn UserStore>,
        log_sink: Arc<dyn ExecutionLogSink>,
        crypto_service: Arc<dyn CryptoService>,
    ) -> Self {
        Self {
            functions,
            users,
            log_sink,
            crypto: CryptoClient::new(crypto_service),
            strategies: StrategyRegistry::with_defaults(&config.runtimes),
            workspaces: WorkspaceManager::new(config.workspace.root.clone()),
            uploads_dir: config.storage.uploads_dir.clone(),
        }
    }

    /// Dispatcher talking to the crypto service over HTTP.
    pub fn with_http_crypto(
        config: &FlexiConfig,
        functions: Arc<dyn FunctionStore>,
        users: Arc<dyn UserStore>,
        log_sink: Arc<dyn ExecutionLogSink>,
    ) -> Result<Self, CryptoServiceError> {
        let service = Arc::new(HttpCryptoService::from_config(&config.crypto)?);
        Ok(Self::new(config, functions, users, log_sink, service))
    }

    pub fn with_strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Handles one request and appends at most one execution log.
    pub async fn handle(&self, request: ExecutionRequest) {
        self.handle_with_outcome(request).await;
    }

    /// Like [`Dispatcher::handle`], returning the log record when one was written.
    pub async fn handle_with_outcome(&self, request: ExecutionRequest) -> Option<ExecutionLog> {
        let executed_at = Utc::now();

        let (function, user) = self.attribute(&request).await?;
        log::info!(
            "Executing function {} ({}) for user {} ({})",
            function.id,
            function.runtime,
            user.id,
            user.username
        );

        let outcome = self.execute(&function, &request, executed_at).await;
        match &outcome.error_message {
            Some(message) => log::warn!(
                "Function {} finished with {}: {}",
                function.id,
                outcome.status,
                message
            ),
            None => log::info!("Function {} finished with {}", function.id, outcome.status),
        }

        let record = ExecutionLog::new(&request, outcome);
        if let Err(e) = self.log_sink.append(record.clone()).await {
            log::error!(
                "Failed to persist execution log for function {}: {}",
                function.id,
                e
            );
        }
        Some(record)
    }

    // Unattributable requests are dropped without a log entry.
    async fn attribute(&self, request: &ExecutionRequest) -> Option<(Function, User)> {
        let function = match self.functions.find_function(request.function_id).await {
            Ok(found) => found,
            Err(e) => {
                log::error!("Function lookup for {} failed: {}", request.function_id, e);
                return None;
            }
        };
        let user = match self.users.find_user(request.user_id).await {
            Ok(found) => found,
            Err(e) => {
                log::error!("User lookup for {} failed: {}", request.user_id, e);
                return None;
            }
        };

        match (function, user) {
            (Some(function), Some(user)) => Some((function, user)),
            (function, user) => {
                log::warn!(
                    "Dropping execution request: function {} {}, user {} {}",
                    request.function_id,
                    if function.is_some() { "found" } else { "not found" },
                    request.user_id,
                    if user.is_some() { "found" } else { "not found" },
                );
                None
            }
        }
    }

    async fn execute(
        &self,
        function: &Function,
        request: &ExecutionRequest,
        executed_at: DateTime<Utc>,
    ) -> ExecutionOutcome {
        let result = self.build_and_run(function, request).await;
        ExecutionOutcome::from_execution(result, executed_at)
    }

    async fn build_and_run(
        &self,
        function: &Function,
        request: &ExecutionRequest,
    ) -> Result<ProcessResult, DispatchError> {
        let runtime = normalize(&function.runtime)
            .ok_or_else(|| DispatchError::UnsupportedRuntime(function.runtime.clone()))?;
        let strategy = self
            .strategies
            .get(runtime)
            .ok_or_else(|| DispatchError::UnsupportedRuntime(function.runtime.clone()))?;

        let blob = resolve_code_location(&self.uploads_dir, &function.code_location);
        let code = self.crypto.decrypt(&blob).await?;
        let args = split_args(&request.input_payload);

        let workspace = self.workspaces.acquire(strategy.layout()).await?;
        let result = strategy.execute(&code, &args, &workspace).await;
        workspace.release().await;

        Ok(result?)
    }
}
