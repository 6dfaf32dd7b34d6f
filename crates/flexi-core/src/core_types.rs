use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DispatchError, ExecutorError};

/// A queued request to run a stored function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub function_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub input_payload: String,
}

impl ExecutionRequest {
    pub fn new(function_id: i64, user_id: i64, input_payload: impl Into<String>) -> Self {
        Self {
            function_id,
            user_id,
            input_payload: input_payload.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    pub id: i64,
    pub owner_id: i64,
    #[serde(default)]
    pub name: String,
    pub runtime: String,
    pub code_location: String,
    #[serde(default = "default_function_status")]
    pub status: String,
}

fn default_function_status() -> String {
    "ACTIVE".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Error,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Success => write!(f, "SUCCESS"),
            ExecutionStatus::Failed => write!(f, "FAILED"),
            ExecutionStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Raw result of a finished child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub exit_code: i32,
    pub combined_output: String,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Terminal outcome of one handled request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    pub output: Option<String>,
    pub error_message: Option<String>,
    pub executed_at: DateTime<Utc>,
}

impl ExecutionOutcome {
    pub fn success(output: String, executed_at: DateTime<Utc>) -> Self {
        Self {
            status: ExecutionStatus::Success,
            output: Some(output),
            error_message: None,
            executed_at,
        }
    }

    pub fn failed(message: String, executed_at: DateTime<Utc>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            output: None,
            error_message: Some(message),
            executed_at,
        }
    }

    pub fn error(message: String, executed_at: DateTime<Utc>) -> Self {
        Self {
            status: ExecutionStatus::Error,
            output: None,
            error_message: Some(message),
            executed_at,
        }
    }

    /// Classifies the result of running a strategy.
    ///
    /// Zero exit is SUCCESS, a build failure or non-zero exit is FAILED and
    /// anything else is ERROR.
    pub fn from_execution(
        result: Result<ProcessResult, DispatchError>,
        executed_at: DateTime<Utc>,
    ) -> Self {
        match result {
            Ok(process) if process.success() => Self::success(process.combined_output, executed_at),
            Ok(process) => Self::failed(process.combined_output, executed_at),
            Err(DispatchError::Executor(ExecutorError::BuildFailed(message))) => {
                Self::failed(message, executed_at)
            }
            Err(err) => Self::error(err.to_string(), executed_at),
        }
    }
}

/// Append-only record persisted once per attributed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    pub function_id: i64,
    pub user_id: i64,
    pub input_payload: String,
    pub status: ExecutionStatus,
    pub output: Option<String>,
    pub error_message: Option<String>,
    pub executed_at: DateTime<Utc>,
}

impl ExecutionLog {
    pub fn new(request: &ExecutionRequest, outcome: ExecutionOutcome) -> Self {
        Self {
            function_id: request.function_id,
            user_id: request.user_id,
            input_payload: request.input_payload.clone(),
            status: outcome.status,
            output: outcome.output,
            error_message: outcome.error_message,
            executed_at: outcome.executed_at,
        }
    }
}
