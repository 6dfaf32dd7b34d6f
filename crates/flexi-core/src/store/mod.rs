//! External persistence seen from the dispatcher.
//!
//! The dispatcher only reads functions and users by id and appends execution
//! logs. Anything richer (CRUD, querying logs) belongs to the API layer.

use async_trait::async_trait;

use crate::core_types::{ExecutionLog, Function, User};
use crate::errors::StoreError;

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlLogSink;
pub use memory::{Catalog, InMemoryStore};

#[async_trait]
pub trait FunctionStore: Send + Sync {
    async fn find_function(&self, id: i64) -> Result<Option<Function>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;
}

/// Append-only sink for execution logs.
#[async_trait]
pub trait ExecutionLogSink: Send + Sync {
    async fn append(&self, log: ExecutionLog) -> Result<(), StoreError>;
}
