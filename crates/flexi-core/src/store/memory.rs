use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

use super::{ExecutionLogSink, FunctionStore, UserStore};
use crate::core_types::{ExecutionLog, Function, User};
use crate::errors::StoreError;

/// Functions and users known to a worker, loadable from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub functions: Vec<Function>,
    #[serde(default)]
    pub users: Vec<User>,
}

impl Catalog {
    pub fn from_yaml(content: &str) -> Result<Self, StoreError> {
        serde_yaml::from_str(content).map_err(|e| StoreError::Catalog(e.to_string()))
    }

    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            StoreError::Catalog(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }
}

/// In-process store holding functions, users and appended logs.
#[derive(Default)]
pub struct InMemoryStore {
    functions: RwLock<HashMap<i64, Function>>,
    users: RwLock<HashMap<i64, User>>,
    logs: RwLock<Vec<ExecutionLog>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_catalog(catalog: Catalog) -> Self {
        let functions = catalog.functions.into_iter().map(|f| (f.id, f)).collect();
        let users = catalog.users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            functions: RwLock::new(functions),
            users: RwLock::new(users),
            logs: RwLock::new(Vec::new()),
        }
    }

    pub async fn insert_function(&self, function: Function) {
        self.functions.write().await.insert(function.id, function);
    }

    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn logs(&self) -> Vec<ExecutionLog> {
        self.logs.read().await.clone()
    }

    pub async fn log_count(&self) -> usize {
        self.logs.read().await.len()
    }
}

#[async_trait]
impl FunctionStore for InMemoryStore {
    async fn find_function(&self, id: i64) -> Result<Option<Function>, StoreError> {
        Ok(self.functions.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl ExecutionLogSink for InMemoryStore {
    async fn append(&self, log: ExecutionLog) -> Result<(), StoreError> {
        self.logs.write().await.push(log);
        Ok(())
    }
}
