//! Execution core for a small multi-runtime function platform.
//!
//! A worker takes execution requests off a queue, looks up the stored
//! function and its caller, decrypts the function's code through a crypto
//! service and runs it in a throwaway workspace. Every attributable request
//! produces exactly one execution log.
//!
//! # Architecture Overview
//!
//! - **Dispatcher**: per-request pipeline from lookup to log append
//! - **Runtime normalization**: free-form runtime labels to a canonical runtime
//! - **Build/run strategies**: compiled (Java) and interpreted (Python, JavaScript) paths
//! - **Crypto client**: binary-then-text decryption with aggregated failures
//! - **Workspaces**: uniquely named scratch directories released on every path
//! - **Queue**: in-process producer/consumer with bounded concurrency
//! - **Configuration system**: YAML with environment overrides

pub mod blob;
pub mod config;
pub mod core_types;
pub mod crypto;
pub mod dispatcher;
pub mod errors;
pub mod executors;
pub mod queue;
pub mod runtime;
pub mod store;
pub mod workspace;

pub use config::*;
pub use core_types::{ExecutionLog, ExecutionOutcome, ExecutionRequest, ExecutionStatus};
pub use crypto::{CryptoClient, CryptoService, HttpCryptoService};
pub use dispatcher::Dispatcher;
pub use errors::DispatchError;
pub use executors::{BuildRunStrategy, StrategyRegistry};
pub use queue::{EnqueueAck, ExecutionQueue, QueueConsumer, QueueProducer};
pub use runtime::{normalize, CanonicalRuntime};
pub use store::{ExecutionLogSink, FunctionStore, InMemoryStore, JsonlLogSink, UserStore};
pub use workspace::WorkspaceManager;
