//! End-to-end tests for the dispatcher pipeline
//!
//! The crypto service is replaced by a scripted fake and every runtime is
//! pointed at `sh` or at small shell scripts standing in for javac/java, so
//! these tests only need a POSIX shell.

use async_trait::async_trait;
use flexi_core::config::FlexiConfig;
use flexi_core::core_types::{ExecutionRequest, ExecutionStatus, Function, User};
use flexi_core::crypto::CryptoService;
use flexi_core::errors::{CryptoServiceError, StoreError};
use flexi_core::store::{ExecutionLogSink, InMemoryStore, JsonlLogSink};
use flexi_core::{Dispatcher, ExecutionLog};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};

/// Crypto fake: each mode either returns fixed plaintext or fails.
struct ScriptedCrypto {
    binary: Result<Vec<u8>, String>,
    text: Result<Vec<u8>, String>,
    requested: Mutex<Vec<PathBuf>>,
}

impl ScriptedCrypto {
    fn binary(code: &str) -> Self {
        Self {
            binary: Ok(code.as_bytes().to_vec()),
            text: Err("text mode not expected".to_string()),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn text_only(code: &str) -> Self {
        Self {
            binary: Err("Given final block not properly padded".to_string()),
            text: Ok(code.as_bytes().to_vec()),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            binary: Err("bad padding".to_string()),
            text: Err("Illegal base64 character".to_string()),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<PathBuf> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl CryptoService for ScriptedCrypto {
    async fn decrypt_binary(&self, blob: &Path) -> Result<Vec<u8>, CryptoServiceError> {
        self.requested.lock().unwrap().push(blob.to_path_buf());
        self.binary.clone().map_err(CryptoServiceError::Blob)
    }

    async fn decrypt_text(&self, blob: &Path) -> Result<Vec<u8>, CryptoServiceError> {
        self.requested.lock().unwrap().push(blob.to_path_buf());
        self.text.clone().map_err(CryptoServiceError::Blob)
    }
}

struct FailingSink;

#[async_trait]
impl ExecutionLogSink for FailingSink {
    async fn append(&self, _log: ExecutionLog) -> Result<(), StoreError> {
        Err(StoreError::IoError("disk full".to_string()))
    }
}

fn create_fake_executable(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut file = fs::File::create(path).unwrap();
    writeln!(file, "#!/bin/sh").unwrap();
    writeln!(file, "{}", content).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).unwrap();
    }
}

/// Config whose runtimes all resolve to a shell.
fn shell_config(root: &Path) -> FlexiConfig {
    let mut config = FlexiConfig::default();
    config.storage.uploads_dir = root.join("uploads");
    config.workspace.root = Some(root.join("workspaces"));
    config.runtimes.python = "sh".to_string();
    config.runtimes.node = "sh".to_string();

    let javac = root.join("tools").join("javac");
    create_fake_executable(
        &javac,
        r#"if grep -q "syntax error" "$3"; then echo "$3:1: error: ';' expected"; exit 1; fi
mkdir -p "$2/demo" && touch "$2/demo/Hi.class""#,
    );
    let java = root.join("tools").join("java");
    create_fake_executable(&java, r#"echo "hi $4""#);
    config.runtimes.javac = javac.to_string_lossy().into_owned();
    config.runtimes.java = java.to_string_lossy().into_owned();
    config
}

struct Harness {
    root: TempDir,
    store: Arc<InMemoryStore>,
    crypto: Arc<ScriptedCrypto>,
    dispatcher: Dispatcher,
}

async fn harness(runtime: &str, crypto: ScriptedCrypto) -> Harness {
    let root = tempdir().unwrap();
    let config = shell_config(root.path());

    let store = Arc::new(InMemoryStore::new());
    store
        .insert_function(Function {
            id: 1,
            owner_id: 7,
            name: "demo".to_string(),
            runtime: runtime.to_string(),
            code_location: "user7_demo.enc".to_string(),
            status: "ACTIVE".to_string(),
        })
        .await;
    store
        .insert_user(User {
            id: 7,
            username: "ada".to_string(),
            email: None,
        })
        .await;

    let crypto = Arc::new(crypto);
    let dispatcher = Dispatcher::new(
        &config,
        store.clone(),
        store.clone(),
        store.clone(),
        crypto.clone(),
    );
    Harness {
        root,
        store,
        crypto,
        dispatcher,
    }
}

impl Harness {
    async fn run(&self, input: &str) -> ExecutionLog {
        self.dispatcher
            .handle(ExecutionRequest::new(1, 7, input))
            .await;
        let logs = self.store.logs().await;
        assert_eq!(logs.len(), 1, "exactly one log per handled request");
        assert!(
            self.dispatcher.workspaces().live_workspaces().unwrap().is_empty(),
            "workspace left behind"
        );
        logs.into_iter().next().unwrap()
    }
}

#[tokio::test]
async fn test_python_sum_succeeds() {
    let h = harness("python3.10", ScriptedCrypto::binary("echo $(($1 + $2 + $3))")).await;

    let log = h.run("2 3 4").await;
    assert_eq!(log.status, ExecutionStatus::Success);
    assert_eq!(log.output.as_deref(), Some("9"));
    assert!(log.error_message.is_none());
    assert_eq!(log.input_payload, "2 3 4");
    assert_eq!(log.function_id, 1);
    assert_eq!(log.user_id, 7);

    // relative code locations resolve inside the uploads directory
    assert_eq!(
        h.crypto.requested(),
        vec![h.root.path().join("uploads").join("user7_demo.enc")]
    );
}

#[tokio::test]
async fn test_node_non_zero_exit_is_failed() {
    let h = harness("nodejs18", ScriptedCrypto::binary("echo bad; exit 1")).await;

    let log = h.run("").await;
    assert_eq!(log.status, ExecutionStatus::Failed);
    assert!(log.error_message.as_deref().unwrap().contains("bad"));
    assert!(log.output.is_none());
}

#[tokio::test]
async fn test_unknown_runtime_is_error_without_decrypting() {
    let h = harness("cobol", ScriptedCrypto::binary("DISPLAY 'HI'")).await;

    let log = h.run("").await;
    assert_eq!(log.status, ExecutionStatus::Error);
    assert_eq!(log.error_message.as_deref(), Some("Unsupported runtime: cobol"));
    assert!(h.crypto.requested().is_empty());
}

#[tokio::test]
async fn test_text_fallback_after_binary_failure() {
    let h = harness("js", ScriptedCrypto::text_only("echo from-text")).await;

    let log = h.run("").await;
    assert_eq!(log.status, ExecutionStatus::Success);
    assert_eq!(log.output.as_deref(), Some("from-text"));
    assert_eq!(h.crypto.requested().len(), 2);
}

#[tokio::test]
async fn test_decryption_failure_names_both_modes() {
    let h = harness("python", ScriptedCrypto::failing()).await;

    let log = h.run("1").await;
    assert_eq!(log.status, ExecutionStatus::Error);
    let message = log.error_message.unwrap();
    assert!(message.starts_with("Decryption failed (tried binary then text)"));
    assert!(message.contains("bad padding"));
    assert!(message.contains("Illegal base64 character"));
}

#[tokio::test]
async fn test_java_compiles_then_runs() {
    let h = harness(
        "java17",
        ScriptedCrypto::binary(
            "package demo; public class Hi { public static void main(String[] a){ System.out.println(\"hi \" + a[0]); } }",
        ),
    )
    .await;

    let log = h.run("world").await;
    assert_eq!(log.status, ExecutionStatus::Success, "{:?}", log.error_message);
    assert_eq!(log.output.as_deref(), Some("hi world"));
}

#[tokio::test]
async fn test_java_compile_error_is_failed() {
    let h = harness(
        "JAVA",
        ScriptedCrypto::binary("public class Hi { syntax error }"),
    )
    .await;

    let log = h.run("").await;
    assert_eq!(log.status, ExecutionStatus::Failed);
    let message = log.error_message.unwrap();
    assert!(message.starts_with("Java compilation failed:\n"));
    assert!(message.contains("';' expected"));
}

#[tokio::test]
async fn test_java_without_public_class_is_failed() {
    let h = harness("java", ScriptedCrypto::binary("class Hidden {}")).await;

    let log = h.run("").await;
    assert_eq!(log.status, ExecutionStatus::Failed);
    assert_eq!(
        log.error_message.as_deref(),
        Some("Could not determine public class name from Java file.")
    );
}

#[tokio::test]
async fn test_unknown_function_or_user_is_dropped() {
    let h = harness("python", ScriptedCrypto::binary("echo x")).await;

    assert!(h
        .dispatcher
        .handle_with_outcome(ExecutionRequest::new(99, 7, ""))
        .await
        .is_none());
    assert!(h
        .dispatcher
        .handle_with_outcome(ExecutionRequest::new(1, 99, ""))
        .await
        .is_none());

    assert_eq!(h.store.log_count().await, 0);
    assert!(h.crypto.requested().is_empty());
}

#[tokio::test]
async fn test_sink_failure_does_not_escape() {
    let root = tempdir().unwrap();
    let config = shell_config(root.path());
    let store = Arc::new(InMemoryStore::new());
    store
        .insert_function(Function {
            id: 1,
            owner_id: 7,
            name: "demo".to_string(),
            runtime: "python".to_string(),
            code_location: "/abs/demo.py.enc".to_string(),
            status: "ACTIVE".to_string(),
        })
        .await;
    store
        .insert_user(User {
            id: 7,
            username: "ada".to_string(),
            email: None,
        })
        .await;

    let dispatcher = Dispatcher::new(
        &config,
        store.clone(),
        store.clone(),
        Arc::new(FailingSink),
        Arc::new(ScriptedCrypto::binary("echo ok")),
    );

    let record = dispatcher
        .handle_with_outcome(ExecutionRequest::new(1, 7, ""))
        .await
        .unwrap();
    assert_eq!(record.status, ExecutionStatus::Success);
    assert!(dispatcher.workspaces().live_workspaces().unwrap().is_empty());
}

#[tokio::test]
async fn test_jsonl_sink_gets_one_line_per_request() {
    let root = tempdir().unwrap();
    let config = shell_config(root.path());
    let store = Arc::new(InMemoryStore::new());
    store
        .insert_function(Function {
            id: 1,
            owner_id: 7,
            name: "demo".to_string(),
            runtime: "node".to_string(),
            code_location: "demo.js.enc".to_string(),
            status: "ACTIVE".to_string(),
        })
        .await;
    store
        .insert_user(User {
            id: 7,
            username: "ada".to_string(),
            email: None,
        })
        .await;

    let sink = Arc::new(JsonlLogSink::new(root.path().join("execution_logs.jsonl")));
    let dispatcher = Dispatcher::new(
        &config,
        store.clone(),
        store.clone(),
        sink.clone(),
        Arc::new(ScriptedCrypto::binary("echo \"$1\"")),
    );

    dispatcher.handle(ExecutionRequest::new(1, 7, "first")).await;
    dispatcher.handle(ExecutionRequest::new(1, 7, "second")).await;
    dispatcher.handle(ExecutionRequest::new(2, 7, "dropped")).await;

    let logs = sink.read_all().await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].output.as_deref(), Some("first"));
    assert_eq!(logs[1].output.as_deref(), Some("second"));
}
