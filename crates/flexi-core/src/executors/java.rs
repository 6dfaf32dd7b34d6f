use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{BuildRunStrategy, ProcessRunner};
use crate::core_types::ProcessResult;
use crate::errors::ExecutorError;
use crate::workspace::{ScopedDir, WorkspaceLayout};

static PACKAGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bpackage\s+([A-Za-z_][\w.]*)\s*;").expect("valid package regex"));
static CLASS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bpublic\s+class\s+([A-Za-z_][A-Za-z0-9_]*)\b").expect("valid class regex")
});

/// Package and public class declared by a Java source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaClassInfo {
    pub package_name: Option<String>,
    pub class_name: String,
}

impl JavaClassInfo {
    /// Parses the first `package` and `public class` declarations.
    pub fn parse(source: &str) -> Result<Self, ExecutorError> {
        if !source.contains("class") {
            return Err(ExecutorError::BuildFailed(
                "Decryption succeeded but content doesn't look like Java source.".to_string(),
            ));
        }

        let package_name = PACKAGE_PATTERN
            .captures(source)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|name| !name.is_empty());

        let class_name = CLASS_PATTERN
            .captures(source)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                ExecutorError::BuildFailed(
                    "Could not determine public class name from Java file.".to_string(),
                )
            })?;

        Ok(Self {
            package_name,
            class_name,
        })
    }

    /// Fully-qualified class name, package-qualified when a package is declared.
    pub fn fqcn(&self) -> String {
        match &self.package_name {
            Some(package) => format!("{}.{}", package, self.class_name),
            None => self.class_name.clone(),
        }
    }
}

/// Compiles a single Java source with javac and runs the resulting class.
pub struct JavaStrategy {
    javac: String,
    java: String,
    runner: ProcessRunner,
}

impl JavaStrategy {
    pub fn new(javac: String, java: String, runner: ProcessRunner) -> Self {
        Self { javac, java, runner }
    }
}

#[async_trait]
impl BuildRunStrategy for JavaStrategy {
    fn layout(&self) -> WorkspaceLayout {
        WorkspaceLayout::Compiled
    }

    async fn execute(
        &self,
        code: &[u8],
        args: &[String],
        workspace: &ScopedDir,
    ) -> Result<ProcessResult, ExecutorError> {
        let source = String::from_utf8_lossy(code);
        let info = JavaClassInfo::parse(&source)?;

        let src_dir = workspace.src_dir();
        let bin_dir = workspace.bin_dir();
        let package_dir = match &info.package_name {
            Some(package) => package.split('.').fold(src_dir, |dir, part| dir.join(part)),
            None => src_dir,
        };
        fs::create_dir_all(&package_dir).await?;
        fs::create_dir_all(&bin_dir).await?;

        let source_path = package_dir.join(format!("{}.java", info.class_name));
        let mut file = fs::File::create(&source_path).await?;
        file.write_all(code).await?;
        file.flush().await?;

        let bin = bin_dir.to_string_lossy().into_owned();
        let compile_args = vec![
            "-d".to_string(),
            bin.clone(),
            source_path.to_string_lossy().into_owned(),
        ];
        log::debug!("Compiling {} with {}", info.fqcn(), self.javac);
        let compiled = self
            .runner
            .run(&self.javac, &compile_args, workspace.path())
            .await?;
        if !compiled.success() {
            return Err(ExecutorError::BuildFailed(format!(
                "Java compilation failed:\n{}",
                compiled.combined_output
            )));
        }

        let mut run_args = vec!["-cp".to_string(), bin, info.fqcn()];
        run_args.extend(args.iter().cloned());
        self.runner.run(&self.java, &run_args, workspace.path()).await
    }
}
