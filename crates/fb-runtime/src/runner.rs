use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use fb_config::RunnerConfig;
use tokio::process::Command;

/// A failed query invocation. `detail` is what the operator sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{detail}")]
pub struct RunFailure {
    pub detail: String,
}

impl RunFailure {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Executes one rendered query file and waits for it to finish.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    async fn run(&self, file: &Path) -> Result<(), RunFailure>;
}

/// Runs `<program> <args...> <file>` as a child process.
///
/// Stdout is discarded. Stderr is captured and becomes the failure detail
/// when the child exits non-zero.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
}

impl CommandRunner {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl QueryRunner for CommandRunner {
    async fn run(&self, file: &Path) -> Result<(), RunFailure> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RunFailure::new(format!("failed to start {}: {e}", self.program)))?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            Err(RunFailure::new(format!(
                "{} exited with {}",
                self.program, output.status
            )))
        } else {
            Err(RunFailure::new(stderr))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
