//! Snippet evaluation through an isolated `jq` subprocess.
//!
//! Each evaluation spawns `jq -n -c <filter>` with no stdin, waits under a
//! hard timeout, and parses the first JSON value from stdout. The child is
//! killed if the wait is abandoned.

use std::{process::Stdio, time::Duration};

use {
    async_trait::async_trait,
    futures::{StreamExt, stream},
    serde_json::Value,
    tokio::process::Command,
    tracing::debug,
};

use crate::snippets::{EmbeddedSnippet, substitute_placeholders};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("evaluation timed out after {0:?}")]
    Timeout(Duration),

    #[error("evaluation failed: {0}")]
    Failed(String),

    #[error("evaluator output is not JSON: {0}")]
    ParseFailed(String),
}

/// Materializes a placeholder-substituted filter into concrete JSON.
#[async_trait]
pub trait SnippetEvaluator: Send + Sync {
    async fn evaluate(&self, filter: &str) -> Result<Value, EvalError>;
}

pub struct JqEvaluator {
    program: String,
    timeout: Duration,
}

impl JqEvaluator {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl SnippetEvaluator for JqEvaluator {
    async fn evaluate(&self, filter: &str) -> Result<Value, EvalError> {
        let child = Command::new(&self.program)
            .arg("-n")
            .arg("-c")
            .arg(filter)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EvalError::Failed(format!("failed to start `{}`: {e}", self.program)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| EvalError::Timeout(self.timeout))?
            .map_err(|e| EvalError::Failed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .find(|line| !line.trim().is_empty())
                .map(str::trim)
                .map(str::to_string)
                .unwrap_or_else(|| format!("exited with {}", output.status));
            return Err(EvalError::Failed(reason));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(program = %self.program, stdout_len = stdout.len(), "snippet evaluated");
        parse_first_value(&stdout)
    }
}

fn parse_first_value(stdout: &str) -> Result<Value, EvalError> {
    serde_json::Deserializer::from_str(stdout)
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| EvalError::ParseFailed("no output".into()))?
        .map_err(|e| EvalError::ParseFailed(e.to_string()))
}

/// Substitute placeholders into `snippet` and evaluate it.
pub async fn evaluate_snippet(
    evaluator: &dyn SnippetEvaluator,
    snippet: &EmbeddedSnippet,
) -> Result<Value, EvalError> {
    evaluator
        .evaluate(&substitute_placeholders(&snippet.filter))
        .await
}

/// Evaluate many snippets with at most `concurrency` in flight. Results come
/// back in input order.
pub async fn evaluate_all(
    evaluator: &dyn SnippetEvaluator,
    snippets: &[EmbeddedSnippet],
    concurrency: usize,
) -> Vec<Result<Value, EvalError>> {
    stream::iter(snippets)
        .map(|snippet| evaluate_snippet(evaluator, snippet))
        .buffered(concurrency.max(1))
        .collect()
        .await
}
