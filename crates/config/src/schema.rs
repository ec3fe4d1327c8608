/// Config schema types (paths, exit policy, snippet evaluator).
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration.
///
/// Relative paths are resolved against the repository root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Central registry file listing installable plugins.
    pub registry: PathBuf,
    /// Directory whose immediate children are plugin directories.
    pub plugins_dir: PathBuf,
    /// Schema asset the registry is validated against.
    pub schema: PathBuf,
    pub policy: PolicyConfig,
    pub evaluator: EvaluatorConfig,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            registry: PathBuf::from(".claude-plugin/marketplace.json"),
            plugins_dir: PathBuf::from("plugins"),
            schema: PathBuf::from("schemas/marketplace.schema.json"),
            policy: PolicyConfig::default(),
            evaluator: EvaluatorConfig::default(),
        }
    }
}

impl VerifyConfig {
    pub fn registry_path(&self, root: &Path) -> PathBuf {
        resolve(root, &self.registry)
    }

    pub fn plugins_path(&self, root: &Path) -> PathBuf {
        resolve(root, &self.plugins_dir)
    }

    pub fn schema_path(&self, root: &Path) -> PathBuf {
        resolve(root, &self.schema)
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Exit policy. `strict = true` turns the run into a release gate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Promote warnings to failures.
    pub strict: bool,
}

/// Subprocess used to materialize JSON-construction snippets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Program invoked as `<program> -n -c <filter>`.
    pub program: String,
    /// Hard per-snippet timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of evaluations in flight.
    pub concurrency: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            program: "jq".into(),
            timeout_ms: 5_000,
            concurrency: 4,
        }
    }
}
