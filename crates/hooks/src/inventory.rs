//! Hook script and installer script discovery.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use {
    regcheck_registry::PluginDirectory,
    serde::Serialize,
    tracing::{debug, warn},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLanguage {
    Python,
    Shell,
    JavaScript,
    TypeScript,
}

impl ScriptLanguage {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" => Some(Self::Python),
            "sh" | "bash" => Some(Self::Shell),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            "ts" => Some(Self::TypeScript),
            _ => None,
        }
    }
}

impl fmt::Display for ScriptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Python => write!(f, "python"),
            Self::Shell => write!(f, "shell"),
            Self::JavaScript => write!(f, "javascript"),
            Self::TypeScript => write!(f, "typescript"),
        }
    }
}

/// A script in a plugin's flat `hooks/` directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct HookFile {
    pub path: PathBuf,
    pub owning_plugin: String,
    pub filename: String,
    pub language: ScriptLanguage,
}

/// Internal helpers and test files never run as hooks.
fn is_excluded(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    lower.starts_with('_')
        || lower.starts_with("test_")
        || lower.contains("_test.")
        || lower.contains(".test.")
        || lower.contains(".spec.")
}

/// Recognized hook scripts directly under `<plugin>/hooks/`, sorted.
///
/// A plugin without a `hooks/` directory has no hook scripts.
pub fn discover_hook_files(plugin: &PluginDirectory) -> Vec<HookFile> {
    let dir = plugin.path.join("hooks");
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(?dir, %e, "failed to list hooks directory");
            return Vec::new();
        },
    };

    let mut files: Vec<HookFile> = entries
        .flatten()
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| {
            let filename = entry.file_name().to_str()?.to_string();
            if is_excluded(&filename) {
                return None;
            }
            let path = entry.path();
            let language = ScriptLanguage::from_extension(path.extension()?.to_str()?)?;
            Some(HookFile {
                path,
                owning_plugin: plugin.name.clone(),
                filename,
                language,
            })
        })
        .collect();

    files.sort();
    debug!(plugin = %plugin.name, count = files.len(), "discovered hook scripts");
    files
}

/// `install*` files at the plugin root or under `scripts/`, sorted.
pub fn installer_scripts(plugin: &PluginDirectory) -> Vec<PathBuf> {
    let mut scripts = Vec::new();
    for dir in [plugin.path.clone(), plugin.path.join("scripts")] {
        scripts.extend(installers_in(&dir));
    }
    scripts.sort();
    scripts
}

fn installers_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.to_ascii_lowercase().starts_with("install"))
        })
        .collect()
}
