//! Registry (marketplace manifest) loading.
//!
//! The manifest is kept twice: as the raw JSON document, which the schema
//! validator walks, and as typed [`PluginEntry`] values for everything else.
//! Entries that cannot be typed at all (not an object, no string `name`)
//! only exist in the raw document; the schema pass reports them.

use std::path::{Path, PathBuf};

use {
    regcheck_common::Location,
    serde::{Deserialize, Serialize},
    serde_json::Value,
    tracing::{debug, info},
};

use crate::error::{Error, Result};

/// Where a plugin's sources live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginSource {
    /// Path relative to the repository root, e.g. `./plugins/formatter`.
    Path(String),
    /// Externally hosted plugin (`{"source": "github", "repo": "..."}`).
    Remote(Value),
}

impl PluginSource {
    pub fn as_path(&self) -> Option<&str> {
        match self {
            Self::Path(p) => Some(p),
            Self::Remote(_) => None,
        }
    }
}

/// Author field can be a string or an object with `name` (and optionally `email`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginAuthor {
    Simple(String),
    Object {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    },
}

impl PluginAuthor {
    pub fn name(&self) -> &str {
        match self {
            Self::Simple(s) => s,
            Self::Object { name, .. } => name,
        }
    }
}

/// One element of the registry's `plugins` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginEntry {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub source: Option<PluginSource>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub hooks: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub author: Option<PluginAuthor>,
    /// Explicit install-time requirements. Advisory only: the host does
    /// not enforce them, so they are validated but never acted on.
    #[serde(default)]
    pub requires: Option<Vec<String>>,
}

impl PluginEntry {
    pub fn requires(&self) -> &[String] {
        self.requires.as_deref().unwrap_or_default()
    }

    /// Best-effort typing of a raw registry element.
    ///
    /// Falls back to a name-only entry when individual fields have the
    /// wrong type, so reconciliation still sees the plugin.
    fn from_raw(raw: &Value) -> Option<Self> {
        match serde_json::from_value::<Self>(raw.clone()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                let name = raw.get("name")?.as_str()?;
                debug!(plugin = name, error = %e, "registry entry has mistyped fields");
                Some(Self {
                    name: name.to_string(),
                    ..Self::default()
                })
            },
        }
    }
}

/// Read-only snapshot of the registry for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct Registry {
    path: PathBuf,
    root: PathBuf,
    text: String,
    raw: Value,
    plugins: Vec<PluginEntry>,
}

impl Registry {
    /// Build a registry from already-read manifest text.
    pub fn parse(path: &Path, root: &Path, text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text).map_err(|source| Error::ParseRegistry {
            path: path.to_path_buf(),
            source,
        })?;

        let plugins = raw
            .get("plugins")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(PluginEntry::from_raw).collect())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
            text: text.to_string(),
            raw,
            plugins,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory relative `source` and `hooks` paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn plugins(&self) -> &[PluginEntry] {
        &self.plugins
    }

    pub fn get(&self, name: &str) -> Option<&PluginEntry> {
        self.plugins.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|p| p.name.as_str())
    }

    /// 1-based line of the first `"name": "<name>"` pair in the manifest.
    pub fn entry_line(&self, name: &str) -> Option<usize> {
        let pattern = format!(r#""name"\s*:\s*"{}""#, regex::escape(name));
        let re = regex::Regex::new(&pattern).ok()?;
        self.text
            .lines()
            .position(|line| re.is_match(line))
            .map(|idx| idx + 1)
    }

    /// Location of the manifest itself, optionally pointing at an entry.
    pub fn location(&self, entry: Option<&str>) -> Location {
        let line = entry.and_then(|name| self.entry_line(name));
        Location::relative(&self.root, &self.path, line)
    }
}

/// Load the registry at `path`. Relative plugin paths resolve against `root`.
///
/// Any failure here is fatal for the run: nothing downstream is
/// trustworthy without the manifest.
pub fn load_manifest(path: &Path, root: &Path) -> Result<Registry> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::ReadRegistry {
        path: path.to_path_buf(),
        source,
    })?;
    let registry = Registry::parse(path, root, &text)?;
    info!(
        path = %path.display(),
        plugins = registry.plugins.len(),
        "loaded registry"
    );
    Ok(registry)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
  "name": "example-marketplace",
  "plugins": [
    {
      "name": "formatter",
      "description": "Formats code",
      "version": "1.2.0",
      "source": "./plugins/formatter",
      "category": "development",
      "author": { "name": "Jane", "email": "jane@example.com" },
      "requires": ["linter"]
    },
    {
      "name": "remote-tool",
      "source": { "source": "github", "repo": "acme/remote-tool" },
      "author": "acme"
    },
    {
      "name": "mistyped",
      "version": 3
    },
    42
  ]
}
"#;

    fn registry() -> Registry {
        Registry::parse(
            Path::new("/repo/.claude-plugin/marketplace.json"),
            Path::new("/repo"),
            MANIFEST,
        )
        .unwrap()
    }

    #[test]
    fn typed_entries_keep_order_and_skip_untypable_items() {
        let reg = registry();
        let names: Vec<_> = reg.names().collect();
        assert_eq!(names, ["formatter", "remote-tool", "mistyped"]);
        assert_eq!(reg.raw()["plugins"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn sources_and_authors_accept_both_shapes() {
        let reg = registry();
        let formatter = reg.get("formatter").unwrap();
        assert_eq!(
            formatter.source.as_ref().and_then(PluginSource::as_path),
            Some("./plugins/formatter")
        );
        assert_eq!(formatter.author.as_ref().unwrap().name(), "Jane");
        assert_eq!(formatter.requires(), ["linter"]);

        let remote = reg.get("remote-tool").unwrap();
        assert!(matches!(remote.source, Some(PluginSource::Remote(_))));
        assert_eq!(remote.author.as_ref().unwrap().name(), "acme");
        assert!(remote.requires().is_empty());
        assert!(remote.requires.is_none());
    }

    #[test]
    fn mistyped_entry_falls_back_to_name_only() {
        let reg = registry();
        let entry = reg.get("mistyped").unwrap();
        assert!(entry.version.is_none());
    }

    #[test]
    fn entry_line_points_at_name_field() {
        let reg = registry();
        assert_eq!(reg.entry_line("formatter"), Some(5));
        assert_eq!(reg.entry_line("nope"), None);
        assert_eq!(
            reg.location(Some("remote-tool")).to_string(),
            ".claude-plugin/marketplace.json:14"
        );
    }

    #[test]
    fn load_manifest_fails_on_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_manifest(&tmp.path().join("missing.json"), tmp.path()).unwrap_err();
        assert!(matches!(err, Error::ReadRegistry { .. }));
    }

    #[test]
    fn load_manifest_fails_on_invalid_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("marketplace.json");
        std::fs::write(&path, "{ \"plugins\": [ }").unwrap();
        let err = load_manifest(&path, tmp.path()).unwrap_err();
        assert!(matches!(err, Error::ParseRegistry { .. }));
    }

    #[test]
    fn missing_plugins_array_yields_empty_registry() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("marketplace.json");
        std::fs::write(&path, "{}").unwrap();
        let reg = load_manifest(&path, tmp.path()).unwrap();
        assert!(reg.plugins().is_empty());
    }
}
