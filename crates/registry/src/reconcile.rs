//! Registration reconciliation: registered names versus plugin directories.
//!
//! - Directory without entry (unregistered): always an error. The host
//!   cannot see the plugin, so it is silently broken for end users.
//! - Entry without directory (orphaned): always a warning. Registries may
//!   legitimately list externally hosted plugins.

use std::{collections::BTreeSet, path::Path};

use {
    regcheck_common::{Finding, Location, Section},
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::debug,
};

use crate::{
    manifest::{PluginAuthor, Registry},
    scan::PluginDirectory,
};

/// Category used in remediation snippets when the plugin does not say.
const DEFAULT_CATEGORY: &str = "development";

/// Both set differences between the registry and the filesystem.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub unregistered: Vec<PluginDirectory>,
    pub orphaned: Vec<String>,
}

impl Reconciliation {
    pub fn findings(&self, registry: &Registry) -> Vec<Finding> {
        let registry_path = registry.location(None);
        let mut findings = Vec::new();

        for dir in &self.unregistered {
            findings.push(
                Finding::error(
                    Section::Registration,
                    format!(
                        "plugin directory `{}` is not registered in {registry_path}",
                        dir.name
                    ),
                )
                .at(Location::relative(registry.root(), &dir.path, None)),
            );
        }

        for name in &self.orphaned {
            findings.push(
                Finding::warning(
                    Section::Orphaned,
                    format!("registry entry `{name}` has no plugin directory"),
                )
                .at(registry.location(Some(name))),
            );
        }

        findings
    }
}

/// Diff registered names against discovered directories.
pub fn reconcile(registry: &Registry, dirs: &[PluginDirectory]) -> Reconciliation {
    let registered: BTreeSet<&str> = registry.names().collect();
    let present: BTreeSet<&str> = dirs.iter().map(|d| d.name.as_str()).collect();

    let unregistered: Vec<_> = dirs
        .iter()
        .filter(|d| !registered.contains(d.name.as_str()))
        .cloned()
        .collect();

    let mut orphaned = Vec::new();
    for name in registry.names() {
        if !present.contains(name) && !orphaned.iter().any(|o| o == name) {
            orphaned.push(name.to_string());
        }
    }

    debug!(
        unregistered = unregistered.len(),
        orphaned = orphaned.len(),
        "reconciled registry against plugin directories"
    );

    Reconciliation {
        unregistered,
        orphaned,
    }
}

/// Plugin-local manifest shipped in `.claude-plugin/plugin.json`.
#[derive(Debug, Default, Deserialize)]
struct LocalPluginJson {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    author: Option<PluginAuthor>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
}

fn read_local_manifest(dir: &Path) -> LocalPluginJson {
    let path = dir.join(".claude-plugin/plugin.json");
    let Ok(text) = std::fs::read_to_string(&path) else {
        return LocalPluginJson::default();
    };
    match serde_json::from_str(&text) {
        Ok(local) => local,
        Err(e) => {
            debug!(?path, %e, "ignoring unparsable plugin.json");
            LocalPluginJson::default()
        },
    }
}

/// A ready-to-paste registry entry for an unregistered directory.
///
/// Metadata comes from the plugin's own `.claude-plugin/plugin.json` when
/// present; anything missing gets a neutral placeholder.
pub fn remediation_entry(root: &Path, dir: &PluginDirectory) -> Value {
    let local = read_local_manifest(&dir.path);
    let relative = dir
        .path
        .strip_prefix(root)
        .unwrap_or(&dir.path)
        .to_string_lossy()
        .replace('\\', "/");

    let mut entry = json!({
        "name": dir.name,
        "description": local
            .description
            .unwrap_or_else(|| format!("TODO: describe {}", dir.name)),
        "version": local.version.unwrap_or_else(|| "0.1.0".into()),
        "source": format!("./{relative}"),
        "category": local.category.unwrap_or_else(|| DEFAULT_CATEGORY.into()),
    });

    if let Some(author) = local.author {
        entry["author"] = json!(author);
    }
    if let Some(keywords) = local.keywords {
        entry["keywords"] = json!(keywords);
    }
    if dir.path.join("hooks/hooks.json").is_file() {
        entry["hooks"] = json!("./hooks/hooks.json");
    }

    entry
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn registry(root: &Path, names: &[&str]) -> Registry {
        let plugins: Vec<_> = names
            .iter()
            .map(|n| json!({ "name": n, "source": format!("./plugins/{n}") }))
            .collect();
        Registry::parse(
            &root.join(".claude-plugin/marketplace.json"),
            root,
            &serde_json::to_string_pretty(&json!({ "plugins": plugins })).unwrap(),
        )
        .unwrap()
    }

    fn dirs(root: &Path, names: &[&str]) -> Vec<PluginDirectory> {
        names
            .iter()
            .map(|n| PluginDirectory {
                name: n.to_string(),
                path: root.join("plugins").join(n),
            })
            .collect()
    }

    #[test]
    fn unregistered_directory_is_an_error() {
        let root = Path::new("/repo");
        let reg = registry(root, &["a", "b"]);
        let rec = reconcile(&reg, &dirs(root, &["a", "b", "c"]));

        let findings = rec.findings(&reg);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].is_error());
        assert_eq!(findings[0].section, Section::Registration);
        assert_eq!(
            findings[0].to_string(),
            "plugins/c: plugin directory `c` is not registered in .claude-plugin/marketplace.json"
        );
    }

    #[test]
    fn orphaned_entry_is_only_a_warning() {
        let root = Path::new("/repo");
        let reg = registry(root, &["a", "external"]);
        let rec = reconcile(&reg, &dirs(root, &["a"]));

        assert!(rec.unregistered.is_empty());
        assert_eq!(rec.orphaned, ["external"]);
        let findings = rec.findings(&reg);
        assert_eq!(findings.len(), 1);
        assert!(!findings[0].is_error());
        assert_eq!(findings[0].section, Section::Orphaned);
    }

    #[test]
    fn remediation_uses_local_plugin_json() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("plugins/c");
        std::fs::create_dir_all(dir.join(".claude-plugin")).unwrap();
        std::fs::write(
            dir.join(".claude-plugin/plugin.json"),
            r#"{"name":"c","description":"Does c","version":"2.0.0","author":{"name":"Ann"}}"#,
        )
        .unwrap();

        let entry = remediation_entry(tmp.path(), &PluginDirectory {
            name: "c".into(),
            path: dir,
        });
        assert_eq!(entry["name"], "c");
        assert_eq!(entry["description"], "Does c");
        assert_eq!(entry["version"], "2.0.0");
        assert_eq!(entry["source"], "./plugins/c");
        assert_eq!(entry["category"], DEFAULT_CATEGORY);
        assert_eq!(entry["author"]["name"], "Ann");
        assert!(entry.get("hooks").is_none());
    }

    #[test]
    fn remediation_without_local_manifest_uses_placeholders() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("plugins/d");
        std::fs::create_dir_all(dir.join("hooks")).unwrap();
        std::fs::write(dir.join("hooks/hooks.json"), "{}").unwrap();

        let entry = remediation_entry(tmp.path(), &PluginDirectory {
            name: "d".into(),
            path: dir,
        });
        assert_eq!(entry["version"], "0.1.0");
        assert_eq!(entry["description"], "TODO: describe d");
        assert_eq!(entry["hooks"], "./hooks/hooks.json");
    }
}
