//! Existence checks for the paths each registry entry declares.

use std::path::{Path, PathBuf};

use regcheck_common::{Finding, Section};

use crate::manifest::{PluginEntry, Registry};

/// Confirm every entry's `source` and `hooks` paths exist on disk.
///
/// A missing local `source` is always an error. `hooks` is only checked
/// when present; it resolves against the plugin's source directory, the
/// way the host resolves it after installation.
pub fn validate_paths(registry: &Registry) -> Vec<Finding> {
    let mut findings = Vec::new();

    for entry in registry.plugins() {
        let source_dir = source_dir(registry.root(), entry);

        if let Some(dir) = &source_dir
            && !dir.exists()
        {
            findings.push(
                Finding::error(
                    Section::Schema,
                    format!(
                        "plugin `{}`: source path {} does not exist",
                        entry.name,
                        display_relative(registry.root(), dir)
                    ),
                )
                .at(registry.location(Some(&entry.name))),
            );
        }

        if let Some(hooks_path) = hooks_path(registry.root(), entry)
            && !hooks_path.exists()
        {
            findings.push(
                Finding::error(
                    Section::Schema,
                    format!(
                        "plugin `{}`: hooks path {} does not exist",
                        entry.name,
                        display_relative(registry.root(), &hooks_path)
                    ),
                )
                .at(registry.location(Some(&entry.name))),
            );
        }
    }

    findings
}

/// Local source directory of an entry, `None` for remote or absent sources.
pub fn source_dir(root: &Path, entry: &PluginEntry) -> Option<PathBuf> {
    let path = entry.source.as_ref()?.as_path()?;
    Some(normalize(&root.join(path)))
}

/// Declared hook registration file of an entry, resolved against its local
/// source directory (or the root for remote sources). `None` when the entry
/// declares no `hooks`.
pub fn hooks_path(root: &Path, entry: &PluginEntry) -> Option<PathBuf> {
    let hooks = entry.hooks.as_ref()?;
    let base = source_dir(root, entry).unwrap_or_else(|| root.to_path_buf());
    Some(normalize(&base.join(hooks)))
}

/// Drop `.` components so `root/./plugins/a` prints as `root/plugins/a`.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}

fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
