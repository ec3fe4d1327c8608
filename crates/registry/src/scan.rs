use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// A plugin directory found on disk. Rebuilt every run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PluginDirectory {
    pub name: String,
    pub path: PathBuf,
}

/// Enumerate the immediate child directories of the plugins root.
///
/// Hidden directories are skipped. The result is sorted by name so that
/// repeated runs on an unchanged tree report in the same order.
pub fn scan_plugin_dirs(plugins_root: &Path) -> std::io::Result<Vec<PluginDirectory>> {
    let mut dirs = Vec::new();

    for entry in std::fs::read_dir(plugins_root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!(?path, "skipping plugin directory with non UTF-8 name");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        dirs.push(PluginDirectory { name, path });
    }

    dirs.sort();
    debug!(root = %plugins_root.display(), count = dirs.len(), "scanned plugin directories");
    Ok(dirs)
}
