use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use {
    regcheck_common::{Finding, Section},
    regcheck_registry::PluginDirectory,
    tracing::debug,
};

use crate::extract::{ReferenceEdge, documentation_files};

/// Capability names each plugin directory exposes.
///
/// A capability is any documentation file stem or any `skills/<name>`
/// directory. Plugin and capability names are compared in lowercase.
#[derive(Debug, Clone, Default)]
pub struct CapabilityIndex {
    plugins: BTreeMap<String, BTreeSet<String>>,
}

impl CapabilityIndex {
    pub fn build(dirs: &[PluginDirectory]) -> Self {
        let mut plugins = BTreeMap::new();

        for dir in dirs {
            let mut names = BTreeSet::new();
            let (files, _) = documentation_files(&dir.path);
            for file in files {
                if let Some(stem) = file.file_stem().and_then(|s| s.to_str()) {
                    names.insert(stem.to_lowercase());
                }
            }
            if let Ok(entries) = std::fs::read_dir(dir.path.join("skills")) {
                for entry in entries.flatten() {
                    if entry.path().is_dir()
                        && let Some(name) = entry.file_name().to_str()
                    {
                        names.insert(name.to_lowercase());
                    }
                }
            }
            debug!(plugin = %dir.name, capabilities = names.len(), "indexed capabilities");
            plugins.insert(dir.name.to_lowercase(), names);
        }

        Self { plugins }
    }

    pub fn has_plugin(&self, plugin: &str) -> bool {
        self.plugins.contains_key(plugin)
    }

    pub fn has_capability(&self, plugin: &str, capability: &str) -> bool {
        self.plugins
            .get(plugin)
            .is_some_and(|names| names.contains(capability))
    }
}

/// Check every distinct `(plugin, capability)` pair referenced in `edges`.
///
/// A target plugin without a directory is an error. A present plugin that
/// exposes no matching capability is a warning, reported once per pair at
/// its first occurrence.
pub fn validate_capabilities(
    edges: &[ReferenceEdge],
    index: &CapabilityIndex,
    root: &Path,
) -> Vec<Finding> {
    let mut seen = BTreeSet::new();
    let mut findings = Vec::new();

    for edge in edges {
        if !seen.insert((edge.to_plugin.as_str(), edge.capability.as_str())) {
            continue;
        }

        let finding = if !index.has_plugin(&edge.to_plugin) {
            Finding::error(
                Section::Capabilities,
                format!(
                    "`{}` references plugin `{}`, which has no directory",
                    edge.token(),
                    edge.to_plugin
                ),
            )
        } else if !index.has_capability(&edge.to_plugin, &edge.capability) {
            Finding::warning(
                Section::Capabilities,
                format!(
                    "`{}`: plugin `{}` has no command or skill named `{}`",
                    edge.token(),
                    edge.to_plugin,
                    edge.capability
                ),
            )
        } else {
            continue;
        };
        findings.push(finding.at(edge.location(root)));
    }

    findings
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::extract::ReferenceExtractor, std::fs};

    fn plugin(root: &Path, name: &str) -> PluginDirectory {
        let path = root.join("plugins").join(name);
        fs::create_dir_all(&path).unwrap();
        PluginDirectory {
            name: name.into(),
            path,
        }
    }

    #[test]
    fn stems_and_skill_directories_count_as_capabilities() {
        let tmp = tempfile::tempdir().unwrap();
        let b = plugin(tmp.path(), "b");
        fs::create_dir_all(b.path.join("commands")).unwrap();
        fs::write(b.path.join("commands/Format.md"), "# format").unwrap();
        fs::create_dir_all(b.path.join("skills/lint-rules")).unwrap();

        let index = CapabilityIndex::build(&[b]);
        assert!(index.has_capability("b", "format"));
        assert!(index.has_capability("b", "lint-rules"));
        assert!(!index.has_capability("b", "deploy"));
        assert!(!index.has_plugin("c"));
    }

    #[test]
    fn missing_plugin_is_error_and_missing_capability_is_warning() {
        let tmp = tempfile::tempdir().unwrap();
        let a = plugin(tmp.path(), "a");
        let b = plugin(tmp.path(), "b");
        fs::write(
            a.path.join("README.md"),
            "Use `/b:deploy` and then `/ghost:run`.\n",
        )
        .unwrap();

        let dirs = vec![a, b];
        let extraction = ReferenceExtractor::new().unwrap().extract(&dirs, tmp.path());
        let findings =
            validate_capabilities(&extraction.edges, &CapabilityIndex::build(&dirs), tmp.path());

        assert_eq!(findings.len(), 2);
        assert!(!findings[0].is_error());
        assert!(findings[0].message.contains("`deploy`"));
        assert!(findings[1].is_error());
        assert!(findings[1].message.contains("`ghost`"));
        assert_eq!(
            findings[1].location.as_ref().unwrap().to_string(),
            "plugins/a/README.md:1"
        );
    }

    #[test]
    fn repeated_reference_warns_once() {
        let tmp = tempfile::tempdir().unwrap();
        let a = plugin(tmp.path(), "a");
        let b = plugin(tmp.path(), "b");
        fs::write(a.path.join("one.md"), "`/b:format`\n").unwrap();
        fs::write(a.path.join("two.md"), "\n`/b:format --check`\n").unwrap();

        let dirs = vec![a, b];
        let extraction = ReferenceExtractor::new().unwrap().extract(&dirs, tmp.path());
        assert_eq!(extraction.edges.len(), 2);

        let findings =
            validate_capabilities(&extraction.edges, &CapabilityIndex::build(&dirs), tmp.path());
        assert_eq!(findings.len(), 1);
        assert!(!findings[0].is_error());
        assert_eq!(
            findings[0].location.as_ref().unwrap().to_string(),
            "plugins/a/one.md:1"
        );
    }

    #[test]
    fn directory_names_match_case_insensitively() {
        let tmp = tempfile::tempdir().unwrap();
        let fmt = plugin(tmp.path(), "Fmt");
        let a = plugin(tmp.path(), "a");
        fs::write(fmt.path.join("check.md"), "Run `/Fmt:check` again.\n").unwrap();
        fs::write(a.path.join("README.md"), "Then `/fmt:check`.\n").unwrap();

        let dirs = vec![fmt, a];
        let extraction = ReferenceExtractor::new().unwrap().extract(&dirs, tmp.path());
        assert_eq!(extraction.edges.len(), 1);
        assert_eq!(extraction.edges[0].from_plugin, "a");

        let findings =
            validate_capabilities(&extraction.edges, &CapabilityIndex::build(&dirs), tmp.path());
        assert!(findings.is_empty(), "{findings:?}");
    }
}
