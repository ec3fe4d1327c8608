//! Reference extraction from plugin documentation.
//!
//! A cross-plugin reference is a backtick-wrapped slash invocation,
//! `` `/plugin:capability` ``, optionally followed by arguments before the
//! closing backtick. Matching is case-insensitive and names are lowercased.
//! Every occurrence is kept with its own file and 1-based line.

use std::path::{Path, PathBuf};

use {
    regcheck_common::{Finding, Location, Section},
    regcheck_registry::PluginDirectory,
    regex::Regex,
    tracing::{debug, warn},
    walkdir::WalkDir,
};

use crate::error::Result;

const REFERENCE_PATTERN: &str =
    r"(?i)`/([a-z0-9][a-z0-9_-]*):([a-z0-9][a-z0-9_.-]*)(?:\s[^`]*)?`";

/// One textual occurrence of a cross-plugin reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReferenceEdge {
    pub from_plugin: String,
    pub to_plugin: String,
    pub capability: String,
    pub file: PathBuf,
    pub line: usize,
}

impl ReferenceEdge {
    pub fn token(&self) -> String {
        format!("/{}:{}", self.to_plugin, self.capability)
    }

    pub fn location(&self, root: &Path) -> Location {
        Location::relative(root, &self.file, Some(self.line))
    }
}

/// Edges from every plugin plus warnings for files that could not be read.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub edges: Vec<ReferenceEdge>,
    pub findings: Vec<Finding>,
}

pub struct ReferenceExtractor {
    pattern: Regex,
}

impl ReferenceExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(REFERENCE_PATTERN)?,
        })
    }

    /// All references in `text`, self-references included. Plugin and
    /// capability names are lowercased on both ends of the edge.
    pub fn scan_text(&self, from_plugin: &str, file: &Path, text: &str) -> Vec<ReferenceEdge> {
        let mut edges = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            for caps in self.pattern.captures_iter(line) {
                edges.push(ReferenceEdge {
                    from_plugin: from_plugin.to_lowercase(),
                    to_plugin: caps[1].to_lowercase(),
                    capability: caps[2].to_lowercase(),
                    file: file.to_path_buf(),
                    line: idx + 1,
                });
            }
        }
        edges
    }

    /// Scan every plugin's documentation tree.
    ///
    /// Self-references are dropped: a plugin is never its own dependency.
    pub fn extract(&self, dirs: &[PluginDirectory], root: &Path) -> Extraction {
        let mut extraction = Extraction::default();

        for dir in dirs {
            let (files, walk_errors) = documentation_files(&dir.path);
            for (path, error) in walk_errors {
                extraction.findings.push(
                    Finding::warning(
                        Section::Capabilities,
                        format!("could not scan documentation: {error}"),
                    )
                    .at(Location::relative(root, &path, None)),
                );
            }

            for file in files {
                let text = match std::fs::read_to_string(&file) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(?file, %e, "failed to read documentation file");
                        extraction.findings.push(
                            Finding::warning(
                                Section::Capabilities,
                                format!("could not read documentation file: {e}"),
                            )
                            .at(Location::relative(root, &file, None)),
                        );
                        continue;
                    },
                };
                extraction.edges.extend(
                    self.scan_text(&dir.name, &file, &text)
                        .into_iter()
                        .filter(|edge| edge.to_plugin != edge.from_plugin),
                );
            }
        }

        debug!(edges = extraction.edges.len(), "extracted cross-plugin references");
        extraction
    }
}

/// Markdown files under `plugin_dir`, recursively, in lexicographic order.
///
/// Hidden directories are skipped. Walk errors are returned alongside the
/// files instead of aborting the walk.
pub fn documentation_files(plugin_dir: &Path) -> (Vec<PathBuf>, Vec<(PathBuf, String)>) {
    let mut files = Vec::new();
    let mut errors = Vec::new();

    let walker = WalkDir::new(plugin_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(plugin_dir).to_path_buf();
                errors.push((path, e.to_string()));
                continue;
            },
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let is_markdown = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
        if is_markdown {
            files.push(entry.into_path());
        }
    }

    (files, errors)
}
