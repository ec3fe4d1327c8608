//! The finding model: every check in the workspace reports problems as
//! [`Finding`] values instead of failing.
//!
//! Findings carry their location by value so a report can never be
//! invalidated by later mutation of the registry or the filesystem model.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::Serialize;

/// Severity level for a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// Report section a finding belongs to, in print order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Registration,
    Schema,
    Orphaned,
    Capabilities,
    Dependencies,
    Cycles,
    HookOutput,
    HookStructure,
}

impl Section {
    pub const ALL: &'static [Section] = &[
        Self::Registration,
        Self::Schema,
        Self::Orphaned,
        Self::Capabilities,
        Self::Dependencies,
        Self::Cycles,
        Self::HookOutput,
        Self::HookStructure,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Registration => "Registration",
            Self::Schema => "Schema & paths",
            Self::Orphaned => "Orphaned entries",
            Self::Capabilities => "Capability references",
            Self::Dependencies => "Declared dependencies",
            Self::Cycles => "Cycles",
            Self::HookOutput => "Hook output format",
            Self::HookStructure => "Hook structure",
        }
    }
}

/// File (and optionally line) a finding points at.
///
/// Paths are stored relative to the repository root whenever possible so
/// output does not depend on where the checkout lives.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    pub path: PathBuf,
    pub line: Option<usize>,
}

impl Location {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            line: None,
        }
    }

    pub fn line(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line: Some(line),
        }
    }

    /// Strip `root` from `path` when it is a prefix, keeping `path` otherwise.
    pub fn relative(root: &Path, path: &Path, line: Option<usize>) -> Self {
        let path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        Self { path, line }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Always forward slashes so output is identical across platforms.
        let path = self.path.to_string_lossy().replace('\\', "/");
        match self.line {
            Some(line) => write!(f, "{path}:{line}"),
            None => write!(f, "{path}"),
        }
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub section: Section,
    pub message: String,
    pub location: Option<Location>,
}

impl Finding {
    pub fn error(section: Section, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            section,
            message: message.into(),
            location: None,
        }
    }

    pub fn warning(section: Section, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            section,
            message: message.into(),
            location: None,
        }
    }

    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{loc}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// The two order-preserving finding lists every check appends into.
#[derive(Debug, Clone, Default)]
pub struct Findings {
    errors: Vec<Finding>,
    warnings: Vec<Finding>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, finding: Finding) {
        match finding.severity {
            Severity::Error => self.errors.push(finding),
            Severity::Warning => self.warnings.push(finding),
        }
    }

    pub fn errors(&self) -> &[Finding] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Finding] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Errors first, then warnings, both restricted to `section`.
    pub fn in_section(&self, section: Section) -> impl Iterator<Item = &Finding> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .filter(move |f| f.section == section)
    }

    /// Exit policy: any error fails; warnings fail only in strict mode.
    pub fn is_failure(&self, strict: bool) -> bool {
        self.has_errors() || (strict && !self.warnings.is_empty())
    }
}

impl Extend<Finding> for Findings {
    fn extend<I: IntoIterator<Item = Finding>>(&mut self, iter: I) {
        for finding in iter {
            self.push(finding);
        }
    }
}

impl FromIterator<Finding> for Findings {
    fn from_iter<I: IntoIterator<Item = Finding>>(iter: I) -> Self {
        let mut findings = Self::new();
        findings.extend(iter);
        findings
    }
}
