//! Tiered hook event classification.
//!
//! Tiers are tried in order and the first answer wins: the plugin's own
//! registration document, then the script filename, then marker tokens in
//! the script body. Scripts usable as more than one event are resolved by
//! whichever tier answers first; the tier is kept so reports can say how
//! confident the answer is.

use std::fmt;

use {regex::Regex, serde::Serialize};

use crate::{
    error::Result,
    event::HookEvent,
    inventory::{HookFile, ScriptLanguage},
    registration::Registration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationTier {
    Registration,
    Filename,
    Content,
    None,
}

impl fmt::Display for ClassificationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registration => write!(f, "registration"),
            Self::Filename => write!(f, "filename"),
            Self::Content => write!(f, "content"),
            Self::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HookClassification {
    pub hook_file: HookFile,
    /// `None` when no tier could decide.
    pub event: Option<HookEvent>,
    pub tier: ClassificationTier,
}

pub struct Classifier {
    python_guard: Regex,
    shell_guard: Regex,
    js_guard: Regex,
}

impl Classifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            python_guard: Regex::new(r#"(?m)^if\s+__name__\s*==\s*["']__main__["']\s*:"#)?,
            shell_guard: Regex::new(
                r#"BASH_SOURCE\[0\]\}?"?\s*={1,2}\s*"?\$\{?0|\$\{?0\}?"?\s*={1,2}\s*"?\$\{BASH_SOURCE"#,
            )?,
            js_guard: Regex::new(r"require\.main\s*===?\s*module|import\.meta\.main")?,
        })
    }

    pub fn classify(
        &self,
        file: &HookFile,
        text: &str,
        registration: Option<&Registration>,
    ) -> HookClassification {
        let registered = registration.and_then(|r| r.event_for(&file.filename));
        let (event, tier) = if let Some(event) = registered {
            (Some(event), ClassificationTier::Registration)
        } else if let Some(event) = by_filename(&file.filename) {
            (Some(event), ClassificationTier::Filename)
        } else if let Some(event) = by_content(text) {
            (Some(event), ClassificationTier::Content)
        } else {
            (None, ClassificationTier::None)
        };

        HookClassification {
            hook_file: file.clone(),
            event,
            tier,
        }
    }

    /// The script runs something when executed directly, as opposed to a
    /// helper module that is only imported or sourced.
    pub fn has_entry_point(&self, file: &HookFile, text: &str) -> bool {
        match file.language {
            ScriptLanguage::Python => self.python_guard.is_match(text),
            ScriptLanguage::Shell => self.shell_guard.is_match(text),
            ScriptLanguage::JavaScript | ScriptLanguage::TypeScript => self.js_guard.is_match(text),
        }
    }
}

fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '_' | '-' | '.' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

fn by_filename(filename: &str) -> Option<HookEvent> {
    let name = squash(filename);
    if name.contains("subagentstop") {
        Some(HookEvent::SubagentStop)
    } else if name.contains("pretool") {
        Some(HookEvent::PreToolUse)
    } else if name.contains("posttool") {
        Some(HookEvent::PostToolUse)
    } else if name.contains("stop") {
        Some(HookEvent::Stop)
    } else {
        None
    }
}

fn by_content(text: &str) -> Option<HookEvent> {
    if text.contains("stop_hook_active") {
        if squash(text).contains("subagentstop") {
            Some(HookEvent::SubagentStop)
        } else {
            Some(HookEvent::Stop)
        }
    } else if text.contains("permissionDecision") {
        Some(HookEvent::PreToolUse)
    } else if text.contains("tool_response") {
        Some(HookEvent::PostToolUse)
    } else {
        None
    }
}
