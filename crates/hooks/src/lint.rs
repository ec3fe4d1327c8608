//! Output-contract lint for classified hook scripts.
//!
//! Every rule here is a text heuristic and reports warnings only. The rules
//! follow what the host actually reads from a hook's JSON output for each
//! event:
//!
//! - Stop and SubagentStop: `{"decision": "block"}` keeps the session
//!   running, so it must be paired with a `stop_hook_active` check, and a
//!   script that only notifies or summarizes should not block at all.
//! - PreToolUse: the structured `permissionDecision` replaces the legacy
//!   `decision: approve|block` field.
//! - PostToolUse: only `decision` and `reason` are observed. Anything else
//!   the script prints is computed and then dropped.

use std::{collections::BTreeSet, path::Path};

use {
    regcheck_common::{Finding, Location, Section},
    regex::Regex,
};

use crate::{classify::HookClassification, error::Result, event::HookEvent, line_at};

/// Fields the host reads from PostToolUse output.
const POST_TOOL_OBSERVED: &[&str] = &["decision", "reason"];

/// Fields that are valid in any hook output and carry no PostToolUse payload.
const INERT_FIELDS: &[&str] = &[
    "continue",
    "suppressOutput",
    "stopReason",
    "systemMessage",
    "hookSpecificOutput",
    "hookEventName",
    "additionalContext",
];

pub struct OutputLinter {
    block: Regex,
    legacy_decision: Regex,
    informational: Regex,
    continuation: Regex,
    emitted_key: Regex,
}

impl OutputLinter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            block: Regex::new(r#"["']?\bdecision["']?\s*[:=]\s*["']block["']"#)?,
            legacy_decision: Regex::new(r#"["']?\bdecision["']?\s*[:=]\s*["'](approve|block)["']"#)?,
            informational: Regex::new(
                r"(?i)\b(notif(y|ies|ication|ications)|summar(y|ies|ize|ise)|announce|speak|text[- ]to[- ]speech)\b",
            )?,
            continuation: Regex::new(
                r"(?i)\b(continue|continuing|keep (going|working)|loop|iterat\w*|unfinished|incomplete|remaining|not (yet )?(done|finished|complete))\b",
            )?,
            emitted_key: Regex::new(r#"["']([A-Za-z_][A-Za-z0-9_]*)["']\s*:"#)?,
        })
    }

    pub fn lint(&self, hook: &HookClassification, text: &str, root: &Path) -> Vec<Finding> {
        let Some(event) = hook.event else {
            return Vec::new();
        };
        let at = |line: usize| Location::relative(root, &hook.hook_file.path, Some(line));

        match event {
            HookEvent::Stop | HookEvent::SubagentStop => self.lint_stop(event, text, at),
            HookEvent::PreToolUse => self.lint_pre_tool(text, at),
            HookEvent::PostToolUse => self.lint_post_tool(text, at),
            _ => Vec::new(),
        }
    }

    fn lint_stop(
        &self,
        event: HookEvent,
        text: &str,
        at: impl Fn(usize) -> Location,
    ) -> Vec<Finding> {
        let Some(block) = self.block.find(text) else {
            return Vec::new();
        };
        let location = at(line_at(text, block.start()));
        let mut findings = Vec::new();

        if !text.contains("stop_hook_active") {
            findings.push(
                Finding::warning(
                    Section::HookOutput,
                    format!(
                        "{event} hook blocks without checking `stop_hook_active`; it can \
                         re-trigger itself forever"
                    ),
                )
                .at(location.clone()),
            );
        }

        if self.informational.is_match(text) && !self.continuation.is_match(text) {
            findings.push(
                Finding::warning(
                    Section::HookOutput,
                    format!(
                        "{event} hook reads as informational but returns `decision: block`, \
                         which prevents the session from ending"
                    ),
                )
                .at(location),
            );
        }

        findings
    }

    fn lint_pre_tool(&self, text: &str, at: impl Fn(usize) -> Location) -> Vec<Finding> {
        if text.contains("permissionDecision") {
            return Vec::new();
        }
        let Some(found) = self.legacy_decision.find(text) else {
            return Vec::new();
        };
        vec![
            Finding::warning(
                Section::HookOutput,
                "PreToolUse hook uses the deprecated `decision` field; emit \
                 `hookSpecificOutput.permissionDecision` instead",
            )
            .at(at(line_at(text, found.start()))),
        ]
    }

    fn lint_post_tool(&self, text: &str, at: impl Fn(usize) -> Location) -> Vec<Finding> {
        let mut reported = BTreeSet::new();
        let mut findings = Vec::new();

        for caps in self.emitted_key.captures_iter(text) {
            let Some(key) = caps.get(1) else {
                continue;
            };
            let name = key.as_str();
            if POST_TOOL_OBSERVED.contains(&name)
                || INERT_FIELDS.contains(&name)
                || !reported.insert(name)
            {
                continue;
            }

            let line = line_at(text, key.start());
            let source = text.lines().nth(line - 1).unwrap_or_default().trim();
            findings.push(
                Finding::warning(
                    Section::HookOutput,
                    format!(
                        "PostToolUse output field `{name}` is ignored by the host (only \
                         `decision` and `reason` are read): {source}"
                    ),
                )
                .at(at(line)),
            );
        }

        findings
    }
}

/// Advisory for an executable script no tier could classify.
pub fn unclassified_entry_point(hook: &HookClassification, root: &Path) -> Finding {
    Finding::warning(
        Section::HookOutput,
        format!(
            "hook script `{}` has an entry point but no registration, filename or content \
             marker identifies its event; output checks were skipped",
            hook.hook_file.filename
        ),
    )
    .at(Location::relative(root, &hook.hook_file.path, None))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            classify::ClassificationTier,
            inventory::{HookFile, ScriptLanguage},
        },
        std::path::PathBuf,
    };

    fn classified(event: HookEvent) -> HookClassification {
        HookClassification {
            hook_file: HookFile {
                path: PathBuf::from("/repo/plugins/a/hooks/hook.py"),
                owning_plugin: "a".into(),
                filename: "hook.py".into(),
                language: ScriptLanguage::Python,
            },
            event: Some(event),
            tier: ClassificationTier::Filename,
        }
    }

    fn lint(event: HookEvent, text: &str) -> Vec<Finding> {
        OutputLinter::new()
            .unwrap()
            .lint(&classified(event), text, Path::new("/repo"))
    }

    #[test]
    fn stop_block_without_guard_warns() {
        let text = "import json\n\nprint(json.dumps({\"decision\": \"block\", \"reason\": \"keep going\"}))\n";
        let findings = lint(HookEvent::Stop, text);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("stop_hook_active"));
        assert_eq!(
            findings[0].location.as_ref().unwrap().to_string(),
            "plugins/a/hooks/hook.py:3"
        );
    }

    #[test]
    fn guarded_stop_block_is_clean() {
        let text = "if data.get('stop_hook_active'):\n    sys.exit(0)\nprint(json.dumps({'decision': 'block', 'reason': 'tests still failing, continue'}))\n";
        assert!(lint(HookEvent::SubagentStop, text).is_empty());
    }

    #[test]
    fn informational_stop_hook_that_blocks_warns() {
        let text = "# Send a desktop notification with a session summary\nif data['stop_hook_active']: exit()\nprint(json.dumps({'decision': 'block', 'reason': summary}))\n";
        let findings = lint(HookEvent::Stop, text);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("informational"));
    }

    #[test]
    fn legacy_pre_tool_decision_is_deprecated() {
        let findings = lint(HookEvent::PreToolUse, "out = {'decision': 'approve'}");
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("deprecated"));

        let modern = "out = {'decision': 'approve', 'hookSpecificOutput': {'permissionDecision': 'allow'}}";
        assert!(lint(HookEvent::PreToolUse, modern).is_empty());
    }

    #[test]
    fn post_tool_invisible_fields_warn_once_each_with_source_line() {
        let text = "\
result = {\"decision\": \"block\", \"reason\": \"lint failed\"}
result2 = {\"output\": text, \"systemMessage\": \"x\"}
print(json.dumps({\"output\": more, \"details\": d}))
";
        let findings = lint(HookEvent::PostToolUse, text);
        let messages: Vec<_> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("`output`"));
        assert!(messages[0].ends_with("result2 = {\"output\": text, \"systemMessage\": \"x\"}"));
        assert!(messages[1].contains("`details`"));
        assert_eq!(findings[1].location.as_ref().unwrap().line, Some(3));
        assert!(findings.iter().all(|f| !f.is_error()));
    }

    #[test]
    fn unknown_event_is_not_linted() {
        let mut hook = classified(HookEvent::Stop);
        hook.event = None;
        let linter = OutputLinter::new().unwrap();
        assert!(linter
            .lint(&hook, "{'decision': 'block'}", Path::new("/repo"))
            .is_empty());
        assert!(!unclassified_entry_point(&hook, Path::new("/repo")).is_error());
    }
}
