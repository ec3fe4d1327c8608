//! Hook checks: script inventory, event classification, output-contract
//! lint, and structural validation of hook registration JSON, including
//! JSON that installer scripts build with `jq`.

pub mod classify;
pub mod definition;
pub mod error;
pub mod evaluate;
pub mod event;
pub mod inventory;
pub mod lint;
pub mod registration;
pub mod snippets;
pub mod structure;

pub use {
    classify::{ClassificationTier, Classifier, HookClassification},
    definition::{DecodeError, HookDefinition},
    error::{Error, Result},
    evaluate::{EvalError, JqEvaluator, SnippetEvaluator, evaluate_all, evaluate_snippet},
    event::HookEvent,
    inventory::{HookFile, ScriptLanguage, discover_hook_files, installer_scripts},
    lint::{OutputLinter, unclassified_entry_point},
    registration::{REGISTRATION_FILE, Registration, load_registration},
    snippets::{EmbeddedSnippet, extract_embedded_json_snippets, substitute_placeholders},
    structure::{snippet_findings, validate_hook_document},
};

/// 1-based line containing byte `offset` of `text`.
pub(crate) fn line_at(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}
