//! Structural validation of hook registration JSON.
//!
//! The host expects `event -> [matcher entry]`, where a matcher entry is
//! `{"matcher": .., "hooks": [leaf, ..]}` and every leaf decodes into a
//! [`HookDefinition`]. Any of those three levels may be checked on its own,
//! which is how evaluated snippets arrive.

use {
    regcheck_common::{Finding, Location, Section},
    serde_json::{Map, Value},
};

use crate::{
    definition::{HookDefinition, kind_of},
    evaluate::EvalError,
    event::HookEvent,
};

/// Accepted `timeout` range in seconds.
const TIMEOUT_RANGE: std::ops::RangeInclusive<f64> = 1.0..=600.0;

/// Check a whole document, an event map, a matcher entry or a single leaf.
pub fn validate_hook_document(value: &Value, at: &Location) -> Vec<Finding> {
    let mut findings = Vec::new();
    check_node(value, at, &mut findings);
    findings
}

/// Findings for one evaluated snippet. An evaluation failure is a degraded
/// notice, never a structural verdict.
pub fn snippet_findings(result: &Result<Value, EvalError>, at: &Location) -> Vec<Finding> {
    match result {
        Ok(value) => validate_hook_document(value, at),
        Err(e) => vec![
            Finding::warning(
                Section::HookStructure,
                format!("degraded: could not evaluate jq snippet ({e}); its structure was not checked"),
            )
            .at(at.clone()),
        ],
    }
}

fn error(at: &Location, message: impl Into<String>) -> Finding {
    Finding::error(Section::HookStructure, message).at(at.clone())
}

fn warning(at: &Location, message: impl Into<String>) -> Finding {
    Finding::warning(Section::HookStructure, message).at(at.clone())
}

fn check_node(value: &Value, at: &Location, out: &mut Vec<Finding>) {
    match value {
        Value::Array(entries) => {
            for entry in entries {
                check_matcher_entry(entry, at, out);
            }
        },
        Value::Object(fields) => match fields.get("hooks") {
            Some(Value::Object(events)) => check_event_map(events, at, out),
            Some(Value::Array(_)) => check_matcher_entry(value, at, out),
            _ if fields.contains_key("matcher") => check_matcher_entry(value, at, out),
            _ if fields.contains_key("type") => check_leaf(value, at, out),
            _ => check_event_map(fields, at, out),
        },
        other => out.push(error(
            at,
            format!("hook document must be an object or an array, found {}", kind_of(other)),
        )),
    }
}

fn check_event_map(events: &Map<String, Value>, at: &Location, out: &mut Vec<Finding>) {
    for (name, entries) in events {
        let known = HookEvent::from_name(name).is_some();
        match entries {
            Value::Array(items) => {
                if !known {
                    out.push(warning(at, format!("unknown hook event `{name}`")));
                }
                for item in items {
                    check_matcher_entry(item, at, out);
                }
            },
            // Literal command string registration.
            Value::String(_) => {},
            other if known => out.push(error(
                at,
                format!(
                    "event `{name}` must map to an array of matcher entries, found {}",
                    kind_of(other)
                ),
            )),
            _ => {},
        }
    }
}

fn check_matcher_entry(entry: &Value, at: &Location, out: &mut Vec<Finding>) {
    let fields = match entry {
        Value::String(_) => return,
        Value::Object(fields) => fields,
        other => {
            out.push(error(
                at,
                format!("matcher entry must be an object, found {}", kind_of(other)),
            ));
            return;
        },
    };

    if let Some(matcher) = fields.get("matcher")
        && !matcher.is_string()
    {
        out.push(warning(
            at,
            format!("`matcher` should be a string, found {}", kind_of(matcher)),
        ));
    }

    match fields.get("hooks") {
        Some(Value::Array(leaves)) => {
            for leaf in leaves {
                check_leaf(leaf, at, out);
            }
        },
        Some(other) => out.push(error(
            at,
            format!("matcher entry `hooks` must be an array, found {}", kind_of(other)),
        )),
        None if fields.contains_key("type") && !fields.contains_key("matcher") => out.push(error(
            at,
            "leaf hook definition placed directly in an event array; wrap it as \
             {\"matcher\": .., \"hooks\": [..]}",
        )),
        None => out.push(error(at, "matcher entry has no `hooks` array")),
    }
}

fn check_leaf(leaf: &Value, at: &Location, out: &mut Vec<Finding>) {
    match HookDefinition::decode(leaf) {
        Ok(_) => {},
        Err(e) => out.push(error(at, e.to_string())),
    }

    if let Value::Object(fields) = leaf
        && !fields.contains_key("matcher")
        && let Some(timeout) = fields.get("timeout")
    {
        check_timeout(timeout, at, out);
    }
}

fn check_timeout(timeout: &Value, at: &Location, out: &mut Vec<Finding>) {
    match timeout.as_f64() {
        Some(seconds) if TIMEOUT_RANGE.contains(&seconds) => {},
        Some(seconds) => out.push(warning(
            at,
            format!("timeout {seconds} is outside the sane range of 1 to 600 seconds"),
        )),
        None => out.push(warning(
            at,
            format!("timeout must be a number of seconds, found {}", kind_of(timeout)),
        )),
    }
}
