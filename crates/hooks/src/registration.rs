//! The hook registration document: the file a registry entry declares in
//! `hooks`, or the plugin's own `hooks/hooks.json`.
//!
//! Event names map either directly at the top level or under a `hooks`
//! key, to matcher entries (`{"matcher": .., "hooks": [{"command": ..}]}`)
//! or to literal command strings.

use std::path::{Path, PathBuf};

use {serde_json::Value, tracing::debug};

use crate::{
    error::{Error, Result},
    event::HookEvent,
};

/// Registration file read when the registry entry declares none.
pub const REGISTRATION_FILE: &str = "hooks/hooks.json";

#[derive(Debug, Clone)]
pub struct Registration {
    pub path: PathBuf,
    pub document: Value,
    /// Every command string with the event name it is registered under.
    pub commands: Vec<(String, String)>,
}

impl Registration {
    pub fn from_value(path: &Path, document: Value) -> Self {
        let mut commands = Vec::new();
        if let Some(events) = event_map(&document) {
            for (event, value) in events {
                let mut found = Vec::new();
                collect_commands(value, &mut found);
                commands.extend(found.into_iter().map(|c| (event.clone(), c)));
            }
        }
        Self {
            path: path.to_path_buf(),
            document,
            commands,
        }
    }

    /// Event whose command string mentions `filename`, if it is a known one.
    pub fn event_for(&self, filename: &str) -> Option<HookEvent> {
        self.commands
            .iter()
            .find(|(_, command)| mentions(command, filename))
            .and_then(|(event, _)| HookEvent::from_name(event))
    }
}

/// The event-name object: `document.hooks` when that is an object, else
/// the document itself.
pub fn event_map(document: &Value) -> Option<&serde_json::Map<String, Value>> {
    match document.get("hooks") {
        Some(Value::Object(events)) => Some(events),
        _ => document.as_object(),
    }
}

fn collect_commands(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(command) => out.push(command.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_commands(item, out)),
        Value::Object(fields) => {
            if let Some(Value::String(command)) = fields.get("command") {
                out.push(command.clone());
            }
            if let Some(nested) = fields.get("hooks") {
                collect_commands(nested, out);
            }
        },
        _ => {},
    }
}

/// `filename` appears in `command` as a whole path component.
fn mentions(command: &str, filename: &str) -> bool {
    command.match_indices(filename).any(|(idx, _)| {
        let before = command[..idx].chars().next_back();
        let after = command[idx + filename.len()..].chars().next();
        let boundary = |c: Option<char>| {
            c.is_none_or(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        };
        boundary(before) && boundary(after)
    })
}

/// Load the registration document at `path`. `Ok(None)` when it does not
/// exist.
pub fn load_registration(path: &Path) -> Result<Option<Registration>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(Error::Read {
                path: path.to_path_buf(),
                source,
            });
        },
    };
    let document: Value = serde_json::from_str(&text).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let registration = Registration::from_value(path, document);
    debug!(?path, commands = registration.commands.len(), "loaded hook registration");
    Ok(Some(registration))
}
