use {
    serde::Serialize,
    serde_json::{Map, Value},
};

/// Values the host accepts for a leaf definition's `type` discriminator.
pub const HOOK_TYPES: &[&str] = &["command", "prompt", "agent"];

/// A leaf hook definition, one variant per `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HookDefinition {
    Command {
        command: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    Prompt {
        prompt: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    Agent {
        prompt: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("hook definition must be a JSON object, found {0}")]
    NotAnObject(String),

    #[error(
        "double nesting: an element of a matcher entry's `hooks` array carries its own \
         `matcher`; that array must hold leaf definitions (`type` plus `command` or `prompt`) \
         directly, and matchers belong one level up"
    )]
    NestedMatcher,

    #[error("hook definition has no `type`; expected one of command, prompt, agent")]
    MissingType,

    #[error("invalid hook type `{0}`; expected one of command, prompt, agent")]
    InvalidType(String),

    #[error("`type: {kind}` hook is missing required field `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("`type: {kind}` hook field `{field}` must be a string")]
    FieldNotString {
        kind: &'static str,
        field: &'static str,
    },
}

impl HookDefinition {
    /// Decode a leaf into exactly one variant.
    ///
    /// `timeout` only survives decoding as a positive integer; range checks
    /// are reported separately since a bad timeout does not stop the host
    /// from registering the hook.
    pub fn decode(value: &Value) -> Result<Self, DecodeError> {
        let Value::Object(fields) = value else {
            return Err(DecodeError::NotAnObject(kind_of(value).into()));
        };
        if fields.contains_key("matcher") {
            return Err(DecodeError::NestedMatcher);
        }

        let kind = match fields.get("type") {
            None => return Err(DecodeError::MissingType),
            Some(Value::String(kind)) => kind.as_str(),
            Some(other) => return Err(DecodeError::InvalidType(other.to_string())),
        };
        let timeout = fields.get("timeout").and_then(Value::as_u64);

        match kind {
            "command" => Ok(Self::Command {
                command: required(fields, "command", "command")?,
                timeout,
            }),
            "prompt" => Ok(Self::Prompt {
                prompt: required(fields, "prompt", "prompt")?,
                timeout,
            }),
            "agent" => Ok(Self::Agent {
                prompt: required(fields, "agent", "prompt")?,
                timeout,
            }),
            other => Err(DecodeError::InvalidType(other.to_string())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Command { .. } => "command",
            Self::Prompt { .. } => "prompt",
            Self::Agent { .. } => "agent",
        }
    }
}

fn required(
    fields: &Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<String, DecodeError> {
    match fields.get(field) {
        None | Some(Value::Null) => Err(DecodeError::MissingField { kind, field }),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(DecodeError::FieldNotString { kind, field }),
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json};

    #[test]
    fn decodes_each_variant() {
        assert_eq!(
            HookDefinition::decode(&json!({ "type": "command", "command": "run.sh", "timeout": 30 })),
            Ok(HookDefinition::Command {
                command: "run.sh".into(),
                timeout: Some(30),
            })
        );
        assert_eq!(
            HookDefinition::decode(&json!({ "type": "prompt", "prompt": "check it" }))
                .unwrap()
                .kind(),
            "prompt"
        );
        assert_eq!(
            HookDefinition::decode(&json!({ "type": "agent", "prompt": "review" })).unwrap(),
            HookDefinition::Agent {
                prompt: "review".into(),
                timeout: None,
            }
        );
    }

    #[rstest]
    #[case(json!({ "type": "banana" }), DecodeError::InvalidType("banana".into()))]
    #[case(json!({ "type": 7 }), DecodeError::InvalidType("7".into()))]
    #[case(json!({ "command": "x" }), DecodeError::MissingType)]
    #[case(json!({ "type": "command" }), DecodeError::MissingField { kind: "command", field: "command" })]
    #[case(json!({ "type": "agent" }), DecodeError::MissingField { kind: "agent", field: "prompt" })]
    #[case(json!({ "type": "prompt", "prompt": 3 }), DecodeError::FieldNotString { kind: "prompt", field: "prompt" })]
    #[case(json!({ "matcher": "Bash", "hooks": [] }), DecodeError::NestedMatcher)]
    #[case(json!("run.sh"), DecodeError::NotAnObject("a string".into()))]
    fn decode_errors(#[case] value: Value, #[case] expected: DecodeError) {
        assert_eq!(HookDefinition::decode(&value), Err(expected));
    }

    #[test]
    fn invalid_type_message_names_the_value() {
        let err = HookDefinition::decode(&json!({ "type": "banana" })).unwrap_err();
        assert!(err.to_string().contains("banana"));
    }

    #[test]
    fn serializes_with_type_tag() {
        let def = HookDefinition::Command {
            command: "run.sh".into(),
            timeout: None,
        };
        assert_eq!(
            serde_json::to_value(&def).unwrap(),
            json!({ "type": "command", "command": "run.sh" })
        );
    }
}
