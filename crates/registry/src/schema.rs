//! Registry validation against the schema asset.
//!
//! The schema asset is a draft 2020-12 JSON Schema document, compiled once
//! per run. When the asset cannot be loaded the validator degrades to
//! presence checks of [`REQUIRED_FIELDS`] and says so.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use {
    jsonschema::{Draft, Validator},
    regcheck_common::{Finding, Section},
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::{
    error::{Context, Error, Result},
    manifest::Registry,
};

/// Fields checked for presence when the schema asset is unavailable.
pub const REQUIRED_FIELDS: &[&str] = &["name", "description", "version", "source", "category"];

/// Fields whose absence is worth a warning but never an error.
pub const RECOMMENDED_FIELDS: &[&str] = &["author", "keywords"];

/// A compiled schema asset.
pub struct Schema {
    validator: Validator,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").finish_non_exhaustive()
    }
}

impl Schema {
    pub fn from_value(root: &Value) -> Result<Self> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(root)
            .map_err(|e| Error::InvalidSchema(e.to_string()))?;
        Ok(Self { validator })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read schema {}", path.display()))?;
        let root: Value = serde_json::from_str(&text)
            .with_context(|| format!("schema {} is not valid JSON", path.display()))?;
        Self::from_value(&root)
    }

    /// Every violation in `value` as `(path, message)`, where `path` reads
    /// like `plugins[3].version` and is empty for the document root.
    pub fn violations(&self, value: &Value) -> Vec<(String, String)> {
        self.validator
            .iter_errors(value)
            .map(|e| (display_pointer(&e.instance_path.to_string()), e.to_string()))
            .collect()
    }
}

/// `/plugins/3/version` becomes `plugins[3].version`.
fn display_pointer(pointer: &str) -> String {
    let mut out = String::new();
    for token in pointer.split('/').skip(1) {
        let token = token.replace("~1", "/").replace("~0", "~");
        if token.parse::<usize>().is_ok() {
            out.push_str(&format!("[{token}]"));
        } else {
            if !out.is_empty() {
                out.push('.');
            }
            out.push_str(&token);
        }
    }
    out
}

/// Outcome of trying to load the schema asset.
#[derive(Debug)]
pub enum SchemaAsset {
    Loaded(Schema),
    Unavailable { path: PathBuf, reason: String },
}

impl SchemaAsset {
    pub fn load(path: &Path) -> Self {
        match Schema::load(path) {
            Ok(schema) => {
                debug!(path = %path.display(), "loaded registry schema");
                Self::Loaded(schema)
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "registry schema unavailable");
                Self::Unavailable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            },
        }
    }
}

/// Validate the registry's shape, required fields, categories and versions.
pub fn validate_schema(registry: &Registry, asset: &SchemaAsset) -> Vec<Finding> {
    let mut findings = match asset {
        SchemaAsset::Loaded(schema) => schema_findings(registry, schema),
        SchemaAsset::Unavailable { path, reason } => {
            let mut findings = vec![Finding::warning(
                Section::Schema,
                format!(
                    "degraded mode: schema asset {} unavailable ({reason}); only required-field presence was checked",
                    path.strip_prefix(registry.root()).unwrap_or(path).display()
                ),
            )];
            findings.extend(presence_findings(registry));
            findings
        },
    };

    findings.extend(duplicate_name_findings(registry));
    findings.extend(recommended_field_findings(registry));
    findings
}

fn schema_findings(registry: &Registry, schema: &Schema) -> Vec<Finding> {
    schema
        .violations(registry.raw())
        .into_iter()
        .map(|(pointer, message)| {
            let entry = entry_name_at(registry, &pointer);
            let subject = match (&entry, pointer.is_empty()) {
                (_, true) => "registry".to_string(),
                (Some(name), false) => format!("{pointer} ({name})"),
                (None, false) => pointer.clone(),
            };
            Finding::error(Section::Schema, format!("{subject}: {message}"))
                .at(registry.location(entry.as_deref()))
        })
        .collect()
}

/// Name of the registry entry a pointer like `plugins[3].version` lies in.
fn entry_name_at(registry: &Registry, pointer: &str) -> Option<String> {
    let rest = pointer.strip_prefix("plugins[")?;
    let idx: usize = rest.split(']').next()?.parse().ok()?;
    registry.raw()["plugins"][idx]
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn presence_findings(registry: &Registry) -> Vec<Finding> {
    let Some(items) = registry.raw().get("plugins").and_then(Value::as_array) else {
        return vec![
            Finding::error(Section::Schema, "registry: missing `plugins` array")
                .at(registry.location(None)),
        ];
    };

    let mut findings = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        let name = item.get("name").and_then(Value::as_str);
        let subject = match name {
            Some(name) => format!("plugins[{idx}] ({name})"),
            None => format!("plugins[{idx}]"),
        };
        for field in REQUIRED_FIELDS {
            if item.get(field).is_none_or(Value::is_null) {
                findings.push(
                    Finding::error(
                        Section::Schema,
                        format!("{subject}: missing required field `{field}`"),
                    )
                    .at(registry.location(name)),
                );
            }
        }
    }
    findings
}

fn duplicate_name_findings(registry: &Registry) -> Vec<Finding> {
    let mut seen = HashMap::new();
    let mut findings = Vec::new();
    for entry in registry.plugins() {
        let count = seen.entry(entry.name.as_str()).or_insert(0usize);
        *count += 1;
        if *count == 2 {
            findings.push(
                Finding::error(
                    Section::Schema,
                    format!("plugin name `{}` is registered more than once", entry.name),
                )
                .at(registry.location(Some(&entry.name))),
            );
        }
    }
    findings
}

fn recommended_field_findings(registry: &Registry) -> Vec<Finding> {
    let Some(items) = registry.raw().get("plugins").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let name = item.get("name").and_then(Value::as_str)?;
            let missing: Vec<_> = RECOMMENDED_FIELDS
                .iter()
                .filter(|field| item.get(**field).is_none())
                .map(|field| format!("`{field}`"))
                .collect();
            (!missing.is_empty()).then(|| {
                Finding::warning(
                    Section::Schema,
                    format!(
                        "plugin `{name}` is missing recommended metadata: {}",
                        missing.join(", ")
                    ),
                )
                .at(registry.location(Some(name)))
            })
        })
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json};

    fn schema() -> Schema {
        Schema::from_value(&json!({
            "type": "object",
            "required": ["plugins"],
            "properties": {
                "plugins": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name", "description", "version", "source", "category"],
                        "additionalProperties": false,
                        "properties": {
                            "name": { "type": "string", "pattern": "^[a-z0-9][a-z0-9-]*$" },
                            "description": { "type": "string", "minLength": 1 },
                            "version": { "type": "string", "pattern": "^\\d+\\.\\d+\\.\\d+$" },
                            "source": { "anyOf": [ { "type": "string" }, { "type": "object" } ] },
                            "category": { "enum": ["development", "productivity"] },
                            "author": { "type": ["string", "object"] },
                            "keywords": { "type": "array", "items": { "type": "string" } },
                            "requires": { "type": "array", "items": { "type": "string" } }
                        }
                    }
                }
            }
        }))
        .unwrap()
    }

    fn registry(doc: Value) -> Registry {
        Registry::parse(
            Path::new("/repo/.claude-plugin/marketplace.json"),
            Path::new("/repo"),
            &serde_json::to_string_pretty(&doc).unwrap(),
        )
        .unwrap()
    }

    fn valid_entry(name: &str) -> Value {
        json!({
            "name": name,
            "description": "does things",
            "version": "1.0.0",
            "source": format!("./plugins/{name}"),
            "category": "development",
            "author": "someone",
            "keywords": ["k"]
        })
    }

    fn messages(findings: &[Finding]) -> Vec<String> {
        findings.iter().map(|f| f.message.clone()).collect()
    }

    #[test]
    fn valid_registry_has_no_findings() {
        let reg = registry(json!({ "plugins": [valid_entry("a"), valid_entry("b")] }));
        let findings = validate_schema(&reg, &SchemaAsset::Loaded(schema()));
        assert!(findings.is_empty(), "{:?}", messages(&findings));
    }

    #[rstest]
    #[case("version", json!("1.0"), "does not match")]
    #[case("category", json!("games"), "is not one of")]
    #[case("keywords", json!("not-a-list"), "is not of type")]
    #[case("description", json!(""), "shorter than")]
    #[case("source", json!(7), "anyOf")]
    fn invalid_field_is_an_error(
        #[case] field: &str,
        #[case] value: Value,
        #[case] expected: &str,
    ) {
        let mut entry = valid_entry("a");
        entry[field] = value;
        let reg = registry(json!({ "plugins": [entry] }));
        let findings = validate_schema(&reg, &SchemaAsset::Loaded(schema()));
        assert_eq!(findings.len(), 1, "{:?}", messages(&findings));
        assert!(findings[0].is_error());
        assert!(findings[0].message.contains(expected), "{}", findings[0].message);
        assert!(findings[0].message.starts_with(&format!("plugins[0].{field} (a)")));
    }

    #[test]
    fn missing_required_and_unknown_fields_are_errors() {
        let mut entry = valid_entry("a");
        entry.as_object_mut().unwrap().remove("category");
        entry["homepage"] = json!("https://example.com");
        let reg = registry(json!({ "plugins": [entry] }));
        let findings = validate_schema(&reg, &SchemaAsset::Loaded(schema()));
        let msgs = messages(&findings);
        assert_eq!(msgs.len(), 2, "{msgs:?}");
        assert!(msgs.iter().any(|m| m.starts_with("plugins[0] (a): ") && m.contains("\"category\"")));
        assert!(msgs.iter().any(|m| m.contains("homepage")));
        assert!(findings.iter().all(Finding::is_error));
    }

    #[test]
    fn duplicate_names_are_errors() {
        let reg = registry(json!({ "plugins": [valid_entry("a"), valid_entry("a")] }));
        let findings = validate_schema(&reg, &SchemaAsset::Loaded(schema()));
        assert_eq!(messages(&findings), ["plugin name `a` is registered more than once"]);
    }

    #[test]
    fn missing_recommended_metadata_is_a_warning() {
        let mut entry = valid_entry("a");
        entry.as_object_mut().unwrap().remove("keywords");
        let reg = registry(json!({ "plugins": [entry] }));
        let findings = validate_schema(&reg, &SchemaAsset::Loaded(schema()));
        assert_eq!(findings.len(), 1);
        assert!(!findings[0].is_error());
        assert!(findings[0].message.contains("`keywords`"));
    }

    #[test]
    fn unavailable_schema_degrades_to_presence_checks() {
        let mut entry = valid_entry("a");
        entry.as_object_mut().unwrap().remove("version");
        // Not a semver, but presence-only mode cannot tell.
        entry["category"] = json!("anything");
        let reg = registry(json!({ "plugins": [entry] }));
        let asset = SchemaAsset::load(Path::new("/repo/schemas/does-not-exist.json"));
        assert!(matches!(asset, SchemaAsset::Unavailable { .. }));

        let findings = validate_schema(&reg, &asset);
        assert_eq!(findings.len(), 2, "{:?}", messages(&findings));
        assert!(!findings[0].is_error());
        assert!(findings[0].message.starts_with("degraded mode"));
        assert!(findings[0].message.contains("schemas/does-not-exist.json"));
        assert!(findings[1].is_error());
        assert!(findings[1].message.contains("missing required field `version`"));
    }

    #[test]
    fn schema_findings_point_at_the_entry_line() {
        let mut entry = valid_entry("b");
        entry["version"] = json!("nope");
        let reg = registry(json!({ "plugins": [valid_entry("a"), entry] }));
        let findings = validate_schema(&reg, &SchemaAsset::Loaded(schema()));
        let loc = findings[0].location.as_ref().unwrap();
        assert_eq!(loc.line, reg.entry_line("b"));
        assert!(loc.line.is_some());
    }

    #[test]
    fn invalid_pattern_in_schema_fails_to_load() {
        let err = Schema::from_value(&json!({ "type": "string", "pattern": "([" })).unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }

    #[rstest]
    #[case("", "")]
    #[case("/plugins", "plugins")]
    #[case("/plugins/3/version", "plugins[3].version")]
    #[case("/plugins/0/source/repo", "plugins[0].source.repo")]
    #[case("/metadata/a~1b", "metadata.a/b")]
    fn pointers_read_as_paths(#[case] pointer: &str, #[case] expected: &str) {
        assert_eq!(display_pointer(pointer), expected);
    }

    #[test]
    fn shipped_schema_asset_accepts_a_full_entry() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../schemas/marketplace.schema.json");
        let SchemaAsset::Loaded(schema) = SchemaAsset::load(&path) else {
            panic!("schema asset failed to load");
        };
        let mut remote = valid_entry("b");
        remote["source"] = json!({ "source": "github", "repo": "acme/b" });
        remote["author"] = json!({ "name": "Acme" });
        let reg = registry(json!({ "name": "m", "plugins": [valid_entry("a"), remote] }));
        assert!(schema.violations(reg.raw()).is_empty());

        let mut bad = valid_entry("c");
        bad["version"] = json!("v1");
        let reg = registry(json!({ "plugins": [bad] }));
        let violations = schema.violations(reg.raw());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].0, "plugins[0].version");
    }
}
