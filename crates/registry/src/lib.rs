//! Registry side of the verifier: manifest loading, schema and path
//! validation, plugin directory scanning, and registration reconciliation.
//!
//! The registry is a JSON document (by default
//! `.claude-plugin/marketplace.json`) whose `plugins` array lists every
//! installable plugin. Its entries are reconciled against the directories
//! actually present under the plugins root.

pub mod error;
pub mod manifest;
pub mod paths;
pub mod reconcile;
pub mod scan;
pub mod schema;

pub use {
    error::{Error, Result},
    manifest::{PluginAuthor, PluginEntry, PluginSource, Registry, load_manifest},
    paths::{hooks_path, source_dir, validate_paths},
    reconcile::{Reconciliation, reconcile, remediation_entry},
    scan::{PluginDirectory, scan_plugin_dirs},
    schema::{Schema, SchemaAsset, validate_schema},
};
