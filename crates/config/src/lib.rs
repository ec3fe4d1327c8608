//! Configuration loading for regcheck.
//!
//! Config file: `regcheck.toml` in the repository root, or any path passed
//! explicitly. Every field has a default, so the file is optional.

pub mod loader;
pub mod schema;

pub use {
    loader::{CONFIG_FILENAME, Error, discover_and_load, load_config},
    schema::{EvaluatorConfig, PolicyConfig, VerifyConfig},
};
