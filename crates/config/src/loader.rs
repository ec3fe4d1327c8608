use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::schema::VerifyConfig;

/// Standard config file name, looked up in the repository root.
pub const CONFIG_FILENAME: &str = "regcheck.toml";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Load config from the given TOML file.
pub fn load_config(path: &Path) -> Result<VerifyConfig, Error> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Discover and load `regcheck.toml` from `root`.
///
/// Returns `VerifyConfig::default()` if no config file is found or it
/// cannot be parsed.
pub fn discover_and_load(root: &Path) -> VerifyConfig {
    let path = root.join(CONFIG_FILENAME);
    if !path.is_file() {
        debug!(root = %root.display(), "no config file found, using defaults");
        return VerifyConfig::default();
    }

    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            VerifyConfig::default()
        },
    }
}
