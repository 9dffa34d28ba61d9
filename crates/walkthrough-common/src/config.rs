//! JSON configuration loading.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// Read and deserialize a JSON document from `path`.
///
/// A missing file is reported as [`Error::NotFound`] so callers can decide
/// whether to fall back to defaults.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::not_found(path.display()));
        }
        Err(err) => return Err(err.into()),
    };
    parse_json(&raw).map_err(|e| Error::config(format!("{}: {e}", path.display())))
}

/// Deserialize a JSON document held in memory.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(Error::serialization)
}

/// Like [`load_json`], but a missing file yields `T::default()`.
pub fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match load_json(path) {
        Err(Error::NotFound(_)) => {
            tracing::debug!("config {} not found, using defaults", path.display());
            Ok(T::default())
        }
        other => other,
    }
}
