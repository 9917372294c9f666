//! Genesis document handling.

use crate::error::{BootstrapError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Key of the genesis start time.
pub const GENESIS_TIME_KEY: &str = "genesis_time";

/// A genesis document. Field order is preserved across a load/save cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct GenesisDocument {
    fields: Map<String, Value>,
}

impl GenesisDocument {
    /// Decode a genesis document. The root must be a JSON object.
    pub fn from_slice(path: impl AsRef<Path>, bytes: &[u8]) -> Result<Self> {
        let path = path.as_ref();
        match serde_json::from_slice(bytes) {
            Ok(Value::Object(fields)) => Ok(Self { fields }),
            Ok(_) => Err(BootstrapError::parse(path, "genesis root is not an object")),
            Err(e) => Err(BootstrapError::parse(path, e.to_string())),
        }
    }

    /// Read a genesis document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| BootstrapError::fs(path, e))?;
        Self::from_slice(path, &bytes)
    }

    /// Write the document as two-space indented JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_pretty_json()).map_err(|e| BootstrapError::fs(path, e))
    }

    /// Current `genesis_time`, if present and a string.
    pub fn genesis_time(&self) -> Option<&str> {
        self.fields.get(GENESIS_TIME_KEY).and_then(Value::as_str)
    }

    /// Overwrite `genesis_time`. No other field is touched.
    pub fn set_genesis_time(&mut self, time: DateTime<Utc>) {
        self.fields.insert(
            GENESIS_TIME_KEY.to_string(),
            Value::String(format_genesis_time(time)),
        );
    }

    /// Read-only access to a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Serialize with two-space indentation.
    pub fn to_pretty_json(&self) -> String {
        // A map of JSON values always serializes.
        serde_json::to_string_pretty(&self.fields).unwrap_or_default()
    }
}

/// RFC 3339 with second precision and a `Z` suffix, e.g. `2024-01-01T18:00:00Z`.
pub fn format_genesis_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Rewrite the `genesis_time` of the file at `path` in place.
pub fn rewrite_genesis_time(path: impl AsRef<Path>, time: DateTime<Utc>) -> Result<()> {
    let path = path.as_ref();
    let mut genesis = GenesisDocument::load(path)?;
    let previous = genesis.genesis_time().map(str::to_owned);
    genesis.set_genesis_time(time);
    genesis.save(path)?;

    tracing::info!(
        path = %path.display(),
        previous = previous.as_deref().unwrap_or("<unset>"),
        genesis_time = %format_genesis_time(time),
        "Rewrote genesis time"
    );
    Ok(())
}

/// Replace the node's genesis with the template at `template`, then rewrite
/// its start time. Returns the installed path.
pub fn install_genesis(
    template: impl AsRef<Path>,
    target: impl AsRef<Path>,
    time: DateTime<Utc>,
) -> Result<PathBuf> {
    let template = template.as_ref();
    let target = target.as_ref();

    if !template.is_file() {
        return Err(BootstrapError::fs(
            template,
            std::io::Error::new(std::io::ErrorKind::NotFound, "genesis template not found"),
        ));
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| BootstrapError::fs(parent, e))?;
    }
    match fs::remove_file(target) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(BootstrapError::fs(target, e)),
    }
    fs::copy(template, target).map_err(|e| BootstrapError::fs(target, e))?;

    rewrite_genesis_time(target, time)?;
    Ok(target.to_path_buf())
}
