//! Genesis transaction documents.
//!
//! Only the first message of a gentx is inspected. It is expected to be a
//! `MsgCreateValidator` carrying the operator address and self-bond; every
//! other field of the document is ignored here and passed through verbatim
//! when the file is staged.

use crate::error::{BootstrapError, Result};
use serde::Deserialize;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level gentx document.
#[derive(Debug, Clone, Deserialize)]
pub struct GenesisTransaction {
    /// Transaction body.
    pub body: TxBody,
}

/// Transaction body. Messages are decoded lazily so that only the first one
/// needs to match [`CreateValidatorMsg`].
#[derive(Debug, Clone, Deserialize)]
pub struct TxBody {
    /// Raw messages.
    pub messages: Vec<serde_json::Value>,
}

/// The fields of `MsgCreateValidator` needed for validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateValidatorMsg {
    /// Protobuf type URL, when present.
    #[serde(rename = "@type", default)]
    pub type_url: Option<String>,
    /// Bech32 validator-operator address.
    pub validator_address: String,
    /// Self-bond.
    pub value: DeclaredStake,
}

/// Self-bond as written in the gentx: both fields are strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeclaredStake {
    /// Denomination symbol.
    pub denom: String,
    /// Base-10 amount.
    pub amount: String,
}

impl GenesisTransaction {
    /// Decode the first message as a validator creation.
    pub fn create_validator(&self) -> std::result::Result<CreateValidatorMsg, String> {
        let first = self
            .body
            .messages
            .first()
            .ok_or_else(|| "body.messages is empty".to_string())?;
        CreateValidatorMsg::deserialize(first).map_err(|e| format!("body.messages[0]: {e}"))
    }
}

/// A gentx file read from disk.
#[derive(Debug, Clone)]
pub struct GentxFile {
    /// Source path.
    pub path: PathBuf,
    /// Exact file contents, staged without re-serialization.
    pub contents: Vec<u8>,
    /// Decoded validator creation message.
    pub message: CreateValidatorMsg,
}

impl GentxFile {
    /// Read and decode a gentx file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|e| BootstrapError::fs(path, e))?;
        Self::from_bytes(path, contents)
    }

    /// Decode gentx bytes that came from `path`.
    pub fn from_bytes(path: impl AsRef<Path>, contents: Vec<u8>) -> Result<Self> {
        let path = path.as_ref();
        let tx: GenesisTransaction = serde_json::from_slice(&contents)
            .map_err(|e| BootstrapError::parse(path, e.to_string()))?;
        let message = tx
            .create_validator()
            .map_err(|reason| BootstrapError::parse(path, reason))?;

        Ok(Self {
            path: path.to_path_buf(),
            contents,
            message,
        })
    }

    /// Base name used when staging.
    pub fn file_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or(self.path.as_os_str())
    }
}

/// List `*.json` files in `dir`, sorted by file name.
pub fn discover(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|e| BootstrapError::fs(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BootstrapError::fs(dir, e))?;
        let path = entry.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        if is_json && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}
