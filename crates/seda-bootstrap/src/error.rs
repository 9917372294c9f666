//! Error types for bootstrap operations.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bootstrap-specific errors.
///
/// Every variant is fatal: the run stops at the first one and leaves the node
/// home as it was at that point.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Failed to fetch the node binary.
    #[error("Download failed: {0}")]
    Download(String),

    /// A path could not be read, written or created.
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A document was not valid JSON or did not have the expected shape.
    #[error("Failed to parse {}: {reason}", path.display())]
    Parse {
        /// Document path.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// A bech32 address could not be decoded or re-encoded.
    #[error("Invalid address {address:?}: {reason}")]
    Address {
        /// Address as it appeared in the input.
        address: String,
        /// Codec failure.
        reason: String,
    },

    /// A stake amount was not a non-negative base-10 integer.
    #[error("Invalid amount {amount:?}: {reason}")]
    Amount {
        /// Amount as it appeared in the input.
        amount: String,
        /// Parse failure.
        reason: String,
    },

    /// A gentx broke one of the genesis invariants.
    #[error("Invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    /// The node binary failed to start or exited unsuccessfully.
    #[error("{step} failed{}: {detail}", exit_suffix(.code))]
    ExternalProcess {
        /// Human-readable step name.
        step: String,
        /// Exit code, if the process ran and exited normally.
        code: Option<i32>,
        /// Trimmed stderr, or the spawn error.
        detail: String,
    },
}

/// Genesis invariants checked for every gentx.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// The self-bond is not in the chain denomination.
    #[error("invalid denomination for {validator}: expected {expected}, found {found}")]
    Denomination {
        /// Validator operator address.
        validator: String,
        /// Configured chain denomination.
        expected: String,
        /// Denomination declared by the gentx.
        found: String,
    },

    /// The self-bond is larger than the configured ceiling.
    #[error("bonded stake of {validator} exceeds limit: {amount} > {max_bond}")]
    BondExceedsCeiling {
        /// Validator operator address.
        validator: String,
        /// Declared amount, verbatim.
        amount: String,
        /// Configured ceiling.
        max_bond: String,
    },
}

impl BootstrapError {
    /// Build a filesystem error for `path`.
    pub fn fs(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Build a parse error for the document at `path`.
    pub fn parse(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" (exit code {c})")).unwrap_or_default()
}

/// Result type for bootstrap operations.
pub type Result<T> = std::result::Result<T, BootstrapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_process_message() {
        let err = BootstrapError::ExternalProcess {
            step: "collect-gentxs".to_string(),
            code: Some(1),
            detail: "no gentx files".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "collect-gentxs failed (exit code 1): no gentx files"
        );

        let err = BootstrapError::ExternalProcess {
            step: "start".to_string(),
            code: None,
            detail: "No such file or directory".to_string(),
        };
        assert_eq!(err.to_string(), "start failed: No such file or directory");
    }

    #[test]
    fn test_invariant_converts() {
        let err: BootstrapError = InvariantViolation::Denomination {
            validator: "sedavaloper1xyz".to_string(),
            expected: "aseda".to_string(),
            found: "uatom".to_string(),
        }
        .into();
        assert!(matches!(err, BootstrapError::Invariant(_)));
        assert!(err.to_string().contains("expected aseda, found uatom"));
    }
}
