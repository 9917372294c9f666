//! Bech32 address conversion between validator-operator and account form.

use crate::error::{BootstrapError, Result};
use bech32::{FromBase32, ToBase32, Variant};

/// Suffix appended to the account prefix to form the validator-operator prefix.
pub const VALIDATOR_OPERATOR_SUFFIX: &str = "valoper";

/// Converts between the chain's account and validator-operator addresses.
///
/// Both forms encode the same underlying bytes; only the human-readable part
/// differs (`seda1...` vs `sedavaloper1...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCodec {
    account_prefix: String,
    validator_prefix: String,
}

impl AddressCodec {
    /// Create a codec for the given account prefix.
    pub fn new(account_prefix: impl Into<String>) -> Self {
        let account_prefix = account_prefix.into();
        let validator_prefix = format!("{account_prefix}{VALIDATOR_OPERATOR_SUFFIX}");
        Self {
            account_prefix,
            validator_prefix,
        }
    }

    /// Account prefix, e.g. `seda`.
    pub fn account_prefix(&self) -> &str {
        &self.account_prefix
    }

    /// Validator-operator prefix, e.g. `sedavaloper`.
    pub fn validator_prefix(&self) -> &str {
        &self.validator_prefix
    }

    /// Decode a validator-operator address to its raw bytes.
    pub fn decode_validator(&self, address: &str) -> Result<Vec<u8>> {
        decode_with_prefix(address, &self.validator_prefix)
    }

    /// Encode raw address bytes as an account address.
    pub fn encode_account(&self, bytes: &[u8]) -> Result<String> {
        bech32::encode(&self.account_prefix, bytes.to_base32(), Variant::Bech32).map_err(|e| {
            BootstrapError::Address {
                address: format!("<{} bytes>", bytes.len()),
                reason: e.to_string(),
            }
        })
    }

    /// Derive the account address that owns a validator-operator address.
    pub fn account_for_validator(&self, validator_address: &str) -> Result<String> {
        let bytes = self.decode_validator(validator_address)?;
        self.encode_account(&bytes)
    }
}

fn decode_with_prefix(address: &str, expected_prefix: &str) -> Result<Vec<u8>> {
    let invalid = |reason: String| BootstrapError::Address {
        address: address.to_string(),
        reason,
    };

    if address.trim().is_empty() {
        return Err(invalid("empty address string is not allowed".to_string()));
    }

    let (hrp, data, variant) = bech32::decode(address).map_err(|e| invalid(e.to_string()))?;

    if hrp != expected_prefix {
        return Err(invalid(format!(
            "invalid Bech32 prefix; expected {expected_prefix}, got {hrp}"
        )));
    }
    if variant != Variant::Bech32 {
        return Err(invalid("expected bech32 encoding, found bech32m".to_string()));
    }

    let bytes = Vec::<u8>::from_base32(&data).map_err(|e| invalid(e.to_string()))?;
    if bytes.is_empty() {
        return Err(invalid("decoded address is empty".to_string()));
    }

    Ok(bytes)
}
