//! Gentx validation and staging.
//!
//! Each candidate gentx is decoded, its operator address converted to the
//! owning account address, and its self-bond checked against the chain
//! denomination and the bond ceiling. Only then is the node touched: the
//! account is funded in genesis and the file is copied, byte for byte, into
//! the node's gentx directory. The first failure aborts the whole batch.

use crate::address::AddressCodec;
use crate::amount::{Amount, Coin};
use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, InvariantViolation, Result};
use crate::gentx::GentxFile;
use crate::node::{account_from_debug_addr, AccountRegistration, Node, NodeRunner};
use crate::progress::AcceptedValidator;
use std::fs;
use std::path::{Path, PathBuf};

/// Rules every gentx must satisfy.
#[derive(Debug, Clone)]
pub struct ValidationRules {
    /// Required self-bond denomination.
    pub denom: String,
    /// Largest allowed self-bond.
    pub max_bond: Amount,
    /// Address codec for the chain.
    pub codec: AddressCodec,
}

impl ValidationRules {
    /// Rules derived from the bootstrap configuration.
    pub fn from_config(config: &BootstrapConfig) -> Self {
        Self {
            denom: config.denom.clone(),
            max_bond: config.max_bond.clone(),
            codec: config.address_codec(),
        }
    }
}

/// A gentx that satisfied every rule.
#[derive(Debug, Clone)]
pub struct CheckedGentx {
    /// The file as read.
    pub file: GentxFile,
    /// Validator-operator address.
    pub validator_address: String,
    /// Account address derived from the operator address.
    pub account_address: String,
    /// Declared self-bond.
    pub stake: Coin,
}

/// Check one gentx against `rules` without side effects.
pub fn check_gentx(file: GentxFile, rules: &ValidationRules) -> Result<CheckedGentx> {
    let validator_address = file.message.validator_address.clone();
    let declared = &file.message.value;

    let account_address = rules.codec.account_for_validator(&validator_address)?;

    let amount = declared
        .amount
        .parse::<Amount>()
        .map_err(|e| BootstrapError::Amount {
            amount: declared.amount.clone(),
            reason: e.to_string(),
        })?;

    if declared.denom != rules.denom {
        return Err(InvariantViolation::Denomination {
            validator: validator_address,
            expected: rules.denom.clone(),
            found: declared.denom.clone(),
        }
        .into());
    }

    if amount > rules.max_bond {
        return Err(InvariantViolation::BondExceedsCeiling {
            validator: validator_address,
            amount: declared.amount.clone(),
            max_bond: rules.max_bond.to_string(),
        }
        .into());
    }

    let stake = Coin::new(amount, declared.denom.clone());
    Ok(CheckedGentx {
        file,
        validator_address,
        account_address,
        stake,
    })
}

/// Load and check every file in `paths`, in order, stopping at the first
/// failure.
pub fn check_all(paths: &[PathBuf], rules: &ValidationRules) -> Result<Vec<CheckedGentx>> {
    paths
        .iter()
        .map(|path| GentxFile::load(path).and_then(|file| check_gentx(file, rules)))
        .collect()
}

/// Copy a gentx into `staging_dir` under its original file name, replacing
/// any earlier copy.
pub fn stage(file: &GentxFile, staging_dir: &Path) -> Result<PathBuf> {
    let target = staging_dir.join(file.file_name());
    fs::write(&target, &file.contents).map_err(|e| BootstrapError::fs(&target, e))?;
    Ok(target)
}

/// Validates gentx files and prepares the node for `collect-gentxs`.
pub struct GentxValidator<'a, R> {
    node: &'a Node<R>,
    rules: ValidationRules,
    genesis_allocation: Coin,
    keyring_backend: String,
    staging_dir: PathBuf,
}

impl<'a, R: NodeRunner> GentxValidator<'a, R> {
    /// Create a validator for `node` using the bootstrap configuration.
    pub fn new(node: &'a Node<R>, config: &BootstrapConfig) -> Self {
        Self {
            node,
            rules: ValidationRules::from_config(config),
            genesis_allocation: config.genesis_allocation.clone(),
            keyring_backend: config.keyring_backend.clone(),
            staging_dir: config.staging_dir(),
        }
    }

    /// Process `paths` in order. Stops at the first failure; files before it
    /// stay staged and their accounts stay registered.
    pub async fn process_all(&self, paths: &[PathBuf]) -> Result<Vec<AcceptedValidator>> {
        fs::create_dir_all(&self.staging_dir)
            .map_err(|e| BootstrapError::fs(&self.staging_dir, e))?;

        let mut accepted = Vec::with_capacity(paths.len());
        for path in paths {
            accepted.push(self.process(path).await?);
        }

        tracing::info!(count = accepted.len(), "Validation finished");
        Ok(accepted)
    }

    /// Check, register and stage a single gentx.
    pub async fn process(&self, path: &Path) -> Result<AcceptedValidator> {
        let file = GentxFile::load(path)?;
        let checked = check_gentx(file, &self.rules)?;

        self.cross_check_address(&checked).await?;

        tracing::info!(
            validator = %checked.validator_address,
            account = %checked.account_address,
            stake = %checked.stake,
            allocation = %self.genesis_allocation,
            "Adding genesis account"
        );
        let registration = self
            .node
            .add_genesis_account(
                &checked.account_address,
                &self.genesis_allocation,
                &self.keyring_backend,
            )
            .await?;
        if registration == AccountRegistration::AlreadyExists {
            tracing::info!(
                account = %checked.account_address,
                "Genesis account has already been added"
            );
        }

        let staged_path = stage(&checked.file, &self.staging_dir)?;
        tracing::debug!(from = %path.display(), to = %staged_path.display(), "Staged gentx");

        Ok(AcceptedValidator {
            source: checked.file.path,
            validator_address: checked.validator_address,
            account_address: checked.account_address,
            stake: checked.stake,
            registration,
            staged_path,
        })
    }

    /// Ask the node to render the operator address and compare its account
    /// form with ours.
    async fn cross_check_address(&self, checked: &CheckedGentx) -> Result<()> {
        let output = self.node.debug_addr(&checked.validator_address).await?;
        match account_from_debug_addr(&output) {
            Some(derived) if derived == checked.account_address => Ok(()),
            Some(derived) => Err(BootstrapError::Address {
                address: checked.validator_address.clone(),
                reason: format!(
                    "node derives account {derived}, expected {}",
                    checked.account_address
                ),
            }),
            None => {
                tracing::warn!(
                    validator = %checked.validator_address,
                    "debug addr printed no account address, skipping cross-check"
                );
                Ok(())
            }
        }
    }
}
