//! Phase tracking and the end-of-run report.

use crate::amount::Coin;
use crate::node::AccountRegistration;
use std::path::PathBuf;

/// Phases of a bootstrap run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootstrapPhase {
    /// Downloading the node binary.
    ProvisioningBinary,
    /// Wiping and initializing the node home.
    InitializingNode,
    /// Checking and staging gentx files.
    ValidatingGentxs,
    /// Collecting gentxs and validating genesis.
    AssemblingGenesis,
    /// Starting the node and polling its status.
    LaunchingNode,
    /// Run complete.
    Complete,
}

impl std::fmt::Display for BootstrapPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProvisioningBinary => write!(f, "Provisioning node binary"),
            Self::InitializingNode => write!(f, "Initializing node"),
            Self::ValidatingGentxs => write!(f, "Validating gentxs"),
            Self::AssemblingGenesis => write!(f, "Assembling genesis"),
            Self::LaunchingNode => write!(f, "Launching node"),
            Self::Complete => write!(f, "Complete"),
        }
    }
}

/// One gentx that passed validation and was staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedValidator {
    /// Gentx file it came from.
    pub source: PathBuf,
    /// Validator-operator address.
    pub validator_address: String,
    /// Derived account address.
    pub account_address: String,
    /// Declared self-bond.
    pub stake: Coin,
    /// Whether the genesis account was new.
    pub registration: AccountRegistration,
    /// Where the file was staged.
    pub staged_path: PathBuf,
}

/// Summary of a bootstrap run.
#[derive(Debug, Clone, Default)]
pub struct BootstrapReport {
    /// Bytes downloaded, if the binary was fetched.
    pub downloaded_bytes: Option<u64>,
    /// Validators accepted, in processing order.
    pub validators: Vec<AcceptedValidator>,
    /// PID of the started node.
    pub node_pid: Option<u32>,
    /// Status queries issued before the node answered.
    pub health_check_attempts: u32,
    /// Whether the node was stopped after the health check.
    pub node_stopped: bool,
}

impl BootstrapReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Genesis accounts added by this run.
    pub fn accounts_created(&self) -> usize {
        self.count(AccountRegistration::Created)
    }

    /// Genesis accounts that were already present.
    pub fn accounts_existing(&self) -> usize {
        self.count(AccountRegistration::AlreadyExists)
    }

    fn count(&self, registration: AccountRegistration) -> usize {
        self.validators
            .iter()
            .filter(|v| v.registration == registration)
            .count()
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Bootstrap Summary ===\n");
        match self.downloaded_bytes {
            Some(bytes) => println!("Binary:           downloaded ({bytes} bytes)"),
            None => println!("Binary:           reused"),
        }
        println!("Validators:       {}", self.validators.len());
        for validator in &self.validators {
            println!(
                "  - {} ({}) {}",
                validator.validator_address, validator.account_address, validator.stake
            );
        }
        println!("Accounts created: {}", self.accounts_created());
        println!("Accounts present: {}", self.accounts_existing());
        match self.node_pid {
            Some(pid) => println!("Node PID:         {pid}"),
            None => println!("Node PID:         unknown"),
        }
        println!("Status attempts:  {}", self.health_check_attempts);
        println!(
            "Node:             {}",
            if self.node_stopped {
                "stopped"
            } else {
                "running"
            }
        );
        println!("\nGentx validation passed.");
    }
}
