//! # SEDA Network Bootstrap
//!
//! Tooling for bringing up a local SEDA chain from a set of candidate
//! validator genesis transactions (gentxs).
//!
//! ## Features
//!
//! - **Provisioning**: Downloads the `sedad` node binary and makes it executable
//! - **Node Initialization**: Resets the node home, writes client config and installs
//!   the genesis template with a fixed past start time
//! - **Gentx Validation**: Checks each gentx's denomination and self-bond ceiling,
//!   funds the validator's account in genesis and stages the file for collection
//! - **Genesis Assembly**: Runs `collect-gentxs` and `validate-genesis`
//! - **Smoke Test**: Starts the node and polls `status` with exponential backoff
//!
//! ## Example
//!
//! ```rust,ignore
//! use seda_bootstrap::{Bootstrap, BootstrapConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BootstrapConfig::load(None, &[])?;
//!     let report = Bootstrap::new(config).run().await?;
//!
//!     report.print_summary();
//!     Ok(())
//! }
//! ```

pub mod address;
pub mod amount;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod genesis;
pub mod gentx;
pub mod launch;
pub mod node;
pub mod progress;
pub mod provision;
pub mod retry;
pub mod validation;

// Re-export main types
pub use address::AddressCodec;
pub use amount::{Amount, Coin};
pub use bootstrap::Bootstrap;
pub use crate::config::{BootstrapConfig, HealthCheckConfig};
pub use error::{BootstrapError, InvariantViolation, Result};
pub use gentx::GentxFile;
pub use launch::LaunchOutcome;
pub use node::{AccountRegistration, Node, NodeProcess, NodeRunner, ProcessOutput, SedadRunner};
pub use progress::{AcceptedValidator, BootstrapPhase, BootstrapReport};
pub use retry::RetryPolicy;
pub use validation::{CheckedGentx, GentxValidator, ValidationRules};

/// Version of the bootstrap tool.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
