//! Bootstrap configuration.
//!
//! Sources, lowest to highest priority: built-in defaults, an optional
//! configuration file, `SEDA_BOOTSTRAP_*` environment variables (nested keys
//! use `__`, e.g. `SEDA_BOOTSTRAP_HEALTH_CHECK__MAX_ATTEMPTS`), and explicit
//! overrides supplied by the caller.

use crate::address::AddressCodec;
use crate::amount::{Amount, Coin};
use crate::error::{BootstrapError, Result};
use crate::retry::RetryPolicy;
use chrono::{DateTime, TimeZone, Utc};
use config::{Environment, File};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::ValidationError;

/// Default configuration file name, looked up in the current directory with
/// any supported extension.
pub const DEFAULT_CONFIG_NAME: &str = "seda-bootstrap";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SEDA_BOOTSTRAP";

/// Default ceiling for a single validator's self-bond. Provisional; deployments
/// are expected to set their own.
pub const DEFAULT_MAX_BOND: &str = "600000000000000000000000000000000000";

/// Upper bound on `health_check.max_attempts`.
pub const MAX_HEALTH_CHECK_ATTEMPTS: u32 = 100;

/// Chain ids: alphanumeric start, then alphanumerics, `_`, `.` or `-`.
pub static CHAIN_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("Invalid regex"));

/// Cosmos SDK coin denominations.
pub static DENOM_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9/:._-]{2,127}$").expect("Invalid regex"));

/// Bech32 human-readable prefixes we accept.
pub static BECH32_PREFIX_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9]{0,40}$").expect("Invalid regex"));

/// Complete bootstrap configuration, built once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    /// Chain identifier written to the client config.
    pub chain_id: String,
    /// Directory holding `pre-genesis.json` and `gentx/`.
    pub working_dir: PathBuf,
    /// Where to download the node binary from.
    pub binary_url: String,
    /// Where the node binary lives locally.
    pub binary_path: PathBuf,
    /// Node home directory. Wiped at the start of every run.
    pub node_home: PathBuf,
    /// Moniker passed to `init`.
    pub moniker: String,
    /// Keyring backend for client config and genesis accounts.
    pub keyring_backend: String,
    /// Bech32 account prefix; the validator prefix is derived from it.
    pub account_prefix: String,
    /// Chain staking denomination.
    pub denom: String,
    /// Balance given to every validator's genesis account.
    pub genesis_allocation: Coin,
    /// Largest self-bond a single gentx may declare.
    pub max_bond: Amount,
    /// Start time written into genesis; in the past so blocks are produced
    /// immediately.
    pub genesis_time: DateTime<Utc>,
    /// Reuse an existing binary at `binary_path` instead of downloading.
    #[serde(default)]
    pub skip_download: bool,
    /// Post-launch health check.
    #[serde(default)]
    pub health_check: HealthCheckConfig,
}

/// Post-launch health check settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthCheckConfig {
    /// Wait before the first status query.
    pub warmup_ms: u64,
    /// Status queries before giving up.
    pub max_attempts: u32,
    /// Delay after the first failed query.
    pub initial_delay_ms: u64,
    /// Cap on the delay between queries.
    pub max_delay_ms: u64,
    /// Stop the node once it has answered.
    #[serde(default)]
    pub stop_node: bool,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            warmup_ms: 10_000,
            max_attempts: 6,
            initial_delay_ms: 1_000,
            max_delay_ms: 8_000,
            stop_node: false,
        }
    }
}

impl HealthCheckConfig {
    /// Warm-up interval.
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    /// Retry policy for status polling.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        let denom = "aseda".to_string();
        Self {
            chain_id: "seda-1-dryrun".to_string(),
            working_dir: PathBuf::from("./mainnet"),
            binary_url:
                "https://github.com/sedaprotocol/seda-chain/releases/download/v0.1.0-rc0/sedad-amd64"
                    .to_string(),
            binary_path: PathBuf::from("./sedad"),
            node_home: default_node_home(),
            moniker: "node".to_string(),
            keyring_backend: "test".to_string(),
            account_prefix: "seda".to_string(),
            // 5000 SEDA
            genesis_allocation: Coin::new(Amount::from(5_000_000_000_000_000_000_000u128), &denom),
            denom,
            max_bond: DEFAULT_MAX_BOND.parse().unwrap_or_default(),
            genesis_time: Utc
                .with_ymd_and_hms(2024, 1, 1, 18, 0, 0)
                .single()
                .unwrap_or_default(),
            skip_download: false,
            health_check: HealthCheckConfig::default(),
        }
    }
}

/// `$HOME/.sedad`, falling back to a relative `.sedad`.
pub fn default_node_home() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".sedad"))
        .unwrap_or_else(|| PathBuf::from(".sedad"))
}

impl BootstrapConfig {
    /// Load configuration from defaults, `file` (or `seda-bootstrap.*` in the
    /// current directory when `None`), the environment and `overrides`, then
    /// validate it.
    pub fn load(file: Option<&Path>, overrides: &[(&str, String)]) -> Result<Self> {
        let defaults = Self::default();
        let to_config_err = |e: config::ConfigError| BootstrapError::Config(e.to_string());

        let mut builder = config::Config::builder()
            .set_default("chain_id", defaults.chain_id.clone())
            .and_then(|b| b.set_default("working_dir", path_str(&defaults.working_dir)))
            .and_then(|b| b.set_default("binary_url", defaults.binary_url.clone()))
            .and_then(|b| b.set_default("binary_path", path_str(&defaults.binary_path)))
            .and_then(|b| b.set_default("node_home", path_str(&defaults.node_home)))
            .and_then(|b| b.set_default("moniker", defaults.moniker.clone()))
            .and_then(|b| b.set_default("keyring_backend", defaults.keyring_backend.clone()))
            .and_then(|b| b.set_default("account_prefix", defaults.account_prefix.clone()))
            .and_then(|b| b.set_default("denom", defaults.denom.clone()))
            .and_then(|b| {
                b.set_default("genesis_allocation", defaults.genesis_allocation.to_string())
            })
            .and_then(|b| b.set_default("max_bond", defaults.max_bond.to_string()))
            .and_then(|b| b.set_default("genesis_time", defaults.genesis_time.to_rfc3339()))
            .and_then(|b| b.set_default("skip_download", defaults.skip_download))
            .and_then(|b| {
                b.set_default(
                    "health_check.warmup_ms",
                    defaults.health_check.warmup_ms as i64,
                )
            })
            .and_then(|b| {
                b.set_default(
                    "health_check.max_attempts",
                    i64::from(defaults.health_check.max_attempts),
                )
            })
            .and_then(|b| {
                b.set_default(
                    "health_check.initial_delay_ms",
                    defaults.health_check.initial_delay_ms as i64,
                )
            })
            .and_then(|b| {
                b.set_default(
                    "health_check.max_delay_ms",
                    defaults.health_check.max_delay_ms as i64,
                )
            })
            .and_then(|b| b.set_default("health_check.stop_node", defaults.health_check.stop_node))
            .map_err(to_config_err)?;

        builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        for (key, value) in overrides {
            builder = builder
                .set_override(*key, value.clone())
                .map_err(to_config_err)?;
        }

        let config: Self = builder
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(to_config_err)?;

        config.validate()?;
        Ok(config)
    }

    /// Check field formats and cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        let mut problems: Vec<(&str, ValidationError)> = Vec::new();
        let mut check = |field: &'static str, result: std::result::Result<(), ValidationError>| {
            if let Err(e) = result {
                problems.push((field, e));
            }
        };

        check("chain_id", validate_chain_id(&self.chain_id));
        check("denom", validate_denom(&self.denom));
        check("account_prefix", validate_bech32_prefix(&self.account_prefix));
        check("binary_url", validate_binary_url(&self.binary_url));
        check("moniker", validate_non_empty(&self.moniker, "Moniker"));
        check(
            "keyring_backend",
            validate_non_empty(&self.keyring_backend, "Keyring backend"),
        );
        check(
            "genesis_allocation",
            validate_allocation(&self.genesis_allocation, &self.denom),
        );
        check("max_bond", validate_max_bond(&self.max_bond));
        check(
            "health_check.max_attempts",
            validate_attempts(self.health_check.max_attempts),
        );
        check("node_home", validate_node_home(&self.node_home));

        if problems.is_empty() {
            return Ok(());
        }

        let message = problems
            .iter()
            .map(|(field, e)| {
                let reason = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{field}: {reason}")
            })
            .collect::<Vec<_>>()
            .join("; ");
        Err(BootstrapError::Config(message))
    }

    /// Codec for this chain's addresses.
    pub fn address_codec(&self) -> AddressCodec {
        AddressCodec::new(&self.account_prefix)
    }

    /// Candidate gentx directory, `<working_dir>/gentx`.
    pub fn gentx_dir(&self) -> PathBuf {
        self.working_dir.join("gentx")
    }

    /// Genesis template, `<working_dir>/pre-genesis.json`.
    pub fn genesis_template(&self) -> PathBuf {
        self.working_dir.join("pre-genesis.json")
    }

    /// Node config directory, `<node_home>/config`.
    pub fn node_config_dir(&self) -> PathBuf {
        self.node_home.join("config")
    }

    /// Installed genesis, `<node_home>/config/genesis.json`.
    pub fn genesis_path(&self) -> PathBuf {
        self.node_config_dir().join("genesis.json")
    }

    /// Gentx staging directory, `<node_home>/config/gentx`.
    pub fn staging_dir(&self) -> PathBuf {
        self.node_config_dir().join("gentx")
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn invalid(code: &'static str, message: impl Into<String>) -> ValidationError {
    let message: String = message.into();
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Validate a chain id.
pub fn validate_chain_id(chain_id: &str) -> std::result::Result<(), ValidationError> {
    if chain_id.is_empty() {
        return Err(invalid("length", "Chain id cannot be empty"));
    }
    if chain_id.len() > 48 {
        return Err(invalid("length", "Chain id must be at most 48 characters"));
    }
    if !CHAIN_ID_REGEX.is_match(chain_id) {
        return Err(invalid("pattern", "Invalid chain id format"));
    }
    Ok(())
}

/// Validate a coin denomination.
pub fn validate_denom(denom: &str) -> std::result::Result<(), ValidationError> {
    if !DENOM_REGEX.is_match(denom) {
        return Err(invalid(
            "pattern",
            format!("Invalid denomination {denom:?}"),
        ));
    }
    Ok(())
}

/// Validate a bech32 human-readable prefix.
pub fn validate_bech32_prefix(prefix: &str) -> std::result::Result<(), ValidationError> {
    if !BECH32_PREFIX_REGEX.is_match(prefix) {
        return Err(invalid(
            "pattern",
            "Prefix must be lowercase alphanumeric and start with a letter",
        ));
    }
    Ok(())
}

fn validate_binary_url(raw: &str) -> std::result::Result<(), ValidationError> {
    match url::Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(invalid(
            "scheme",
            format!("Unsupported URL scheme {:?}", url.scheme()),
        )),
        Err(e) => Err(invalid("url", format!("Invalid URL: {e}"))),
    }
}

fn validate_non_empty(value: &str, what: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("length", format!("{what} cannot be empty")));
    }
    Ok(())
}

fn validate_allocation(allocation: &Coin, denom: &str) -> std::result::Result<(), ValidationError> {
    if allocation.denom != denom {
        return Err(invalid(
            "denom",
            format!(
                "Allocation must be in {denom}, found {}",
                allocation.denom
            ),
        ));
    }
    if allocation.amount.is_zero() {
        return Err(invalid("range", "Allocation must be positive"));
    }
    Ok(())
}

fn validate_max_bond(max_bond: &Amount) -> std::result::Result<(), ValidationError> {
    if max_bond.is_zero() {
        return Err(invalid("range", "Maximum bond must be positive"));
    }
    Ok(())
}

fn validate_attempts(attempts: u32) -> std::result::Result<(), ValidationError> {
    if attempts == 0 {
        return Err(invalid("range", "At least one attempt is required"));
    }
    if attempts > MAX_HEALTH_CHECK_ATTEMPTS {
        return Err(invalid(
            "range",
            format!("At most {MAX_HEALTH_CHECK_ATTEMPTS} attempts are allowed, found {attempts}"),
        ));
    }
    Ok(())
}

fn validate_node_home(home: &Path) -> std::result::Result<(), ValidationError> {
    // The home is wiped on every run; refuse anything that could be a root.
    if home.as_os_str().is_empty() || home.file_name().is_none() {
        return Err(invalid(
            "path",
            format!("Refusing to use {} as node home", home.display()),
        ));
    }
    Ok(())
}
