//! End-to-end bootstrap run.

use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};
use crate::genesis::install_genesis;
use crate::gentx::discover;
use crate::launch::launch_and_check;
use crate::node::{Node, NodeRunner, SedadRunner};
use crate::progress::{BootstrapPhase, BootstrapReport};
use crate::provision::{make_executable, provision_binary};
use crate::validation::{check_all, CheckedGentx, GentxValidator, ValidationRules};
use std::path::PathBuf;
use tracing::{info, warn};

/// Drives a bootstrap run against a node.
pub struct Bootstrap<R> {
    config: BootstrapConfig,
    node: Node<R>,
}

impl Bootstrap<SedadRunner> {
    /// Bootstrap using the `sedad` binary at `config.binary_path`.
    pub fn new(config: BootstrapConfig) -> Self {
        let runner = SedadRunner::new(&config.binary_path, &config.node_home);
        Self::with_runner(config, runner)
    }
}

impl<R: NodeRunner> Bootstrap<R> {
    /// Bootstrap using a custom runner.
    pub fn with_runner(config: BootstrapConfig, runner: R) -> Self {
        Self {
            config,
            node: Node::new(runner),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// The node being bootstrapped.
    pub fn node(&self) -> &Node<R> {
        &self.node
    }

    /// Run every phase in order. The first error aborts the run; nothing
    /// done before it is rolled back.
    pub async fn run(&self) -> Result<BootstrapReport> {
        let mut report = BootstrapReport::new();
        info!(
            chain_id = %self.config.chain_id,
            working_dir = %self.config.working_dir.display(),
            node_home = %self.config.node_home.display(),
            "Starting bootstrap"
        );

        enter(BootstrapPhase::ProvisioningBinary);
        report.downloaded_bytes = self.provision().await?;

        enter(BootstrapPhase::InitializingNode);
        self.initialize().await?;

        enter(BootstrapPhase::ValidatingGentxs);
        let paths = self.gentx_paths()?;
        report.validators = GentxValidator::new(&self.node, &self.config)
            .process_all(&paths)
            .await?;

        enter(BootstrapPhase::AssemblingGenesis);
        self.assemble().await?;

        enter(BootstrapPhase::LaunchingNode);
        let outcome = launch_and_check(&self.node, &self.config.health_check).await?;
        if let Some(height) = outcome.latest_block_height() {
            info!(height, "Node is producing blocks");
        }
        report.node_pid = outcome.pid;
        report.health_check_attempts = outcome.attempts;
        report.node_stopped = outcome.stopped;

        enter(BootstrapPhase::Complete);
        Ok(report)
    }

    /// Check every gentx in the working directory without touching the node.
    pub fn check(&self) -> Result<Vec<CheckedGentx>> {
        let paths = self.gentx_paths()?;
        check_all(&paths, &ValidationRules::from_config(&self.config))
    }

    async fn provision(&self) -> Result<Option<u64>> {
        let binary = &self.config.binary_path;
        if self.config.skip_download {
            if !binary.is_file() {
                return Err(BootstrapError::fs(
                    binary,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "node binary not found"),
                ));
            }
            make_executable(binary)?;
            info!(path = %binary.display(), "Reusing existing binary");
            return Ok(None);
        }

        info!(url = %self.config.binary_url, "Downloading binary");
        provision_binary(&self.config.binary_url, binary)
            .await
            .map(Some)
    }

    /// Wipe the node home, write client config, `init`, and install the
    /// genesis template with its start time rewritten.
    async fn initialize(&self) -> Result<()> {
        let home = &self.config.node_home;
        match std::fs::remove_dir_all(home) {
            Ok(()) => info!(path = %home.display(), "Removed previous node home"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(BootstrapError::fs(home, e)),
        }

        self.node
            .set_client_config("chain-id", &self.config.chain_id)
            .await?;
        self.node
            .set_client_config("keyring-backend", &self.config.keyring_backend)
            .await?;
        self.node
            .init(&self.config.moniker, &self.config.denom)
            .await?;

        let installed = install_genesis(
            self.config.genesis_template(),
            self.config.genesis_path(),
            self.config.genesis_time,
        )?;
        info!(path = %installed.display(), "Installed genesis template");
        Ok(())
    }

    async fn assemble(&self) -> Result<()> {
        info!("Collecting gentxs");
        self.node.collect_gentxs().await?;
        info!("Validating genesis");
        self.node.validate_genesis().await?;
        Ok(())
    }

    fn gentx_paths(&self) -> Result<Vec<PathBuf>> {
        let dir = self.config.gentx_dir();
        let paths = discover(&dir)?;
        if paths.is_empty() {
            warn!(dir = %dir.display(), "No gentx files found");
        } else {
            info!(dir = %dir.display(), count = paths.len(), "Found gentx files");
        }
        Ok(paths)
    }
}

fn enter(phase: BootstrapPhase) {
    info!("==> {phase}");
}
