//! SEDA bootstrap CLI - bring up a local SEDA network from gentx files.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

/// Bootstrap a SEDA network: provision sedad, validate gentxs, smoke-test the node
#[derive(Parser, Debug)]
#[command(name = "seda-bootstrap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Configuration file (default: ./seda-bootstrap.{toml,yaml,json} if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Flags overriding configuration values.
#[derive(clap::Args, Debug)]
struct Overrides {
    /// Chain id
    #[arg(long, global = true)]
    chain_id: Option<String>,

    /// Directory holding pre-genesis.json and gentx/
    #[arg(long, global = true)]
    working_dir: Option<PathBuf>,

    /// Node home directory (wiped on every run)
    #[arg(long, global = true)]
    node_home: Option<PathBuf>,

    /// URL to download the node binary from
    #[arg(long, global = true)]
    binary_url: Option<String>,

    /// Local path of the node binary
    #[arg(long, global = true)]
    binary_path: Option<PathBuf>,

    /// Staking denomination
    #[arg(long, global = true)]
    denom: Option<String>,

    /// Largest self-bond a gentx may declare
    #[arg(long, global = true)]
    max_bond: Option<String>,

    /// Reuse the binary at --binary-path instead of downloading
    #[arg(long, global = true)]
    skip_download: bool,

    /// Stop the node once it answers a status query
    #[arg(long, global = true)]
    stop_node: bool,
}

impl Overrides {
    fn into_pairs(self) -> Vec<(&'static str, String)> {
        let path = |p: PathBuf| p.to_string_lossy().into_owned();
        let mut pairs = Vec::new();

        if let Some(v) = self.chain_id {
            pairs.push(("chain_id", v));
        }
        if let Some(v) = self.working_dir {
            pairs.push(("working_dir", path(v)));
        }
        if let Some(v) = self.node_home {
            pairs.push(("node_home", path(v)));
        }
        if let Some(v) = self.binary_url {
            pairs.push(("binary_url", v));
        }
        if let Some(v) = self.binary_path {
            pairs.push(("binary_path", path(v)));
        }
        if let Some(v) = self.denom {
            pairs.push(("denom", v));
        }
        if let Some(v) = self.max_bond {
            pairs.push(("max_bond", v));
        }
        if self.skip_download {
            pairs.push(("skip_download", "true".to_string()));
        }
        if self.stop_node {
            pairs.push(("health_check.stop_node", "true".to_string()));
        }
        pairs
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full bootstrap (default)
    Run,

    /// Check gentx files without touching the node
    Check,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Check => "check",
        }
    }
}

fn init_logging(verbose: u8, json: bool) {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("seda_bootstrap={log_level}").into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let command = cli.command.unwrap_or(Commands::Run);
    tracing::info!(
        command = command.name(),
        version = seda_bootstrap::VERSION,
        "Starting seda-bootstrap"
    );

    let overrides = cli.overrides.into_pairs();
    let result = match command {
        Commands::Run => commands::run(cli.config.as_deref(), &overrides).await,
        Commands::Check => commands::check(cli.config.as_deref(), &overrides),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
