//! CLI command implementations.

use anyhow::{Context, Result};
use seda_bootstrap::{Bootstrap, BootstrapConfig};
use std::path::Path;

fn load_config(file: Option<&Path>, overrides: &[(&str, String)]) -> Result<BootstrapConfig> {
    BootstrapConfig::load(file, overrides).context("failed to load configuration")
}

/// Run the full bootstrap.
pub async fn run(file: Option<&Path>, overrides: &[(&str, String)]) -> Result<()> {
    let config = load_config(file, overrides)?;
    let report = Bootstrap::new(config).run().await?;

    report.print_summary();
    Ok(())
}

/// Check every gentx in the working directory and print what would be
/// registered.
pub fn check(file: Option<&Path>, overrides: &[(&str, String)]) -> Result<()> {
    let config = load_config(file, overrides)?;
    let bootstrap = Bootstrap::new(config);
    let checked = bootstrap.check()?;

    let config = bootstrap.config();
    println!(
        "Checked {} gentx file(s) in {}",
        checked.len(),
        config.gentx_dir().display()
    );
    println!("  denom:    {}", config.denom);
    println!("  max bond: {}", config.max_bond);
    for gentx in &checked {
        println!(
            "  - {}: {} -> {} ({})",
            gentx.file.file_name().to_string_lossy(),
            gentx.validator_address,
            gentx.account_address,
            gentx.stake
        );
    }
    println!("\nGentx validation passed.");
    Ok(())
}
