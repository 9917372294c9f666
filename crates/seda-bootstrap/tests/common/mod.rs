//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use seda_bootstrap::node::ACCOUNT_EXISTS_DIAGNOSTIC;
use seda_bootstrap::{AddressCodec, BootstrapConfig, HealthCheckConfig, NodeProcess, NodeRunner, ProcessOutput};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Operator address for the 20 bytes `0x01..=0x14`.
pub const VALOPER_A: &str = "sedavaloper1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5z6ca7y";
/// Account address for the same bytes.
pub const ACCOUNT_A: &str = "seda1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5fvqx9a";
/// Operator address for twenty `0xab` bytes.
pub const VALOPER_B: &str = "sedavaloper14w46h2at4w46h2at4w46h2at4w46h2atpkwkf9";
/// Account address for the same bytes.
pub const ACCOUNT_B: &str = "seda14w46h2at4w46h2at4w46h2at4w46h2at2qkdju";

pub const ALLOCATION: &str = "5000000000000000000000aseda";
pub const MAX_BOND: &str = "600000000000000000000000000000000000";
pub const OVER_MAX_BOND: &str = "700000000000000000000000000000000000";

pub const PRE_GENESIS: &str = r#"{
  "genesis_time": "2031-01-01T00:00:00Z",
  "chain_id": "seda-1-dryrun",
  "initial_height": "1",
  "app_state": {
    "bank": {"balances": []}
  }
}
"#;

/// A gentx document with a single `MsgCreateValidator`.
pub fn gentx_json(validator_address: &str, denom: &str, amount: &str) -> String {
    format!(
        r#"{{
  "body": {{
    "messages": [
      {{
        "@type": "/cosmos.staking.v1beta1.MsgCreateValidator",
        "description": {{"moniker": "validator"}},
        "min_self_delegation": "1",
        "delegator_address": "",
        "validator_address": "{validator_address}",
        "value": {{"denom": "{denom}", "amount": "{amount}"}}
      }}
    ],
    "memo": "node-id@10.0.0.1:26656"
  }},
  "auth_info": {{"signer_infos": []}},
  "signatures": []
}}
"#
    )
}

/// Temporary working directory, node home and binary.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    /// Working directory with a genesis template and an empty gentx directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Self { dir };
        std::fs::create_dir_all(fixture.gentx_dir()).unwrap();
        std::fs::write(fixture.working_dir().join("pre-genesis.json"), PRE_GENESIS).unwrap();
        std::fs::write(fixture.binary_path(), "#!/bin/sh\n").unwrap();
        fixture
    }

    pub fn working_dir(&self) -> PathBuf {
        self.dir.path().join("mainnet")
    }

    pub fn gentx_dir(&self) -> PathBuf {
        self.working_dir().join("gentx")
    }

    pub fn node_home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    pub fn binary_path(&self) -> PathBuf {
        self.dir.path().join("sedad")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.node_home().join("config").join("gentx")
    }

    /// Write a gentx into the working directory and return its contents.
    pub fn add_gentx(&self, name: &str, validator_address: &str, denom: &str, amount: &str) -> String {
        let doc = gentx_json(validator_address, denom, amount);
        std::fs::write(self.gentx_dir().join(name), &doc).unwrap();
        doc
    }

    pub fn staged(&self, name: &str) -> Option<Vec<u8>> {
        std::fs::read(self.staging_dir().join(name)).ok()
    }

    /// Configuration pointing at this fixture with a fast health check.
    pub fn config(&self) -> BootstrapConfig {
        BootstrapConfig {
            working_dir: self.working_dir(),
            node_home: self.node_home(),
            binary_path: self.binary_path(),
            skip_download: true,
            max_bond: MAX_BOND.parse().unwrap(),
            health_check: HealthCheckConfig {
                warmup_ms: 0,
                max_attempts: 4,
                initial_delay_ms: 1,
                max_delay_ms: 5,
                stop_node: false,
            },
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct State {
    calls: Vec<Vec<String>>,
    accounts: HashSet<String>,
    failures: HashMap<String, ProcessOutput>,
    status_failures: u32,
    debug_addr_output: Option<String>,
    exited: bool,
    stopped: bool,
}

/// In-memory stand-in for `sedad`. Remembers funded accounts the way the
/// real binary does and can be told to fail particular subcommands.
#[derive(Clone, Default)]
pub struct FakeNode {
    state: Arc<Mutex<State>>,
}

impl FakeNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every invocation of `subcommand` fail with `output`.
    pub fn fail(&self, subcommand: &str, output: ProcessOutput) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(subcommand.to_string(), output);
    }

    /// Replace what `debug addr` prints.
    pub fn set_debug_addr_output(&self, output: &str) {
        self.state.lock().unwrap().debug_addr_output = Some(output.to_string());
    }

    /// Make the next `count` status queries fail.
    pub fn fail_status(&self, count: u32) {
        self.state.lock().unwrap().status_failures = count;
    }

    /// Report the node process as exited.
    pub fn exit_node(&self) {
        self.state.lock().unwrap().exited = true;
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().calls.clone()
    }

    /// First argument of every call, in order.
    pub fn subcommands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|call| call.first().cloned().unwrap_or_default())
            .collect()
    }

    pub fn accounts(&self) -> HashSet<String> {
        self.state.lock().unwrap().accounts.clone()
    }

    pub fn stopped(&self) -> bool {
        self.state.lock().unwrap().stopped
    }
}

#[async_trait]
impl NodeRunner for FakeNode {
    async fn run(&self, args: &[&str]) -> std::io::Result<ProcessOutput> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(args.iter().map(|s| s.to_string()).collect());

        let subcommand = args.first().copied().unwrap_or_default();
        if let Some(output) = state.failures.get(subcommand) {
            return Ok(output.clone());
        }

        match subcommand {
            "add-genesis-account" => {
                let address = args.get(1).copied().unwrap_or_default().to_string();
                if state.accounts.insert(address.clone()) {
                    Ok(ProcessOutput::ok(""))
                } else {
                    Ok(ProcessOutput::failed(
                        1,
                        format!("Error: {ACCOUNT_EXISTS_DIAGNOSTIC} {address}\n"),
                    ))
                }
            }
            "debug" => {
                if let Some(output) = &state.debug_addr_output {
                    return Ok(ProcessOutput::ok(output.clone()));
                }
                let valoper = args.get(2).copied().unwrap_or_default();
                let account = AddressCodec::new("seda")
                    .account_for_validator(valoper)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
                Ok(ProcessOutput::ok(format!(
                    "Address: [..]\nBech32 Acc: {account}\nBech32 Val: {valoper}\n"
                )))
            }
            "status" if state.status_failures > 0 => {
                state.status_failures -= 1;
                Ok(ProcessOutput::failed(
                    1,
                    "Error: post failed: connection refused",
                ))
            }
            "status" => Ok(ProcessOutput::ok(
                r#"{"sync_info":{"latest_block_height":"12","catching_up":false}}"#,
            )),
            _ => Ok(ProcessOutput::ok("")),
        }
    }

    fn spawn(&self, args: &[&str]) -> std::io::Result<Box<dyn NodeProcess>> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(args.iter().map(|s| s.to_string()).collect());
        Ok(Box::new(FakeProcess {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeProcess {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl NodeProcess for FakeProcess {
    fn id(&self) -> Option<u32> {
        Some(4242)
    }

    fn try_exit(&mut self) -> std::io::Result<Option<ExitStatus>> {
        if self.state.lock().unwrap().exited {
            Ok(Some(exit_status(1)))
        } else {
            Ok(None)
        }
    }

    async fn stop(&mut self) -> std::io::Result<()> {
        self.state.lock().unwrap().stopped = true;
        Ok(())
    }
}

#[cfg(unix)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}

pub fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}
