//! Invocation of the node binary.
//!
//! [`NodeRunner`] is the process seam: it runs one subcommand and reports
//! what happened. [`Node`] layers the subcommands used during bootstrap on top
//! of it and turns unsuccessful exits into [`BootstrapError::ExternalProcess`].

use crate::amount::Coin;
use crate::error::{BootstrapError, Result};
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};

/// Diagnostic printed by `add-genesis-account` when the address is already
/// funded in genesis.
pub const ACCOUNT_EXISTS_DIAGNOSTIC: &str = "cannot add account at existing address";

/// File in the node home receiving the output of `start`.
pub const NODE_LOG_FILE: &str = "node.log";

/// Captured result of a finished subcommand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl ProcessOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    fn from_std(output: std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// A node process running in the background.
#[async_trait]
pub trait NodeProcess: Send {
    /// OS process id, if known.
    fn id(&self) -> Option<u32>;

    /// Exit status if the process has already exited.
    fn try_exit(&mut self) -> std::io::Result<Option<ExitStatus>>;

    /// Terminate the process.
    async fn stop(&mut self) -> std::io::Result<()>;
}

/// Runs node subcommands.
#[async_trait]
pub trait NodeRunner: Send + Sync {
    /// Run a subcommand to completion and capture its output.
    async fn run(&self, args: &[&str]) -> std::io::Result<ProcessOutput>;

    /// Start a long-running subcommand in the background.
    fn spawn(&self, args: &[&str]) -> std::io::Result<Box<dyn NodeProcess>>;
}

/// [`NodeRunner`] backed by a `sedad` executable. Every invocation gets
/// `--home <home>` appended.
#[derive(Debug, Clone)]
pub struct SedadRunner {
    binary: PathBuf,
    home: PathBuf,
}

impl SedadRunner {
    /// Create a runner for `binary` operating on node home `home`.
    pub fn new(binary: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            home: home.into(),
        }
    }

    /// Path of the executable.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args).arg("--home").arg(&self.home);
        cmd.stdin(Stdio::null());
        cmd
    }
}

#[async_trait]
impl NodeRunner for SedadRunner {
    async fn run(&self, args: &[&str]) -> std::io::Result<ProcessOutput> {
        tracing::debug!(binary = %self.binary.display(), ?args, "Running node command");
        let output = self.command(args).output().await?;
        Ok(ProcessOutput::from_std(output))
    }

    fn spawn(&self, args: &[&str]) -> std::io::Result<Box<dyn NodeProcess>> {
        std::fs::create_dir_all(&self.home)?;
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.home.join(NODE_LOG_FILE))?;

        tracing::debug!(binary = %self.binary.display(), ?args, "Spawning node process");
        let child = self
            .command(args)
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log))
            .spawn()?;

        Ok(Box::new(SpawnedNode { child }))
    }
}

struct SpawnedNode {
    child: Child,
}

#[async_trait]
impl NodeProcess for SpawnedNode {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_exit(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    async fn stop(&mut self) -> std::io::Result<()> {
        self.child.kill().await
    }
}

/// Outcome of registering a genesis account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRegistration {
    /// The account was added to genesis.
    Created,
    /// The address was already funded; nothing changed.
    AlreadyExists,
}

/// Node subcommands used during bootstrap.
#[derive(Debug)]
pub struct Node<R> {
    runner: R,
}

impl<R: NodeRunner> Node<R> {
    /// Wrap a runner.
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// The underlying runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn invoke(&self, step: &str, args: &[&str]) -> Result<ProcessOutput> {
        self.runner
            .run(args)
            .await
            .map_err(|e| BootstrapError::ExternalProcess {
                step: step.to_string(),
                code: None,
                detail: e.to_string(),
            })
    }

    async fn exec(&self, step: &str, args: &[&str]) -> Result<ProcessOutput> {
        let output = self.invoke(step, args).await?;
        if output.success {
            Ok(output)
        } else {
            Err(process_failure(step, &output))
        }
    }

    /// `config set client <key> <value>`.
    pub async fn set_client_config(&self, key: &str, value: &str) -> Result<()> {
        self.exec(
            &format!("config set client {key}"),
            &["config", "set", "client", key, value],
        )
        .await?;
        Ok(())
    }

    /// `init <moniker> --default-denom <denom>`.
    pub async fn init(&self, moniker: &str, denom: &str) -> Result<()> {
        self.exec("init", &["init", moniker, "--default-denom", denom])
            .await?;
        Ok(())
    }

    /// `add-genesis-account <address> <coin>`. An address that is already
    /// present is reported as [`AccountRegistration::AlreadyExists`]; any
    /// other failure is an error.
    pub async fn add_genesis_account(
        &self,
        address: &str,
        allocation: &Coin,
        keyring_backend: &str,
    ) -> Result<AccountRegistration> {
        const STEP: &str = "add-genesis-account";
        let coin = allocation.to_string();
        let output = self
            .invoke(
                STEP,
                &[
                    "add-genesis-account",
                    address,
                    &coin,
                    "--keyring-backend",
                    keyring_backend,
                ],
            )
            .await?;

        if output.success {
            Ok(AccountRegistration::Created)
        } else if output.stderr.contains(ACCOUNT_EXISTS_DIAGNOSTIC) {
            Ok(AccountRegistration::AlreadyExists)
        } else {
            Err(process_failure(STEP, &output))
        }
    }

    /// `debug addr <address>`; returns the node's rendering of the address.
    pub async fn debug_addr(&self, address: &str) -> Result<String> {
        let output = self.exec("debug addr", &["debug", "addr", address]).await?;
        Ok(combined_output(&output))
    }

    /// `collect-gentxs`.
    pub async fn collect_gentxs(&self) -> Result<()> {
        self.exec("collect-gentxs", &["collect-gentxs"]).await?;
        Ok(())
    }

    /// `validate-genesis`.
    pub async fn validate_genesis(&self) -> Result<()> {
        self.exec("validate-genesis", &["validate-genesis"]).await?;
        Ok(())
    }

    /// `start`, in the background.
    pub fn start(&self) -> Result<Box<dyn NodeProcess>> {
        self.runner
            .spawn(&["start"])
            .map_err(|e| BootstrapError::ExternalProcess {
                step: "start".to_string(),
                code: None,
                detail: e.to_string(),
            })
    }

    /// `status`; returns stdout and stderr combined.
    pub async fn status(&self) -> Result<String> {
        let output = self.exec("status", &["status"]).await?;
        Ok(combined_output(&output))
    }
}

/// The `Bech32 Acc:` line of `debug addr` output.
pub fn account_from_debug_addr(output: &str) -> Option<&str> {
    output.lines().find_map(|line| {
        line.trim()
            .strip_prefix("Bech32 Acc:")
            .map(str::trim)
            .filter(|address| !address.is_empty())
    })
}

fn process_failure(step: &str, output: &ProcessOutput) -> BootstrapError {
    let stderr = output.stderr.trim();
    let detail = if stderr.is_empty() {
        output.stdout.trim()
    } else {
        stderr
    };
    BootstrapError::ExternalProcess {
        step: step.to_string(),
        code: output.code,
        detail: detail.to_string(),
    }
}

fn combined_output(output: &ProcessOutput) -> String {
    let mut text = output.stdout.trim().to_string();
    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stderr);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned outputs in order and records the arguments it saw.
    #[derive(Default)]
    struct Scripted {
        outputs: Mutex<VecDeque<std::io::Result<ProcessOutput>>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl Scripted {
        fn with(outputs: Vec<std::io::Result<ProcessOutput>>) -> Self {
            Self {
                outputs: Mutex::new(outputs.into()),
                calls: Mutex::default(),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NodeRunner for Scripted {
        async fn run(&self, args: &[&str]) -> std::io::Result<ProcessOutput> {
            self.calls
                .lock()
                .unwrap()
                .push(args.iter().map(|s| s.to_string()).collect());
            self.outputs
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ProcessOutput::ok("")))
        }

        fn spawn(&self, _args: &[&str]) -> std::io::Result<Box<dyn NodeProcess>> {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such binary",
            ))
        }
    }

    fn allocation() -> Coin {
        "5000000000000000000000aseda".parse().unwrap()
    }

    #[tokio::test]
    async fn test_add_genesis_account_created() {
        let node = Node::new(Scripted::with(vec![Ok(ProcessOutput::ok(""))]));
        let outcome = node
            .add_genesis_account("seda1abc", &allocation(), "test")
            .await
            .unwrap();

        assert_eq!(outcome, AccountRegistration::Created);
        assert_eq!(
            node.runner().calls(),
            vec![vec![
                "add-genesis-account",
                "seda1abc",
                "5000000000000000000000aseda",
                "--keyring-backend",
                "test"
            ]]
        );
    }

    #[tokio::test]
    async fn test_add_genesis_account_already_exists() {
        let node = Node::new(Scripted::with(vec![Ok(ProcessOutput::failed(
            1,
            "Error: failed to add account: cannot add account at existing address seda1abc\n",
        ))]));
        let outcome = node
            .add_genesis_account("seda1abc", &allocation(), "test")
            .await
            .unwrap();

        assert_eq!(outcome, AccountRegistration::AlreadyExists);
    }

    #[tokio::test]
    async fn test_add_genesis_account_other_failure() {
        let node = Node::new(Scripted::with(vec![Ok(ProcessOutput::failed(
            1,
            "Error: invalid coins\n",
        ))]));
        let err = node
            .add_genesis_account("seda1abc", &allocation(), "test")
            .await
            .unwrap_err();

        match err {
            BootstrapError::ExternalProcess { step, code, detail } => {
                assert_eq!(step, "add-genesis-account");
                assert_eq!(code, Some(1));
                assert_eq!(detail, "Error: invalid coins");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_exists_diagnostic_on_stdout_is_not_idempotent() {
        let mut output = ProcessOutput::failed(1, "");
        output.stdout = ACCOUNT_EXISTS_DIAGNOSTIC.to_string();
        let node = Node::new(Scripted::with(vec![Ok(output)]));

        assert!(node
            .add_genesis_account("seda1abc", &allocation(), "test")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_failed_exit_maps_to_error() {
        let node = Node::new(Scripted::with(vec![Ok(ProcessOutput::failed(
            2,
            "genesis.json is invalid",
        ))]));
        let err = node.validate_genesis().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "validate-genesis failed (exit code 2): genesis.json is invalid"
        );
    }

    #[tokio::test]
    async fn test_spawn_error_maps_to_error() {
        let node = Node::new(Scripted::with(vec![Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "No such file or directory",
        ))]));
        let err = node.collect_gentxs().await.unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::ExternalProcess { code: None, .. }
        ));

        assert!(node.start().is_err());
    }

    #[tokio::test]
    async fn test_client_config_args() {
        let node = Node::new(Scripted::default());
        node.set_client_config("chain-id", "seda-1-dryrun")
            .await
            .unwrap();
        node.init("node", "aseda").await.unwrap();

        assert_eq!(
            node.runner().calls(),
            vec![
                vec!["config", "set", "client", "chain-id", "seda-1-dryrun"],
                vec!["init", "node", "--default-denom", "aseda"],
            ]
        );
    }

    #[tokio::test]
    async fn test_status_combines_streams() {
        let mut output = ProcessOutput::ok("{\"sync_info\":{}}\n");
        output.stderr = "warning: deprecated flag\n".to_string();
        let node = Node::new(Scripted::with(vec![Ok(output)]));

        let status = node.status().await.unwrap();
        assert_eq!(status, "{\"sync_info\":{}}\nwarning: deprecated flag");
    }

    #[test]
    fn test_account_from_debug_addr() {
        let output = "Address: [1 2 3]\nAddress (hex): 010203\nBech32 Acc: seda1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5fvqx9a\nBech32 Val: sedavaloper1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5z6ca7y\n";
        assert_eq!(
            account_from_debug_addr(output),
            Some("seda1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5fvqx9a")
        );
        assert_eq!(account_from_debug_addr("Address: [1 2 3]"), None);
        assert_eq!(account_from_debug_addr("Bech32 Acc:   "), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sedad_runner_appends_home() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-sedad");
        std::fs::write(&script, "#!/bin/sh\necho \"$@\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let home = dir.path().join("home");
        let runner = SedadRunner::new(&script, &home);
        let output = runner.run(&["debug", "addr", "sedavaloper1x"]).await.unwrap();

        assert!(output.success);
        assert_eq!(
            output.stdout.trim(),
            format!("debug addr sedavaloper1x --home {}", home.display())
        );
    }
}
