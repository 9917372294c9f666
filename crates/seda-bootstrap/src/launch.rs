//! Node launch and health check.

use crate::config::HealthCheckConfig;
use crate::error::{BootstrapError, Result};
use crate::node::{Node, NodeProcess, NodeRunner};
use serde_json::Value;

/// What happened when the node was launched.
#[derive(Debug, Clone)]
pub struct LaunchOutcome {
    /// PID of the node process, if known.
    pub pid: Option<u32>,
    /// Status queries issued, including the successful one.
    pub attempts: u32,
    /// Output of the successful status query.
    pub status: String,
    /// Whether the node was stopped afterwards.
    pub stopped: bool,
}

impl LaunchOutcome {
    /// Latest block height reported by the node, when the status output is
    /// the usual JSON document.
    pub fn latest_block_height(&self) -> Option<u64> {
        latest_block_height(&self.status)
    }
}

/// Start the node in the background, wait out the warm-up period, then poll
/// `status` until it succeeds or the retry budget is spent.
///
/// A node that exits while being polled fails the launch immediately. The
/// node is left running unless `settings.stop_node` is set.
pub async fn launch_and_check<R: NodeRunner>(
    node: &Node<R>,
    settings: &HealthCheckConfig,
) -> Result<LaunchOutcome> {
    let mut process = node.start()?;
    let pid = process.id();
    tracing::info!(pid = ?pid, "Node started");

    let result = poll_status(node, process.as_mut(), settings).await;

    let (attempts, status) = match result {
        Ok(answer) => answer,
        Err(e) => {
            // Don't leave a node that never became healthy behind.
            if let Err(stop_err) = process.stop().await {
                tracing::warn!(error = %stop_err, "Failed to stop node");
            }
            return Err(e);
        }
    };

    let mut stopped = false;
    if settings.stop_node {
        process
            .stop()
            .await
            .map_err(|e| BootstrapError::ExternalProcess {
                step: "stop".to_string(),
                code: None,
                detail: e.to_string(),
            })?;
        stopped = true;
        tracing::info!(pid = ?pid, "Node stopped");
    }

    Ok(LaunchOutcome {
        pid,
        attempts,
        status,
        stopped,
    })
}

async fn poll_status<R: NodeRunner>(
    node: &Node<R>,
    process: &mut dyn NodeProcess,
    settings: &HealthCheckConfig,
) -> Result<(u32, String)> {
    let policy = settings.retry_policy();
    tracing::info!(
        warmup_ms = settings.warmup_ms,
        max_attempts = policy.max_attempts,
        max_backoff_ms = policy.total_backoff().as_millis() as u64,
        "Waiting for node to answer status queries"
    );
    tokio::time::sleep(settings.warmup()).await;

    let mut attempt = 0;
    loop {
        attempt += 1;

        if let Some(exit) = process.try_exit().map_err(|e| BootstrapError::ExternalProcess {
            step: "start".to_string(),
            code: None,
            detail: e.to_string(),
        })? {
            return Err(BootstrapError::ExternalProcess {
                step: "start".to_string(),
                code: exit.code(),
                detail: "node exited before answering status queries".to_string(),
            });
        }

        match node.status().await {
            Ok(status) => {
                tracing::info!(attempt, "Node answered status query");
                tracing::debug!(%status, "Node status");
                return Ok((attempt, status));
            }
            Err(e) if policy.allows_retry(attempt) => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Status query failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::error!(attempts = attempt, error = %e, "Node never answered status queries");
                return Err(e);
            }
        }
    }
}

/// Extract `sync_info.latest_block_height` from `status` output. Older
/// nodes print `SyncInfo` instead.
pub fn latest_block_height(status: &str) -> Option<u64> {
    let start = status.find('{')?;
    // Anything the node wrote to stderr follows the document.
    let doc = serde_json::Deserializer::from_str(&status[start..])
        .into_iter::<Value>()
        .next()?
        .ok()?;
    let sync_info = doc.get("sync_info").or_else(|| doc.get("SyncInfo"))?;
    match sync_info.get("latest_block_height")? {
        Value::String(height) => height.parse().ok(),
        Value::Number(height) => height.as_u64(),
        _ => None,
    }
}
