//! Node binary provisioning.

use crate::error::{BootstrapError, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Download `url` to `dest` and make it executable. Returns the number of
/// bytes written.
///
/// The body is streamed to `<dest>.part` and renamed into place once
/// complete, so an interrupted download never leaves a truncated binary at
/// `dest`. The partial file is removed when streaming or the rename fails.
pub async fn provision_binary(url: &str, dest: &Path) -> Result<u64> {
    let bytes = download(url, dest).await?;
    make_executable(dest)?;
    Ok(bytes)
}

async fn download(url: &str, dest: &Path) -> Result<u64> {
    let client = Client::builder()
        .user_agent(concat!("seda-bootstrap/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| BootstrapError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| BootstrapError::Download(format!("GET {url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(BootstrapError::Download(format!(
            "GET {url} returned {status}"
        )));
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BootstrapError::fs(parent, e))?;
    }

    let partial = partial_path(dest);
    let written = match persist(url, &mut response, &partial, dest).await {
        Ok(written) => written,
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                tracing::debug!(
                    path = %partial.display(),
                    error = %cleanup,
                    "Could not remove partial download"
                );
            }
            return Err(e);
        }
    };

    tracing::info!(url = %url, path = %dest.display(), bytes = written, "Downloaded binary");
    Ok(written)
}

/// Stream the body to `partial`, then move it to `dest`.
async fn persist(
    url: &str,
    response: &mut reqwest::Response,
    partial: &Path,
    dest: &Path,
) -> Result<u64> {
    let mut out = tokio::fs::File::create(partial)
        .await
        .map_err(|e| BootstrapError::fs(partial, e))?;

    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| BootstrapError::Download(format!("GET {url}: {e}")))?
    {
        out.write_all(&chunk)
            .await
            .map_err(|e| BootstrapError::fs(partial, e))?;
        written += chunk.len() as u64;
    }
    out.flush()
        .await
        .map_err(|e| BootstrapError::fs(partial, e))?;
    drop(out);

    tokio::fs::rename(partial, dest)
        .await
        .map_err(|e| BootstrapError::fs(dest, e))?;
    Ok(written)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// Set mode `0755` on `path`.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| BootstrapError::fs(path, e))
}

/// No-op where executability is not a permission bit.
#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
