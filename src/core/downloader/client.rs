use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{ModsyncError, ModsyncResult};

/// Host-side "save this file" action.
///
/// The orchestrator only learns whether the trigger was accepted; there is
/// no completion callback beyond the returned result.
#[async_trait]
pub trait DownloadTrigger: Send + Sync {
    async fn trigger(&self, url: &str, filename: &str) -> ModsyncResult<PathBuf>;
}

/// Streams release files into a target directory.
pub struct Downloader {
    client: Client,
    dest_dir: PathBuf,
}

impl Downloader {
    pub fn new(client: Client, dest_dir: PathBuf) -> Self {
        Self { client, dest_dir }
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Download `url` to `dest`, creating parent directories as needed.
    ///
    /// The body is streamed into `<dest>.part` and renamed over `dest` only
    /// once the stream ends cleanly, so an interrupted transfer never leaves
    /// a truncated archive behind. The file handle is dropped before the
    /// rename.
    pub async fn download_file(&self, url: &str, dest: &Path) -> ModsyncResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ModsyncError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModsyncError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let part = part_path(dest);
        let written = match write_body(response, &part).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&part, dest)
            .await
            .map_err(|e| ModsyncError::Io {
                path: dest.to_path_buf(),
                source: e,
            })?;

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
        Ok(())
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn write_body(response: reqwest::Response, path: &Path) -> ModsyncResult<u64> {
    let io_err = |e| ModsyncError::Io {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = tokio::fs::File::create(path).await.map_err(io_err)?;
    let mut body = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await.map_err(io_err)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(io_err)?;
    Ok(written)
}

#[async_trait]
impl DownloadTrigger for Downloader {
    async fn trigger(&self, url: &str, filename: &str) -> ModsyncResult<PathBuf> {
        let dest = self.dest_dir.join(safe_file_name(filename)?);
        self.download_file(url, &dest).await?;
        Ok(dest)
    }
}

/// Keep only the final path component of a catalog-supplied filename.
pub fn safe_file_name(filename: &str) -> ModsyncResult<&str> {
    filename
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .ok_or_else(|| ModsyncError::Other(format!("unusable download filename: {filename:?}")))
}
