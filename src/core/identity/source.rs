use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::model::RawArchive;
use crate::core::error::{ModsyncError, ModsyncResult};

/// Build the ordered archive list for a batch.
///
/// Explicit files are taken as-is, in argument order. Directories contribute
/// their direct children ending in `extension`, sorted by file name.
pub async fn collect_archives(paths: &[PathBuf], extension: &str) -> ModsyncResult<Vec<RawArchive>> {
    let mut archives = Vec::new();

    for path in paths {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|source| ModsyncError::Io {
                path: path.clone(),
                source,
            })?;

        if metadata.is_dir() {
            archives.extend(scan_directory(path, extension).await?);
        } else {
            archives.push(archive_from_file(path, metadata.len()));
        }
    }

    info!("Selected {} mod archives", archives.len());
    Ok(archives)
}

async fn scan_directory(dir: &Path, extension: &str) -> ModsyncResult<Vec<RawArchive>> {
    let io_err = |source| ModsyncError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let wanted = extension.to_ascii_lowercase();
    let mut found = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;

    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.to_ascii_lowercase().ends_with(&wanted) {
            continue;
        }

        let metadata = entry.metadata().await.map_err(io_err)?;
        if metadata.is_file() {
            found.push(archive_from_file(&path, metadata.len()));
        }
    }

    found.sort_by(|a, b| a.filename.cmp(&b.filename));
    debug!("{:?}: {} archives", dir, found.len());
    Ok(found)
}

fn archive_from_file(path: &Path, size: u64) -> RawArchive {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    RawArchive::from_path(filename, size, path.to_path_buf())
}
