use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the modsync backend.
/// Every module returns `Result<T, ModsyncError>`.
#[derive(Debug, Error)]
pub enum ModsyncError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog returned HTTP {status} for {url}")]
    CatalogStatus { url: String, status: u16 },

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Descriptors ─────────────────────────────────────
    #[error("No known mod descriptor found in archive")]
    NoDescriptorFound,

    #[error("Could not parse {entry}: {reason}")]
    DescriptorParse {
        entry: String,
        reason: String,
        /// Raw descriptor text, kept for diagnostics.
        raw: String,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Archive unreadable: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Settings ────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type ModsyncResult<T> = Result<T, ModsyncError>;

impl ModsyncError {
    /// Soft extraction errors fall through to the filename heuristic.
    pub fn is_soft_extraction_error(&self) -> bool {
        matches!(
            self,
            ModsyncError::NoDescriptorFound
                | ModsyncError::DescriptorParse { .. }
                | ModsyncError::Zip(_)
        )
    }
}
