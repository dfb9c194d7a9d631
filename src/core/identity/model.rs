use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::error::{ModsyncError, ModsyncResult};

/// Mod loaders a local archive can target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    Fabric,
    Forge,
    Unknown,
}

impl LoaderKind {
    /// Map a catalog loader tag (`"fabric"`, `"forge"`, ...) to a kind.
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "fabric" => LoaderKind::Fabric,
            "forge" => LoaderKind::Forge,
            _ => LoaderKind::Unknown,
        }
    }

    /// Catalog tag for this loader, `None` for [`LoaderKind::Unknown`].
    pub fn as_tag(&self) -> Option<&'static str> {
        match self {
            LoaderKind::Fabric => Some("fabric"),
            LoaderKind::Forge => Some("forge"),
            LoaderKind::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, LoaderKind::Unknown)
    }
}

impl std::fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderKind::Fabric => write!(f, "fabric"),
            LoaderKind::Forge => write!(f, "forge"),
            LoaderKind::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for LoaderKind {
    type Err = ModsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match LoaderKind::from_tag(s) {
            LoaderKind::Unknown => Err(ModsyncError::Config(format!("unsupported loader: {s}"))),
            kind => Ok(kind),
        }
    }
}

/// Where the values of a [`LocalModIdentity`] came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceConfidence {
    /// Parsed from a descriptor bundled in the archive. `mod_id` is verbatim.
    Descriptor,
    /// Guessed from the filename. Values may be wrong.
    FilenameHeuristic,
    /// Not derived from an archive (e.g. a project picked from search results).
    None,
}

/// Normalized identity of one local mod archive.
///
/// Built once per archive and never mutated; re-extraction yields a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalModIdentity {
    pub filename: String,
    pub mod_id: Option<String>,
    pub display_name: String,
    pub mod_version: Option<String>,
    pub minecraft_version: Option<String>,
    pub loader_kind: LoaderKind,
    pub source_confidence: SourceConfidence,
}

impl LocalModIdentity {
    /// The identifier to trust verbatim during resolution, if any.
    pub fn exact_identifier(&self) -> Option<&str> {
        match self.source_confidence {
            SourceConfidence::Descriptor => self.mod_id.as_deref(),
            _ => None,
        }
    }

    /// Text used for a catalog search: `mod_id` when known, else the display name.
    pub fn search_text(&self) -> &str {
        self.mod_id.as_deref().unwrap_or(&self.display_name)
    }
}

/// Where the bytes of a [`RawArchive`] live until they are read.
#[derive(Debug, Clone)]
pub enum ArchiveContent {
    InMemory(Vec<u8>),
    OnDisk(PathBuf),
}

/// An archive handed over by the file-selection side. Read once, then dropped.
#[derive(Debug, Clone)]
pub struct RawArchive {
    pub filename: String,
    pub size: u64,
    content: ArchiveContent,
}

impl RawArchive {
    pub fn from_bytes(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            size: bytes.len() as u64,
            content: ArchiveContent::InMemory(bytes),
        }
    }

    pub fn from_path(filename: impl Into<String>, size: u64, path: PathBuf) -> Self {
        Self {
            filename: filename.into(),
            size,
            content: ArchiveContent::OnDisk(path),
        }
    }

    /// Consume the archive and return its bytes.
    pub async fn into_bytes(self) -> ModsyncResult<Vec<u8>> {
        match self.content {
            ArchiveContent::InMemory(bytes) => Ok(bytes),
            ArchiveContent::OnDisk(path) => {
                tokio::fs::read(&path)
                    .await
                    .map_err(|source| ModsyncError::Io { path, source })
            }
        }
    }
}
