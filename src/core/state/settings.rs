use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::catalog::MODRINTH_API_BASE;
use crate::core::error::{ModsyncError, ModsyncResult};
use crate::core::http::APP_USER_AGENT;

const APP_DIR_NAME: &str = "modsync";
const SETTINGS_FILE: &str = "settings.json";

/// User preferences persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub catalog_url: String,
    pub user_agent: String,
    /// Pause after every download trigger.
    pub pacing_ms: u64,
    pub archive_extension: String,
    pub page_size: u32,
    pub download_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_url: MODRINTH_API_BASE.to_string(),
            user_agent: APP_USER_AGENT.to_string(),
            pacing_ms: 300,
            archive_extension: ".jar".to_string(),
            page_size: 20,
            download_dir: None,
        }
    }
}

impl Settings {
    /// Load from the default location.
    pub fn load() -> Self {
        Self::load_from(&settings_path())
    }

    /// A missing file yields defaults; an unreadable or malformed one is
    /// reported and also yields defaults.
    pub fn load_from(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {:?}, using defaults", path);
                return Self::default();
            }
            Err(e) => {
                warn!("Could not read settings {:?}: {}", path, e);
                return Self::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Malformed settings {:?}: {}; using defaults", path, e);
            Self::default()
        })
    }

    pub fn save(&self) -> ModsyncResult<PathBuf> {
        let path = settings_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> ModsyncResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ModsyncError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| ModsyncError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Configured download directory, else `<downloads>/modsync`.
    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir.clone().unwrap_or_else(|| {
            dirs::download_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR_NAME)
        })
    }
}

pub fn settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(SETTINGS_FILE)
}
