// ─── Version/Loader Matcher ───
// Picks the newest release compatible with a target game version, treating
// the loader as a soft preference, then picks its distributable file.

use thiserror::Error;
use tracing::{debug, warn};

use super::client::Catalog;
use super::model::{ReleaseCandidate, ReleaseFile, RemoteProject};
use crate::core::identity::LoaderKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("no release of {project} for Minecraft {game_version}")]
    NoCompatibleRelease { project: String, game_version: String },

    #[error("release {version_number} of {project} has no {extension} file")]
    NoDistributableFile {
        project: String,
        version_number: String,
        extension: String,
    },
}

/// The chosen release and the file to fetch from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseMatch {
    pub release: ReleaseCandidate,
    pub file: ReleaseFile,
}

/// Fetch releases for `game_version` and select one plus its file.
///
/// Catalog errors count as "no releases".
pub async fn match_release(
    catalog: &dyn Catalog,
    project: &RemoteProject,
    game_version: &str,
    loader: Option<LoaderKind>,
    extension: &str,
) -> Result<ReleaseMatch, MatchError> {
    // The loader filter is applied locally so it can fall back.
    let releases = catalog
        .list_releases(&project.project_id, game_version, None)
        .await
        .unwrap_or_else(|e| {
            warn!("Listing releases of {} failed: {}", project.slug, e);
            Vec::new()
        });

    let release = select_release(releases, game_version, loader).ok_or_else(|| {
        MatchError::NoCompatibleRelease {
            project: project.slug.clone(),
            game_version: game_version.to_string(),
        }
    })?;

    let file = select_file(&release, extension).ok_or_else(|| MatchError::NoDistributableFile {
        project: project.slug.clone(),
        version_number: release.version_number.clone(),
        extension: extension.to_string(),
    })?;

    debug!(
        "{}: picked {} ({})",
        project.slug, release.version_number, file.filename
    );
    Ok(ReleaseMatch { release, file })
}

/// Newest release tagged with `game_version`, preferring `loader` when any
/// release claims it. Equal timestamps keep catalog order.
pub fn select_release(
    releases: Vec<ReleaseCandidate>,
    game_version: &str,
    loader: Option<LoaderKind>,
) -> Option<ReleaseCandidate> {
    let compatible: Vec<ReleaseCandidate> = releases
        .into_iter()
        .filter(|r| r.supports_game_version(game_version))
        .collect();

    // Loader tags in the catalog are not always accurate, so an empty filter
    // result falls back to every compatible release.
    let candidates = match loader.filter(LoaderKind::is_known) {
        Some(loader) if compatible.iter().any(|r| r.supports_loader(loader)) => compatible
            .into_iter()
            .filter(|r| r.supports_loader(loader))
            .collect(),
        Some(loader) => {
            debug!("No release claims {}, ignoring loader preference", loader);
            compatible
        }
        None => compatible,
    };

    candidates
        .into_iter()
        .reduce(|best, next| if next.published_at > best.published_at { next } else { best })
}

/// The primary-flagged file, else the first file ending in `extension`.
pub fn select_file(release: &ReleaseCandidate, extension: &str) -> Option<ReleaseFile> {
    let wanted = extension.to_ascii_lowercase();
    release
        .files
        .iter()
        .find(|f| f.is_primary)
        .or_else(|| {
            release
                .files
                .iter()
                .find(|f| f.filename.to_ascii_lowercase().ends_with(&wanted))
        })
        .cloned()
}
