pub mod analysis;
pub mod descriptor;
pub mod filename;
pub mod model;
pub mod source;

pub use analysis::LibraryAnalysis;
pub use model::{LoaderKind, LocalModIdentity, RawArchive, SourceConfidence};
pub use source::collect_archives;

use tracing::{debug, warn};

use crate::core::error::{ModsyncError, ModsyncResult};

/// Identify a mod from archive bytes: descriptor first, filename heuristics
/// as the fallback for every soft extraction error.
pub fn identify_bytes(filename: &str, bytes: &[u8]) -> LocalModIdentity {
    match descriptor::read_descriptor(filename, bytes) {
        Ok(mut identity) => {
            if identity.minecraft_version.is_none() {
                identity.minecraft_version = filename::game_version_token(filename);
            }
            identity
        }
        Err(ModsyncError::NoDescriptorFound) => {
            debug!("No descriptor in {}, using filename heuristics", filename);
            filename::parse_filename(filename)
        }
        Err(e) if e.is_soft_extraction_error() => {
            if let ModsyncError::DescriptorParse { raw, .. } = &e {
                debug!("Unparsable descriptor text in {}: {:?}", filename, raw);
            }
            warn!("{}: {}; using filename heuristics", filename, e);
            filename::parse_filename(filename)
        }
        Err(e) => {
            warn!("{}: unexpected error while reading descriptor: {}", filename, e);
            filename::parse_filename(filename)
        }
    }
}

/// Consume a [`RawArchive`] and produce its identity.
///
/// Zip parsing runs on the blocking pool. Only a failed blocking task is
/// reported as an error; everything else degrades to filename heuristics.
pub async fn extract_identity(archive: RawArchive) -> ModsyncResult<LocalModIdentity> {
    let filename = archive.filename.clone();

    let bytes = match archive.into_bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Could not read {}: {}; using filename heuristics", filename, e);
            return Ok(filename::parse_filename(&filename));
        }
    };

    tokio::task::spawn_blocking(move || identify_bytes(&filename, &bytes))
        .await
        .map_err(|e| ModsyncError::Other(format!("archive inspection task failed: {e}")))
}
