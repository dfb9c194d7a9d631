use serde::Serialize;

use super::model::{LoaderKind, LocalModIdentity, SourceConfidence};

/// Summary of a scanned mod folder, used to suggest batch defaults.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct LibraryAnalysis {
    pub total: usize,
    pub from_descriptor: usize,
    pub from_filename: usize,
    /// Most common game version; ties go to the first one seen.
    pub dominant_game_version: Option<String>,
    /// Most common known loader; ties go to the first one seen.
    pub dominant_loader: Option<LoaderKind>,
}

impl LibraryAnalysis {
    pub fn from_identities(identities: &[LocalModIdentity]) -> Self {
        let versions = identities.iter().filter_map(|i| i.minecraft_version.clone());
        let loaders = identities
            .iter()
            .map(|i| i.loader_kind)
            .filter(LoaderKind::is_known);

        Self {
            total: identities.len(),
            from_descriptor: count_confidence(identities, SourceConfidence::Descriptor),
            from_filename: count_confidence(identities, SourceConfidence::FilenameHeuristic),
            dominant_game_version: most_common(versions),
            dominant_loader: most_common(loaders),
        }
    }
}

fn count_confidence(identities: &[LocalModIdentity], confidence: SourceConfidence) -> usize {
    identities
        .iter()
        .filter(|i| i.source_confidence == confidence)
        .count()
}

fn most_common<T: PartialEq>(values: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        if best.as_ref().map_or(true, |(_, top)| count > *top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}
