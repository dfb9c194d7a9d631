use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::catalog::{MatchError, ReleaseCandidate, ReleaseFile, RemoteProject};
use crate::core::identity::{LoaderKind, LocalModIdentity, SourceConfidence};

/// Lifecycle state of one batch item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Not processed yet (or interrupted by cancellation).
    Pending,
    /// Nothing in the catalog fits this mod.
    NoMatch,
    /// A release and file were chosen; nothing downloaded yet.
    Resolved,
    /// The download was triggered for the chosen file.
    Downloaded,
    /// Something broke while handling this item.
    Failed,
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStatus::Pending => write!(f, "pending"),
            PlanStatus::NoMatch => write!(f, "no match"),
            PlanStatus::Resolved => write!(f, "resolved"),
            PlanStatus::Downloaded => write!(f, "downloaded"),
            PlanStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Why an item ended in `NoMatch` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanFailure {
    #[error("could not inspect archive: {0}")]
    Extraction(String),

    #[error("no catalog project found for '{0}'")]
    ResolutionFailed(String),

    #[error(transparent)]
    NoRelease(#[from] MatchError),

    #[error("download of {filename} failed: {reason}")]
    DownloadTriggerFailed { filename: String, reason: String },
}

impl PlanFailure {
    /// Terminal status an item takes for this failure.
    pub fn status(&self) -> PlanStatus {
        match self {
            PlanFailure::ResolutionFailed(_)
            | PlanFailure::NoRelease(MatchError::NoCompatibleRelease { .. }) => PlanStatus::NoMatch,
            PlanFailure::Extraction(_)
            | PlanFailure::NoRelease(MatchError::NoDistributableFile { .. })
            | PlanFailure::DownloadTriggerFailed { .. } => PlanStatus::Failed,
        }
    }
}

// Plans are reported to presentation layers; the reason travels as text.
impl Serialize for PlanFailure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Unit of work and of reporting for one mod in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct UpdatePlan {
    pub identity: LocalModIdentity,
    pub resolved_project: Option<RemoteProject>,
    pub chosen_release: Option<ReleaseCandidate>,
    pub chosen_file: Option<ReleaseFile>,
    pub downloaded_to: Option<PathBuf>,
    pub status: PlanStatus,
    pub failure: Option<PlanFailure>,
}

impl UpdatePlan {
    pub fn new(identity: LocalModIdentity) -> Self {
        Self {
            identity,
            resolved_project: None,
            chosen_release: None,
            chosen_file: None,
            downloaded_to: None,
            status: PlanStatus::Pending,
            failure: None,
        }
    }

    /// Plan for a project picked straight from search results.
    pub fn for_project(project: &RemoteProject) -> Self {
        Self::new(LocalModIdentity {
            filename: project.slug.clone(),
            mod_id: Some(project.slug.clone()),
            display_name: project.title.clone(),
            mod_version: None,
            minecraft_version: None,
            loader_kind: LoaderKind::Unknown,
            source_confidence: SourceConfidence::None,
        })
    }

    pub fn resolve(&mut self, project: RemoteProject, release: ReleaseCandidate, file: ReleaseFile) {
        self.resolved_project = Some(project);
        self.chosen_release = Some(release);
        self.chosen_file = Some(file);
        self.failure = None;
        self.status = PlanStatus::Resolved;
    }

    pub fn mark_downloaded(&mut self, path: PathBuf) {
        self.downloaded_to = Some(path);
        self.status = PlanStatus::Downloaded;
    }

    pub fn fail(&mut self, failure: PlanFailure) {
        self.status = failure.status();
        self.failure = Some(failure);
    }

    /// Drop partial progress from an interrupted item.
    pub fn reset(&mut self) {
        self.resolved_project = None;
        self.chosen_release = None;
        self.chosen_file = None;
        self.downloaded_to = None;
        self.failure = None;
        self.status = PlanStatus::Pending;
    }

    pub fn reason(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }
}
