use async_trait::async_trait;

use super::model::{GameVersionTag, ReleaseCandidate, RemoteProject, SearchPage, SearchQuery};
use crate::core::error::ModsyncResult;
use crate::core::identity::LoaderKind;

/// The remote mod registry, as consumed by the resolver and matcher.
///
/// Transport failures surface as errors here; callers in the update
/// pipeline treat them the same as an empty or not-found answer.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Direct lookup by project id or slug. `Ok(None)` means not found.
    async fn lookup_project(&self, id: &str) -> ModsyncResult<Option<RemoteProject>>;

    /// Ranked text search.
    async fn search_projects(&self, query: &SearchQuery) -> ModsyncResult<SearchPage>;

    /// Releases of a project tagged with `game_version`, newest first as the
    /// catalog orders them. `loader` narrows the request server-side.
    async fn list_releases(
        &self,
        project_id: &str,
        game_version: &str,
        loader: Option<LoaderKind>,
    ) -> ModsyncResult<Vec<ReleaseCandidate>>;

    /// All game version tags known to the catalog.
    async fn list_game_versions(&self) -> ModsyncResult<Vec<GameVersionTag>>;
}
