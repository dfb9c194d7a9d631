pub mod client;
pub mod matcher;
pub mod model;
pub mod modrinth;
pub mod resolver;

pub use client::Catalog;
pub use matcher::{match_release, MatchError, ReleaseMatch};
pub use model::{
    GameVersionTag, ReleaseCandidate, ReleaseFile, RemoteProject, SearchHit, SearchPage,
    SearchQuery, SearchSort,
};
pub use modrinth::{ModrinthCatalog, MODRINTH_API_BASE};
pub use resolver::{resolve_project, Resolution, ResolutionKind};
