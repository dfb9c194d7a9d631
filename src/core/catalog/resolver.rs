use tracing::{debug, warn};

use super::client::Catalog;
use super::model::{RemoteProject, SearchQuery};
use crate::core::identity::LocalModIdentity;

/// How a project was picked for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    /// Direct lookup by the identity's `mod_id`.
    Lookup,
    /// Top search hit whose slug or id equals the descriptor's `mod_id`.
    ExactSearch,
    /// Top search hit accepted without an exact identifier to check against.
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub project: RemoteProject,
    pub kind: ResolutionKind,
}

/// Map a local identity to zero or one catalog project.
///
/// Never fails: catalog errors and empty results both yield `None`.
pub async fn resolve_project(catalog: &dyn Catalog, identity: &LocalModIdentity) -> Option<Resolution> {
    if let Some(mod_id) = identity.mod_id.as_deref() {
        match catalog.lookup_project(mod_id).await {
            Ok(Some(project)) => {
                debug!("{}: direct lookup hit {}", identity.filename, project.slug);
                return Some(Resolution {
                    project,
                    kind: ResolutionKind::Lookup,
                });
            }
            Ok(None) => debug!("{}: '{}' not found, searching", identity.filename, mod_id),
            Err(e) => warn!("{}: lookup of '{}' failed: {}", identity.filename, mod_id, e),
        }
    }

    let query = SearchQuery::text(identity.search_text());
    let page = match catalog.search_projects(&query).await {
        Ok(page) => page,
        Err(e) => {
            warn!("{}: search for '{}' failed: {}", identity.filename, query.text, e);
            return None;
        }
    };

    let top = page.hits.into_iter().next()?.project;

    match identity.exact_identifier() {
        Some(exact) if top.matches_identifier(exact) => Some(Resolution {
            project: top,
            kind: ResolutionKind::ExactSearch,
        }),
        Some(exact) => {
            debug!(
                "{}: top hit '{}' does not match '{}'",
                identity.filename, top.slug, exact
            );
            None
        }
        None => Some(Resolution {
            project: top,
            kind: ResolutionKind::BestEffort,
        }),
    }
}
