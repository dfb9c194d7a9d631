// ─── Catalog Records ───
// Wire shapes of the Modrinth v2 API and the read-only domain copies built from them.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::LoaderKind;

/// A published mod project, as known by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProject {
    pub project_id: String,
    pub slug: String,
    pub title: String,
    pub icon_url: Option<String>,
}

impl RemoteProject {
    /// Case-insensitive match against the slug or the project id.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.slug.eq_ignore_ascii_case(identifier) || self.project_id.eq_ignore_ascii_case(identifier)
    }
}

/// One downloadable file of a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFile {
    pub filename: String,
    pub url: String,
    #[serde(rename = "primary", default)]
    pub is_primary: bool,
}

/// A published version of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseCandidate {
    pub version_id: String,
    pub version_number: String,
    pub published_at: DateTime<Utc>,
    pub supported_loaders: BTreeSet<LoaderKind>,
    pub game_versions: Vec<String>,
    pub files: Vec<ReleaseFile>,
}

impl ReleaseCandidate {
    pub fn supports_game_version(&self, game_version: &str) -> bool {
        self.game_versions.iter().any(|v| v == game_version)
    }

    pub fn supports_loader(&self, loader: LoaderKind) -> bool {
        self.supported_loaders.contains(&loader)
    }
}

/// Game version tag from `GET /tag/game_version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameVersionTag {
    pub version: String,
    pub version_type: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Sort order accepted by the search endpoint (`index=`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSort {
    #[default]
    Relevance,
    Downloads,
    Follows,
    Newest,
    Updated,
}

impl SearchSort {
    pub fn as_index(&self) -> &'static str {
        match self {
            SearchSort::Relevance => "relevance",
            SearchSort::Downloads => "downloads",
            SearchSort::Follows => "follows",
            SearchSort::Newest => "newest",
            SearchSort::Updated => "updated",
        }
    }
}

impl std::str::FromStr for SearchSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relevance" => Ok(SearchSort::Relevance),
            "downloads" => Ok(SearchSort::Downloads),
            "follows" => Ok(SearchSort::Follows),
            "newest" => Ok(SearchSort::Newest),
            "updated" => Ok(SearchSort::Updated),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Faceted, paginated project search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub game_version: Option<String>,
    pub loader: Option<LoaderKind>,
    pub categories: Vec<String>,
    pub sort: SearchSort,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
}

impl SearchQuery {
    /// Plain text search, first page, mods only.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            game_version: None,
            loader: None,
            categories: Vec::new(),
            sort: SearchSort::Relevance,
            page: 1,
            page_size: 20,
        }
    }

    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1) * self.page_size
    }

    /// Facet groups: every inner list is OR-ed, groups are AND-ed.
    pub fn facets(&self) -> Vec<Vec<String>> {
        let mut facets = vec![vec!["project_type:mod".to_string()]];
        if let Some(version) = &self.game_version {
            facets.push(vec![format!("versions:{version}")]);
        }
        if let Some(tag) = self.loader.and_then(|l| l.as_tag()) {
            facets.push(vec![format!("categories:{tag}")]);
        }
        for category in &self.categories {
            facets.push(vec![format!("categories:{category}")]);
        }
        facets
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchPage {
    pub hits: Vec<SearchHit>,
    pub total_hits: u64,
    pub page: u32,
    pub total_pages: u32,
}

impl SearchPage {
    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}

/// A search hit: the project plus the listing details shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub project: RemoteProject,
    pub description: String,
    pub downloads: u64,
    pub categories: Vec<String>,
}

// ── Wire shapes ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectDto {
    pub id: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

impl From<ProjectDto> for RemoteProject {
    fn from(dto: ProjectDto) -> Self {
        Self {
            project_id: dto.id,
            slug: dto.slug,
            title: dto.title,
            icon_url: dto.icon_url.filter(|u| !u.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponseDto {
    pub hits: Vec<SearchHitDto>,
    #[serde(default)]
    pub total_hits: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchHitDto {
    pub project_id: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl From<SearchHitDto> for SearchHit {
    fn from(dto: SearchHitDto) -> Self {
        Self {
            project: RemoteProject {
                project_id: dto.project_id,
                slug: dto.slug,
                title: dto.title,
                icon_url: dto.icon_url.filter(|u| !u.is_empty()),
            },
            description: dto.description,
            downloads: dto.downloads,
            categories: dto.categories,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionDto {
    pub id: String,
    pub version_number: String,
    pub date_published: DateTime<Utc>,
    #[serde(default)]
    pub loaders: Vec<String>,
    #[serde(default)]
    pub game_versions: Vec<String>,
    #[serde(default)]
    pub files: Vec<ReleaseFile>,
}

impl From<VersionDto> for ReleaseCandidate {
    fn from(dto: VersionDto) -> Self {
        Self {
            version_id: dto.id,
            version_number: dto.version_number,
            published_at: dto.date_published,
            supported_loaders: dto.loaders.iter().map(|l| LoaderKind::from_tag(l)).collect(),
            game_versions: dto.game_versions,
            files: dto.files,
        }
    }
}

/// Stable release tags only, de-duplicated, newest first.
pub fn stable_game_versions(tags: &[GameVersionTag]) -> Vec<String> {
    let mut versions: Vec<String> = Vec::new();
    for tag in tags {
        if tag.version_type == "release" && !versions.contains(&tag.version) {
            versions.push(tag.version.clone());
        }
    }
    versions.sort_by(|a, b| compare_versions(b, a));
    versions
}

/// Numeric-aware comparison of dotted version strings.
pub fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    let parts = |s: &str| -> Vec<u64> {
        s.split(|c: char| !c.is_ascii_digit())
            .filter(|p| !p.is_empty())
            .map(|p| p.parse().unwrap_or(0))
            .collect()
    };
    parts(a).cmp(&parts(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_version_entry() {
        let json = r#"{
            "id": "AbCdEf12",
            "project_id": "AANobbMI",
            "version_number": "mc1.20.1-0.5.3",
            "date_published": "2023-09-19T21:17:51.000000Z",
            "loaders": ["fabric", "quilt"],
            "game_versions": ["1.20.1"],
            "files": [
                {"filename": "sodium-fabric-mc1.20.1-0.5.3.jar", "url": "https://cdn.example/sodium.jar", "primary": true, "size": 12}
            ]
        }"#;
        let dto: VersionDto = serde_json::from_str(json).unwrap();
        let release = ReleaseCandidate::from(dto);

        assert_eq!(release.version_id, "AbCdEf12");
        assert!(release.supports_loader(LoaderKind::Fabric));
        assert!(release.supports_loader(LoaderKind::Unknown));
        assert!(!release.supports_loader(LoaderKind::Forge));
        assert!(release.supports_game_version("1.20.1"));
        assert!(release.files[0].is_primary);
    }

    #[test]
    fn deserialize_search_hit() {
        let json = r#"{
            "hits": [{"project_id": "AANobbMI", "slug": "sodium", "title": "Sodium", "icon_url": "", "downloads": 42}],
            "offset": 0, "limit": 20, "total_hits": 41
        }"#;
        let dto: SearchResponseDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.total_hits, 41);
        let hit = SearchHit::from(dto.hits.into_iter().next().unwrap());
        assert_eq!(hit.project.slug, "sodium");
        assert_eq!(hit.project.icon_url, None);
    }

    #[test]
    fn identifier_match_ignores_case() {
        let project = RemoteProject {
            project_id: "AANobbMI".into(),
            slug: "sodium".into(),
            title: "Sodium".into(),
            icon_url: None,
        };
        assert!(project.matches_identifier("Sodium"));
        assert!(project.matches_identifier("aanobbmi"));
        assert!(!project.matches_identifier("lithium"));
    }

    #[test]
    fn facets_follow_query_filters() {
        let mut query = SearchQuery::text("map");
        query.game_version = Some("1.20.1".into());
        query.loader = Some(LoaderKind::Fabric);
        query.categories = vec!["utility".into()];
        query.page = 3;

        assert_eq!(query.offset(), 40);
        assert_eq!(
            query.facets(),
            vec![
                vec!["project_type:mod".to_string()],
                vec!["versions:1.20.1".to_string()],
                vec!["categories:fabric".to_string()],
                vec!["categories:utility".to_string()],
            ]
        );
    }

    #[test]
    fn stable_versions_are_sorted_numerically() {
        let tag = |v: &str, t: &str| GameVersionTag {
            version: v.into(),
            version_type: t.into(),
            date: None,
        };
        let tags = vec![
            tag("1.9", "release"),
            tag("1.20.1", "release"),
            tag("23w31a", "snapshot"),
            tag("1.20.1", "release"),
            tag("1.10.2", "release"),
        ];
        assert_eq!(stable_game_versions(&tags), vec!["1.20.1", "1.10.2", "1.9"]);
    }
}
