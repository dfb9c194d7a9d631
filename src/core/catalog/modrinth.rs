// ─── Modrinth Catalog ───
// HTTP implementation of `Catalog` against the Modrinth v2 REST API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::client::Catalog;
use super::model::{
    GameVersionTag, ProjectDto, ReleaseCandidate, RemoteProject, SearchHit, SearchPage,
    SearchQuery, SearchResponseDto, VersionDto,
};
use crate::core::error::{ModsyncError, ModsyncResult};
use crate::core::identity::LoaderKind;

pub const MODRINTH_API_BASE: &str = "https://api.modrinth.com/v2";

pub struct ModrinthCatalog {
    client: Client,
    base_url: Url,
}

impl ModrinthCatalog {
    pub fn new(client: Client, base_url: &str) -> ModsyncResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ModsyncError::Config(format!("invalid catalog URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ModsyncError::Config(format!("catalog URL {base_url} cannot be a base")));
        }
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ModsyncResult<Option<T>> {
        debug!("GET {}", url);
        let resp = self.client.get(url.clone()).send().await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ModsyncError::CatalogStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(Some(resp.json::<T>().await?))
    }
}

#[async_trait]
impl Catalog for ModrinthCatalog {
    async fn lookup_project(&self, id: &str) -> ModsyncResult<Option<RemoteProject>> {
        let url = self.endpoint(&["project", id]);
        let project = self.get_json::<ProjectDto>(url).await?;
        Ok(project.map(RemoteProject::from))
    }

    async fn search_projects(&self, query: &SearchQuery) -> ModsyncResult<SearchPage> {
        let mut url = self.endpoint(&["search"]);
        {
            let mut params = url.query_pairs_mut();
            if !query.text.is_empty() {
                params.append_pair("query", &query.text);
            }
            params
                .append_pair("limit", &query.page_size.to_string())
                .append_pair("offset", &query.offset().to_string())
                .append_pair("index", query.sort.as_index())
                .append_pair("facets", &serde_json::to_string(&query.facets())?);
        }

        let response = self
            .get_json::<SearchResponseDto>(url)
            .await?
            .unwrap_or(SearchResponseDto {
                hits: Vec::new(),
                total_hits: 0,
            });

        let page_size = u64::from(query.page_size.max(1));
        let total_pages = u32::try_from(response.total_hits.div_ceil(page_size)).unwrap_or(u32::MAX);

        Ok(SearchPage {
            hits: response.hits.into_iter().map(SearchHit::from).collect(),
            total_hits: response.total_hits,
            page: query.page,
            total_pages,
        })
    }

    async fn list_releases(
        &self,
        project_id: &str,
        game_version: &str,
        loader: Option<LoaderKind>,
    ) -> ModsyncResult<Vec<ReleaseCandidate>> {
        let mut url = self.endpoint(&["project", project_id, "version"]);
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("game_versions", &serde_json::to_string(&[game_version])?);
            if let Some(tag) = loader.and_then(|l| l.as_tag()) {
                params.append_pair("loaders", &serde_json::to_string(&[tag])?);
            }
        }

        let versions = self.get_json::<Vec<VersionDto>>(url).await?.unwrap_or_default();
        debug!("{} releases of {} for {}", versions.len(), project_id, game_version);
        Ok(versions.into_iter().map(ReleaseCandidate::from).collect())
    }

    async fn list_game_versions(&self) -> ModsyncResult<Vec<GameVersionTag>> {
        info!("Fetching game version tags...");
        let url = self.endpoint(&["tag", "game_version"]);
        let tags = self.get_json::<Vec<GameVersionTag>>(url).await?.unwrap_or_default();
        info!("Loaded {} game version tags", tags.len());
        Ok(tags)
    }
}
