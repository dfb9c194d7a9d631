// Fixtures shared by the unit tests: zip builders, catalog records and
// in-memory fakes for the two outbound seams.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use zip::write::SimpleFileOptions;

use crate::core::catalog::{
    Catalog, GameVersionTag, ReleaseCandidate, ReleaseFile, RemoteProject, SearchHit, SearchPage,
    SearchQuery,
};
use crate::core::downloader::DownloadTrigger;
use crate::core::error::{ModsyncError, ModsyncResult};
use crate::core::identity::LoaderKind;

/// Zip bytes holding the given `(entry name, text)` pairs.
pub fn archive_with(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn project(id: &str, slug: &str) -> RemoteProject {
    RemoteProject {
        project_id: id.to_string(),
        slug: slug.to_string(),
        title: slug.to_string(),
        icon_url: None,
    }
}

pub fn file(name: &str, primary: bool) -> ReleaseFile {
    ReleaseFile {
        filename: name.to_string(),
        url: format!("https://cdn.test/{name}"),
        is_primary: primary,
    }
}

/// Release with a single primary `<id>.jar` file.
pub fn release(id: &str, published: &str, loaders: &[&str], versions: &[&str]) -> ReleaseCandidate {
    ReleaseCandidate {
        version_id: id.to_string(),
        version_number: format!("{id}-version"),
        published_at: DateTime::parse_from_rfc3339(published)
            .unwrap()
            .with_timezone(&Utc),
        supported_loaders: loaders.iter().map(|l| LoaderKind::from_tag(l)).collect(),
        game_versions: versions.iter().map(|v| v.to_string()).collect(),
        files: vec![file(&format!("{id}.jar"), true)],
    }
}

fn hit(project: RemoteProject) -> SearchHit {
    SearchHit {
        project,
        description: String::new(),
        downloads: 0,
        categories: Vec::new(),
    }
}

// ── Catalog ─────────────────────────────────────────────

/// In-memory catalog. Lookups key on lowercase id and slug; every search
/// answers with the same configured hits.
#[derive(Default)]
pub struct FakeCatalog {
    projects: HashMap<String, RemoteProject>,
    search_hits: Vec<RemoteProject>,
    releases: HashMap<String, Vec<ReleaseCandidate>>,
    unavailable: bool,
    lookups: AtomicUsize,
    searches: AtomicUsize,
    last_search: Mutex<Option<String>>,
}

impl FakeCatalog {
    pub fn with_project(mut self, project: RemoteProject) -> Self {
        self.projects
            .insert(project.project_id.to_ascii_lowercase(), project.clone());
        self.projects.insert(project.slug.to_ascii_lowercase(), project);
        self
    }

    pub fn with_search_hits(mut self, hits: Vec<RemoteProject>) -> Self {
        self.search_hits = hits;
        self
    }

    pub fn with_releases(mut self, project_id: &str, releases: Vec<ReleaseCandidate>) -> Self {
        self.releases.insert(project_id.to_string(), releases);
        self
    }

    /// Every call fails as if the network were down.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn last_search_text(&self) -> Option<String> {
        self.last_search.lock().unwrap().clone()
    }

    fn check_available(&self) -> ModsyncResult<()> {
        if self.unavailable {
            return Err(ModsyncError::CatalogStatus {
                url: "https://catalog.test".to_string(),
                status: 503,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn lookup_project(&self, id: &str) -> ModsyncResult<Option<RemoteProject>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.projects.get(&id.to_ascii_lowercase()).cloned())
    }

    async fn search_projects(&self, query: &SearchQuery) -> ModsyncResult<SearchPage> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        *self.last_search.lock().unwrap() = Some(query.text.clone());
        self.check_available()?;

        let hits: Vec<SearchHit> = self.search_hits.iter().cloned().map(hit).collect();
        Ok(SearchPage {
            total_hits: hits.len() as u64,
            page: query.page,
            total_pages: u32::from(!hits.is_empty()),
            hits,
        })
    }

    async fn list_releases(
        &self,
        project_id: &str,
        _game_version: &str,
        loader: Option<LoaderKind>,
    ) -> ModsyncResult<Vec<ReleaseCandidate>> {
        self.check_available()?;
        Ok(self
            .releases
            .get(project_id)
            .into_iter()
            .flatten()
            .filter(|r| loader.is_none_or(|l| r.supports_loader(l)))
            .cloned()
            .collect())
    }

    async fn list_game_versions(&self) -> ModsyncResult<Vec<GameVersionTag>> {
        self.check_available()?;
        Ok(Vec::new())
    }
}

// ── Download trigger ────────────────────────────────────

/// Records every successful trigger call and the instant of every attempt;
/// optionally rejects one filename as if throttled.
#[derive(Default)]
pub struct RecordingTrigger {
    calls: Mutex<Vec<(String, String)>>,
    attempts: Mutex<Vec<Instant>>,
    fail_on: Option<String>,
}

impl RecordingTrigger {
    pub fn failing_on(filename: &str) -> Self {
        Self {
            fail_on: Some(filename.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownloadTrigger for RecordingTrigger {
    async fn trigger(&self, url: &str, filename: &str) -> ModsyncResult<PathBuf> {
        self.attempts.lock().unwrap().push(Instant::now());
        if self.fail_on.as_deref() == Some(filename) {
            return Err(ModsyncError::DownloadFailed {
                url: url.to_string(),
                status: 429,
            });
        }
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), filename.to_string()));
        Ok(PathBuf::from("downloads").join(filename))
    }
}

// ── Local HTTP stub ─────────────────────────────────────

/// Client that never goes through a system proxy.
pub fn local_client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}

/// Serve exactly one connection with a canned raw response. The handle
/// yields the request line that was received.
pub async fn serve_once(response: Vec<u8>) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        socket.write_all(&response).await.unwrap();
        let _ = socket.shutdown().await;

        String::from_utf8_lossy(&request)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    });

    (format!("http://{addr}"), handle)
}

/// Complete HTTP/1.1 response with a JSON body.
pub fn json_response(status: &str, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
    .into_bytes()
}
