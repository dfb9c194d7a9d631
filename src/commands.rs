use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core::batch::{
    BatchContext, BatchEvent, BatchMode, BatchOrchestrator, BatchReport, PlanStatus,
};
use crate::core::catalog::model::stable_game_versions;
use crate::core::catalog::{Catalog, ModrinthCatalog, RemoteProject, SearchQuery, SearchSort};
use crate::core::downloader::Downloader;
use crate::core::error::{ModsyncError, ModsyncResult};
use crate::core::http::build_http_client;
use crate::core::identity::{collect_archives, extract_identity, LibraryAnalysis, LoaderKind};
use crate::core::state::{settings_path, Settings};

#[derive(Parser)]
#[command(name = "modsync")]
#[command(version)]
#[command(about = "Identify local Minecraft mods and fetch matching releases for another game version")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Catalog API base URL
    #[arg(long, global = true, env = "MODSYNC_CATALOG_URL")]
    pub catalog_url: Option<String>,

    /// Pause after each download, in milliseconds
    #[arg(long, global = true)]
    pub pacing_ms: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify local mods and download their releases for a target version
    Update {
        /// Mod archives or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        target: TargetArgs,

        /// Directory downloads are written to
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Like `update`, but only report what would be downloaded
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Summarize a mod folder: identities, dominant game version and loader
    Analyze {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Search the catalog for mods
    Search {
        /// Search text
        query: Vec<String>,

        /// Only mods available for this game version
        #[arg(short, long)]
        game_version: Option<String>,

        #[arg(short, long)]
        loader: Option<LoaderKind>,

        /// Extra category filter, repeatable
        #[arg(short, long = "category")]
        categories: Vec<String>,

        /// relevance, downloads, follows, newest or updated
        #[arg(short, long, default_value = "relevance")]
        sort: SearchSort,

        /// 1-based result page
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// List stable game versions known to the catalog
    Versions,

    /// List releases of one project for a game version
    Releases {
        /// Project id or slug
        project: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Download the best release of the given projects for a game version
    Download {
        /// Project ids or slugs
        #[arg(required = true)]
        projects: Vec<String>,

        #[command(flatten)]
        target: TargetArgs,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show or save settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective settings and where they are stored
    Show,
    /// Write the effective settings (including flag overrides) to disk
    Save,
}

#[derive(Args)]
pub struct TargetArgs {
    /// Target Minecraft version, e.g. 1.20.1
    #[arg(short, long)]
    pub game_version: String,

    /// Preferred loader (fabric or forge); falls back to any loader
    #[arg(short, long)]
    pub loader: Option<LoaderKind>,
}

/// Shared handles for one invocation.
struct App {
    settings: Settings,
    client: Client,
    catalog: Arc<ModrinthCatalog>,
    json: bool,
}

impl App {
    fn new(cli: &Cli) -> ModsyncResult<Self> {
        let mut settings = Settings::load();
        apply_overrides(&mut settings, cli);
        Self::from_settings(settings, cli.json)
    }

    fn from_settings(settings: Settings, json: bool) -> ModsyncResult<Self> {
        let client = build_http_client(&settings.user_agent)?;
        let catalog = Arc::new(ModrinthCatalog::new(client.clone(), &settings.catalog_url)?);

        Ok(Self {
            settings,
            client,
            catalog,
            json,
        })
    }

    fn batch_context(&self, target: &TargetArgs, mode: BatchMode) -> BatchContext {
        BatchContext {
            game_version: target.game_version.clone(),
            loader: target.loader,
            mode,
            pacing: self.settings.pacing(),
            extension: self.settings.archive_extension.clone(),
        }
    }

    /// Orchestrator wired to the downloader, a progress printer and Ctrl-C.
    fn orchestrator(&self, out: Option<PathBuf>) -> (BatchOrchestrator, JoinHandle<()>) {
        let dest = out.unwrap_or_else(|| self.settings.resolved_download_dir());
        let downloader = Arc::new(Downloader::new(self.client.clone(), dest));
        info!("Downloads go to {}", downloader.dest_dir().display());

        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = BatchOrchestrator::new(self.catalog.clone(), downloader).with_events(tx);

        let token = orchestrator.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling batch");
                token.cancel();
            }
        });

        let printer = tokio::spawn(print_events(rx, self.json));
        (orchestrator, printer)
    }
}

/// Command-line flags win over the settings file.
fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(url) = &cli.catalog_url {
        settings.catalog_url = url.clone();
    }
    if let Some(pacing) = cli.pacing_ms {
        settings.pacing_ms = pacing;
    }
}

pub async fn execute(cli: Cli) -> ModsyncResult<()> {
    let app = App::new(&cli)?;

    match cli.command {
        Commands::Update { paths, target, out } => {
            update(&app, &paths, &target, BatchMode::Download, out).await
        }
        Commands::Check { paths, target } => update(&app, &paths, &target, BatchMode::CheckOnly, None).await,
        Commands::Analyze { paths } => analyze(&app, &paths).await,
        Commands::Search {
            query,
            game_version,
            loader,
            categories,
            sort,
            page,
        } => {
            let query = SearchQuery {
                text: query.join(" "),
                game_version,
                loader,
                categories,
                sort,
                page: page.max(1),
                page_size: app.settings.page_size,
            };
            search(&app, &query).await
        }
        Commands::Versions => versions(&app).await,
        Commands::Releases { project, target } => releases(&app, &project, &target).await,
        Commands::Download {
            projects,
            target,
            out,
        } => download(&app, &projects, &target, out).await,
        Commands::Config { action } => config(&app, action),
    }
}

// ── Batch commands ──────────────────────────────────────

async fn update(
    app: &App,
    paths: &[PathBuf],
    target: &TargetArgs,
    mode: BatchMode,
    out: Option<PathBuf>,
) -> ModsyncResult<()> {
    let archives = collect_archives(paths, &app.settings.archive_extension).await?;
    if archives.is_empty() {
        println!("No {} files found", app.settings.archive_extension);
        return Ok(());
    }

    let ctx = app.batch_context(target, mode);
    let (orchestrator, printer) = app.orchestrator(out);
    let report = orchestrator.run(archives, &ctx).await;
    finish(app, orchestrator, printer, &report).await
}

async fn download(app: &App, ids: &[String], target: &TargetArgs, out: Option<PathBuf>) -> ModsyncResult<()> {
    let mut projects = Vec::with_capacity(ids.len());
    for id in ids {
        match app.catalog.lookup_project(id).await? {
            Some(project) => projects.push(project),
            None => warn!("Project '{}' not found, skipping", id),
        }
    }
    if projects.is_empty() {
        return Err(ModsyncError::Other("none of the given projects exist".to_string()));
    }

    let ctx = app.batch_context(target, BatchMode::Download);
    let (orchestrator, printer) = app.orchestrator(out);
    let report = orchestrator.run_projects(projects, &ctx).await;
    finish(app, orchestrator, printer, &report).await
}

async fn finish(
    app: &App,
    orchestrator: BatchOrchestrator,
    printer: JoinHandle<()>,
    report: &BatchReport,
) -> ModsyncResult<()> {
    // Closing the event channel lets the printer drain and exit.
    drop(orchestrator);
    let _ = printer.await;

    if app.json {
        return print_json(report);
    }

    for plan in &report.plans {
        if let (Some(project), Some(release), Some(file)) =
            (&plan.resolved_project, &plan.chosen_release, &plan.chosen_file)
        {
            let target = match (&plan.status, &plan.downloaded_to) {
                (PlanStatus::Downloaded, Some(path)) => path.display().to_string(),
                _ => file.filename.clone(),
            };
            println!(
                "  {} -> {} {} ({})",
                plan.identity.filename, project.slug, release.version_number, target
            );
        }
    }
    Ok(())
}

async fn print_events(mut rx: UnboundedReceiver<BatchEvent>, quiet: bool) {
    while let Some(event) = rx.recv().await {
        if quiet {
            continue;
        }
        match event {
            BatchEvent::ItemFinished {
                index,
                total,
                filename,
                status,
                reason,
            } => match reason {
                Some(reason) => println!("[{index}/{total}] {filename}: {status} ({reason})"),
                None => println!("[{index}/{total}] {filename}: {status}"),
            },
            BatchEvent::Completed { summary } => {
                println!(
                    "\n{} downloaded, {} resolved, {} no match, {} failed, {} pending{}",
                    summary.downloaded,
                    summary.resolved,
                    summary.no_match,
                    summary.failed,
                    summary.pending,
                    if summary.cancelled { " (cancelled)" } else { "" }
                );
            }
        }
    }
}

// ── Library analysis ────────────────────────────────────

async fn analyze(app: &App, paths: &[PathBuf]) -> ModsyncResult<()> {
    let archives = collect_archives(paths, &app.settings.archive_extension).await?;

    let mut identities = Vec::with_capacity(archives.len());
    for archive in archives {
        identities.push(extract_identity(archive).await?);
    }
    let analysis = LibraryAnalysis::from_identities(&identities);
    info!("Analyzed {} archives", analysis.total);

    if app.json {
        #[derive(Serialize)]
        struct AnalyzeOutput<'a> {
            mods: &'a [crate::core::identity::LocalModIdentity],
            analysis: &'a LibraryAnalysis,
        }
        return print_json(&AnalyzeOutput {
            mods: &identities,
            analysis: &analysis,
        });
    }

    for identity in &identities {
        println!(
            "{:<48} {:<28} {:<8} {:<8} {:?}",
            identity.filename,
            identity.display_name,
            identity.minecraft_version.as_deref().unwrap_or("-"),
            identity.loader_kind.to_string(),
            identity.source_confidence
        );
    }
    println!(
        "\n{} mods ({} from descriptors, {} from filenames)",
        analysis.total, analysis.from_descriptor, analysis.from_filename
    );
    if let Some(version) = &analysis.dominant_game_version {
        println!("Mostly for Minecraft {version}");
    }
    if let Some(loader) = &analysis.dominant_loader {
        println!("Mostly {loader} mods");
    }
    Ok(())
}

// ── Catalog queries ─────────────────────────────────────

async fn search(app: &App, query: &SearchQuery) -> ModsyncResult<()> {
    let page = app.catalog.search_projects(query).await?;
    if app.json {
        return print_json(&page);
    }

    for hit in &page.hits {
        println!(
            "{:<32} {:<32} {:>10}  {}",
            hit.project.slug, hit.project.title, hit.downloads, hit.description
        );
    }
    println!(
        "\npage {}/{} ({} results){}",
        page.page,
        page.total_pages,
        page.total_hits,
        if page.has_more() { ", use --page for more" } else { "" }
    );
    Ok(())
}

async fn versions(app: &App) -> ModsyncResult<()> {
    let tags = app.catalog.list_game_versions().await?;
    let versions = stable_game_versions(&tags);
    if app.json {
        return print_json(&versions);
    }
    for version in versions {
        println!("{version}");
    }
    Ok(())
}

async fn releases(app: &App, id: &str, target: &TargetArgs) -> ModsyncResult<()> {
    let project = find_project(app, id).await?;
    let releases = app
        .catalog
        .list_releases(&project.project_id, &target.game_version, target.loader)
        .await?;

    if app.json {
        return print_json(&releases);
    }
    if releases.is_empty() {
        println!("No releases of {} for Minecraft {}", project.slug, target.game_version);
        return Ok(());
    }
    for release in &releases {
        let loaders: Vec<String> = release.supported_loaders.iter().map(ToString::to_string).collect();
        let primary = release
            .files
            .iter()
            .find(|f| f.is_primary)
            .or(release.files.first())
            .map(|f| f.filename.as_str())
            .unwrap_or("-");
        println!(
            "{:<24} {}  {:<16} {}",
            release.version_number,
            release.published_at.format("%Y-%m-%d"),
            loaders.join(","),
            primary
        );
    }
    Ok(())
}

async fn find_project(app: &App, id: &str) -> ModsyncResult<RemoteProject> {
    app.catalog
        .lookup_project(id)
        .await?
        .ok_or_else(|| ModsyncError::Other(format!("project '{id}' not found")))
}

// ── Settings ────────────────────────────────────────────

fn config(app: &App, action: ConfigAction) -> ModsyncResult<()> {
    match action {
        ConfigAction::Show => {
            println!("# {}", settings_path().display());
            print_json(&app.settings)
        }
        ConfigAction::Save => {
            let path = app.settings.save()?;
            println!("Settings written to {}", path.display());
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> ModsyncResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
