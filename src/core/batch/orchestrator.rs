// ─── Batch Orchestrator ───
// Drives every item through extraction → resolution → matching → download,
// one item at a time, in input order.
//
// Guarantees:
//   - a failing item never aborts the batch
//   - a pause of `BatchContext::pacing` follows every download attempt
//   - cancellation is honoured at every await point; finished items keep
//     their status, unfinished ones stay `Pending`

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::plan::{PlanFailure, PlanStatus, UpdatePlan};
use crate::core::catalog::{match_release, resolve_project, Catalog, RemoteProject};
use crate::core::downloader::DownloadTrigger;
use crate::core::identity::{extract_identity, filename, LoaderKind, RawArchive};

/// Default pause after each download trigger.
pub const DEFAULT_PACING: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Resolve, match and download.
    Download,
    /// Stop at `Resolved`; nothing is downloaded.
    CheckOnly,
}

/// Per-run settings handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub game_version: String,
    /// Soft loader preference for the whole batch.
    pub loader: Option<LoaderKind>,
    pub mode: BatchMode,
    pub pacing: Duration,
    /// Expected extension of distributable files, e.g. `.jar`.
    pub extension: String,
}

impl BatchContext {
    pub fn new(game_version: impl Into<String>) -> Self {
        Self {
            game_version: game_version.into(),
            loader: None,
            mode: BatchMode::Download,
            pacing: DEFAULT_PACING,
            extension: ".jar".to_string(),
        }
    }

    /// Batch-wide loader, else the loader the mod itself was built for.
    fn loader_for(&self, plan: &UpdatePlan) -> Option<LoaderKind> {
        self.loader
            .or_else(|| Some(plan.identity.loader_kind).filter(LoaderKind::is_known))
    }
}

/// Progress notifications, in the order things happen.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    ItemFinished {
        /// 1-based position of the item.
        index: usize,
        total: usize,
        filename: String,
        status: PlanStatus,
        reason: Option<String>,
    },
    Completed {
        summary: BatchSummary,
    },
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub resolved: usize,
    pub downloaded: usize,
    pub no_match: usize,
    pub failed: usize,
    pub pending: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn from_plans(plans: &[UpdatePlan], cancelled: bool) -> Self {
        let count = |status: PlanStatus| plans.iter().filter(|p| p.status == status).count();
        Self {
            total: plans.len(),
            resolved: count(PlanStatus::Resolved),
            downloaded: count(PlanStatus::Downloaded),
            no_match: count(PlanStatus::NoMatch),
            failed: count(PlanStatus::Failed),
            pending: count(PlanStatus::Pending),
            cancelled,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.resolved + self.downloaded
    }

    pub fn unsuccessful(&self) -> usize {
        self.no_match + self.failed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub plans: Vec<UpdatePlan>,
    pub summary: BatchSummary,
}

/// Raised internally when the cancellation token fires mid-item.
struct Interrupted;

enum WorkItem {
    Archive(RawArchive),
    Project(RemoteProject),
}

impl WorkItem {
    fn initial_plan(&self) -> UpdatePlan {
        match self {
            WorkItem::Archive(archive) => UpdatePlan::new(filename::parse_filename(&archive.filename)),
            WorkItem::Project(project) => UpdatePlan::for_project(project),
        }
    }
}

pub struct BatchOrchestrator {
    catalog: Arc<dyn Catalog>,
    trigger: Arc<dyn DownloadTrigger>,
    events: Option<UnboundedSender<BatchEvent>>,
    cancel: CancellationToken,
}

impl BatchOrchestrator {
    pub fn new(catalog: Arc<dyn Catalog>, trigger: Arc<dyn DownloadTrigger>) -> Self {
        Self {
            catalog,
            trigger,
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_events(mut self, events: UnboundedSender<BatchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Update mode: local archives in, one plan per archive out.
    pub async fn run(&self, archives: Vec<RawArchive>, ctx: &BatchContext) -> BatchReport {
        self.execute(archives.into_iter().map(WorkItem::Archive).collect(), ctx)
            .await
    }

    /// Browse mode: projects picked from search results, resolution skipped.
    pub async fn run_projects(&self, projects: Vec<RemoteProject>, ctx: &BatchContext) -> BatchReport {
        self.execute(projects.into_iter().map(WorkItem::Project).collect(), ctx)
            .await
    }

    async fn execute(&self, items: Vec<WorkItem>, ctx: &BatchContext) -> BatchReport {
        let run_id = Uuid::new_v4();
        let total = items.len();
        let mut plans: Vec<UpdatePlan> = items.iter().map(WorkItem::initial_plan).collect();
        let mut cancelled = false;

        info!(
            "Batch {} started: {} items, Minecraft {}, loader {:?}, {:?}",
            run_id, total, ctx.game_version, ctx.loader, ctx.mode
        );

        for (index, item) in items.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let plan = &mut plans[index];
            let interrupted = self.process(item, plan, ctx).await.is_err();
            // Only the pacing pause can be interrupted after a download attempt.
            let attempted = matches!(plan.status, PlanStatus::Downloaded | PlanStatus::Failed);
            if interrupted && !attempted {
                plan.reset();
            }

            if plan.status != PlanStatus::Pending {
                info!(
                    "[{}/{}] {}: {}",
                    index + 1,
                    total,
                    plan.identity.filename,
                    plan.status
                );
                self.emit(BatchEvent::ItemFinished {
                    index: index + 1,
                    total,
                    filename: plan.identity.filename.clone(),
                    status: plan.status,
                    reason: plan.reason(),
                });
            }

            if interrupted {
                cancelled = true;
                break;
            }
        }

        let summary = BatchSummary::from_plans(&plans, cancelled);
        if cancelled {
            warn!("Batch {} cancelled with {} items pending", run_id, summary.pending);
        }
        info!(
            "Batch {} finished: {} ok, {} not updated",
            run_id,
            summary.succeeded(),
            summary.unsuccessful()
        );
        self.emit(BatchEvent::Completed {
            summary: summary.clone(),
        });

        BatchReport {
            run_id,
            plans,
            summary,
        }
    }

    async fn process(&self, item: WorkItem, plan: &mut UpdatePlan, ctx: &BatchContext) -> Result<(), Interrupted> {
        let project = match item {
            WorkItem::Archive(archive) => {
                match self.guard(extract_identity(archive)).await? {
                    Ok(identity) => plan.identity = identity,
                    Err(e) => {
                        plan.fail(PlanFailure::Extraction(e.to_string()));
                        return Ok(());
                    }
                }

                match self.guard(resolve_project(&*self.catalog, &plan.identity)).await? {
                    Some(resolution) => {
                        debug!("{} -> {} ({:?})", plan.identity.filename, resolution.project.slug, resolution.kind);
                        resolution.project
                    }
                    None => {
                        let searched = plan.identity.search_text().to_string();
                        plan.fail(PlanFailure::ResolutionFailed(searched));
                        return Ok(());
                    }
                }
            }
            WorkItem::Project(project) => project,
        };

        let loader = ctx.loader_for(plan);
        let matched = self
            .guard(match_release(&*self.catalog, &project, &ctx.game_version, loader, &ctx.extension))
            .await?;

        let matched = match matched {
            Ok(matched) => matched,
            Err(e) => {
                plan.resolved_project = Some(project);
                plan.fail(e.into());
                return Ok(());
            }
        };

        let file = matched.file.clone();
        plan.resolve(project, matched.release, matched.file);

        if ctx.mode == BatchMode::CheckOnly {
            return Ok(());
        }

        match self.guard(self.trigger.trigger(&file.url, &file.filename)).await? {
            Ok(path) => plan.mark_downloaded(path),
            Err(e) => plan.fail(PlanFailure::DownloadTriggerFailed {
                filename: file.filename.clone(),
                reason: e.to_string(),
            }),
        }

        // Every attempt counts towards the interval, failed ones included.
        self.guard(tokio::time::sleep(ctx.pacing)).await?;
        Ok(())
    }

    async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted),
            out = fut => Ok(out),
        }
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::descriptor::FABRIC_DESCRIPTOR;
    use crate::core::test_support::{archive_with, project, release, FakeCatalog, RecordingTrigger};
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    fn jar(name: &str) -> RawArchive {
        RawArchive::from_bytes(name, archive_with(&[("pack.mcmeta", "{}")]))
    }

    fn sodium_catalog() -> FakeCatalog {
        FakeCatalog::default()
            .with_project(project("AANobbMI", "sodium"))
            .with_releases(
                "AANobbMI",
                vec![
                    release("old", "2023-06-01T00:00:00Z", &["fabric"], &["1.20.1"]),
                    release("new", "2023-09-19T00:00:00Z", &["fabric"], &["1.20.1"]),
                    release("legacy", "2022-08-01T00:00:00Z", &["fabric"], &["1.19.2"]),
                ],
            )
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<BatchEvent>) -> Vec<BatchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn sodium_update_downloads_newest_release_then_paces() {
        let trigger = Arc::new(RecordingTrigger::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let orchestrator = BatchOrchestrator::new(Arc::new(sodium_catalog()), trigger.clone()).with_events(tx);

        let started = Instant::now();
        let report = orchestrator
            .run(vec![jar("sodium-mc1.19.2-0.4.1.jar")], &BatchContext::new("1.20.1"))
            .await;

        assert!(started.elapsed() >= DEFAULT_PACING);
        let plan = &report.plans[0];
        assert_eq!(plan.status, PlanStatus::Downloaded);
        assert_eq!(plan.chosen_release.as_ref().unwrap().version_id, "new");
        assert_eq!(trigger.calls(), vec![("https://cdn.test/new.jar".to_string(), "new.jar".to_string())]);
        assert_eq!(report.summary.downloaded, 1);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], BatchEvent::ItemFinished { index: 1, total: 1, status: PlanStatus::Downloaded, .. }));
        assert!(matches!(events[1], BatchEvent::Completed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn one_bad_item_does_not_stop_the_batch() {
        let catalog = sodium_catalog()
            .with_project(project("gvQqBUqZ", "lithium"))
            .with_releases(
                "gvQqBUqZ",
                vec![release("lith", "2023-07-01T00:00:00Z", &["fabric"], &["1.20.1"])],
            );
        let trigger = Arc::new(RecordingTrigger::default());
        let orchestrator = BatchOrchestrator::new(Arc::new(catalog), trigger.clone());

        let broken = RawArchive::from_bytes("1234.jar", archive_with(&[(FABRIC_DESCRIPTOR, "{ oops")]));
        let report = orchestrator
            .run(
                vec![jar("sodium-mc1.19.2-0.4.1.jar"), broken, jar("lithium-fabric-0.11.2.jar")],
                &BatchContext::new("1.20.1"),
            )
            .await;

        let statuses: Vec<_> = report.plans.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![PlanStatus::Downloaded, PlanStatus::NoMatch, PlanStatus::Downloaded]
        );
        assert!(report.plans[1].reason().is_some());
        assert_eq!(report.summary.unsuccessful(), 1);
        assert_eq!(trigger.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_downloads_are_paced_even_after_a_failure() {
        let catalog = sodium_catalog()
            .with_project(project("gvQqBUqZ", "lithium"))
            .with_releases(
                "gvQqBUqZ",
                vec![release("lith", "2023-07-01T00:00:00Z", &["fabric"], &["1.20.1"])],
            );
        let trigger = Arc::new(RecordingTrigger::failing_on("new.jar"));
        let orchestrator = BatchOrchestrator::new(Arc::new(catalog), trigger.clone());

        let report = orchestrator
            .run(
                vec![jar("sodium-1.20.1.jar"), jar("lithium-1.20.1.jar"), jar("zoomify-1.20.1.jar")],
                &BatchContext::new("1.20.1"),
            )
            .await;

        let statuses: Vec<_> = report.plans.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![PlanStatus::Failed, PlanStatus::Downloaded, PlanStatus::NoMatch]
        );

        let attempts = trigger.attempt_times();
        assert_eq!(attempts.len(), 2);
        assert!(attempts[1] - attempts[0] >= DEFAULT_PACING);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_download_is_isolated() {
        let trigger = Arc::new(RecordingTrigger::failing_on("new.jar"));
        let orchestrator = BatchOrchestrator::new(Arc::new(sodium_catalog()), trigger);

        let report = orchestrator
            .run(vec![jar("sodium-1.20.1.jar")], &BatchContext::new("1.20.1"))
            .await;

        assert_eq!(report.plans[0].status, PlanStatus::Failed);
        assert!(matches!(
            report.plans[0].failure,
            Some(PlanFailure::DownloadTriggerFailed { .. })
        ));
    }

    #[tokio::test]
    async fn check_only_stops_at_resolved() {
        let trigger = Arc::new(RecordingTrigger::default());
        let orchestrator = BatchOrchestrator::new(Arc::new(sodium_catalog()), trigger.clone());
        let mut ctx = BatchContext::new("1.20.1");
        ctx.mode = BatchMode::CheckOnly;

        let report = orchestrator.run(vec![jar("sodium.jar")], &ctx).await;
        assert_eq!(report.plans[0].status, PlanStatus::Resolved);
        assert!(trigger.calls().is_empty());
        assert_eq!(report.summary.resolved, 1);
    }

    #[tokio::test]
    async fn no_release_for_target_is_no_match() {
        let orchestrator = BatchOrchestrator::new(Arc::new(sodium_catalog()), Arc::new(RecordingTrigger::default()));
        let report = orchestrator.run(vec![jar("sodium.jar")], &BatchContext::new("1.16.5")).await;

        let plan = &report.plans[0];
        assert_eq!(plan.status, PlanStatus::NoMatch);
        assert_eq!(plan.resolved_project.as_ref().unwrap().slug, "sodium");
    }

    #[tokio::test(start_paused = true)]
    async fn browse_selection_skips_resolution() {
        let trigger = Arc::new(RecordingTrigger::default());
        let catalog = Arc::new(sodium_catalog());
        let orchestrator = BatchOrchestrator::new(catalog.clone(), trigger.clone());

        let report = orchestrator
            .run_projects(vec![project("AANobbMI", "sodium")], &BatchContext::new("1.20.1"))
            .await;

        assert_eq!(report.plans[0].status, PlanStatus::Downloaded);
        assert_eq!(catalog.lookup_calls(), 0);
        assert_eq!(trigger.calls().len(), 1);
    }

    /// Cancels the batch as soon as the first download has been triggered.
    struct CancelAfterDownload {
        inner: RecordingTrigger,
        token: CancellationToken,
    }

    #[async_trait::async_trait]
    impl DownloadTrigger for CancelAfterDownload {
        async fn trigger(&self, url: &str, filename: &str) -> crate::core::error::ModsyncResult<std::path::PathBuf> {
            let path = self.inner.trigger(url, filename).await?;
            self.token.cancel();
            Ok(path)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_keeps_downloaded_items_and_leaves_rest_pending() {
        let token = CancellationToken::new();
        let trigger = Arc::new(CancelAfterDownload {
            inner: RecordingTrigger::default(),
            token: token.clone(),
        });
        let orchestrator =
            BatchOrchestrator::new(Arc::new(sodium_catalog()), trigger.clone()).with_cancellation(token);

        let report = orchestrator
            .run(
                vec![jar("sodium-1.20.1.jar"), jar("sodium-again.jar"), jar("sodium-third.jar")],
                &BatchContext::new("1.20.1"),
            )
            .await;

        let statuses: Vec<_> = report.plans.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![PlanStatus::Downloaded, PlanStatus::Pending, PlanStatus::Pending]
        );
        assert!(report.summary.cancelled);
        assert_eq!(report.summary.pending, 2);
        assert_eq!(trigger.inner.calls().len(), 1);
    }

    #[tokio::test]
    async fn pre_cancelled_batch_touches_nothing() {
        let trigger = Arc::new(RecordingTrigger::default());
        let orchestrator = BatchOrchestrator::new(Arc::new(sodium_catalog()), trigger.clone());
        orchestrator.cancellation_token().cancel();

        let report = orchestrator.run(vec![jar("sodium.jar")], &BatchContext::new("1.20.1")).await;
        assert_eq!(report.plans[0].status, PlanStatus::Pending);
        assert_eq!(report.plans[0].identity.display_name, "Sodium");
        assert!(report.summary.cancelled);
        assert!(trigger.calls().is_empty());
    }

    #[test]
    fn batch_loader_overrides_detected_loader() {
        let mut plan = UpdatePlan::new(filename::parse_filename("appleskin-forge-1.20.1.jar"));
        let mut ctx = BatchContext::new("1.20.1");
        assert_eq!(ctx.loader_for(&plan), Some(LoaderKind::Forge));

        ctx.loader = Some(LoaderKind::Fabric);
        assert_eq!(ctx.loader_for(&plan), Some(LoaderKind::Fabric));

        plan.identity.loader_kind = LoaderKind::Unknown;
        ctx.loader = None;
        assert_eq!(ctx.loader_for(&plan), None);
    }
}
