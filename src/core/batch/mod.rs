pub mod orchestrator;
pub mod plan;

pub use orchestrator::{
    BatchContext, BatchEvent, BatchMode, BatchOrchestrator, BatchReport, BatchSummary,
    DEFAULT_PACING,
};
pub use plan::{PlanFailure, PlanStatus, UpdatePlan};
