//! Delve Research - recursive deep-research engine
//!
//! A topic is expanded into search queries, each query's results are
//! distilled into learnings and follow-up questions, and the follow-ups
//! drive further rounds until the breadth/depth budget runs out. The
//! accumulated learnings are then written up as a Markdown report.

pub mod budget;
pub mod distiller;
pub mod engine;
pub mod feedback;
pub mod orchestrator;
pub mod output;
pub mod planner;
pub mod prompts;
pub mod search;
pub mod synthesizer;

pub use budget::ContextBudgeter;
pub use distiller::{ContentDistiller, DistillLimits};
pub use engine::{ResearchBudget, ResearchEngine};
pub use feedback::FeedbackGenerator;
pub use orchestrator::{child_breadth, OrchestratorLimits, ResearchOrchestrator};
pub use output::{parse_structured, retry_once, ModelOutput};
pub use planner::QueryPlanner;
pub use search::SearchExecutor;
pub use synthesizer::ReportComposer;
