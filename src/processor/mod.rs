// Processor module - session-level analytics and re-scoring
//
// - orchestrator: runs detection and metrics over every logical channel
// - recalculate: re-grades stored contractions against new parameters

pub mod orchestrator;
pub mod recalculate;

pub use orchestrator::{ChannelAnalyticsOrchestrator, SessionAnalytics};
pub use recalculate::ScoreRecalculator;
