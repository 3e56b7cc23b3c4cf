// EMG Analytics Core
// Contraction detection, amplitude/spectral metrics and effort scoring for
// multi-channel EMG sessions

// Module declarations
pub mod analysis;
pub mod channels;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod models;
pub mod processor;
pub mod session;

// Re-exports for convenience
pub use channels::{Channel, ChannelSet, SignalVariant};
pub use config::AppConfig;
pub use error::{AnalysisError, ErrorCode};
pub use models::{AnalysisReport, ChannelAnalytics, ChannelView, ContractionEvent, GoodFlag};
pub use processor::{ChannelAnalyticsOrchestrator, ScoreRecalculator, SessionAnalytics};
pub use session::SessionParameters;
