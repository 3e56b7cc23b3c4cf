// Analysis error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Analysis error code constants
///
/// Error code range: 3001-3005
pub struct AnalysisErrorCodes {}

impl AnalysisErrorCodes {
    /// Signal too short or too flat for a processing stage
    pub const INSUFFICIENT_DATA: i32 = 3001;

    /// No signal variant available for a channel
    pub const MISSING_SIGNAL: i32 = 3002;

    /// A metric produced NaN or infinity
    pub const NON_FINITE_METRIC: i32 = 3003;

    /// Channel created with a non-positive sampling rate
    pub const INVALID_SAMPLING_RATE: i32 = 3004;

    /// Session parameter or configuration value out of range
    pub const INVALID_PARAMETER: i32 = 3005;
}

/// Log an analysis error with structured context
///
/// Logs the error code, the component and the message. Never panics.
pub fn log_analysis_error(err: &AnalysisError, context: &str) {
    error!(
        "Analysis error in {}: code={}, component=AnalyticsEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Analysis-related errors
///
/// Only `InvalidParameter` and `InvalidSamplingRate` are ever returned
/// as `Err` from public entry points. The other variants describe per-stage
/// or per-metric failures that are recorded in a channel's error map while
/// the rest of the run continues.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Signal too short or too flat for a stage
    InsufficientData { stage: String, reason: String },

    /// No raw, activated or bare signal found for a logical channel
    MissingSignal { channel: String },

    /// Metric evaluated to NaN or infinity
    NonFiniteMetric { metric: String },

    /// Channel sampling rate must be finite and > 0
    InvalidSamplingRate { label: String, rate: f64 },

    /// Parameter out of range
    InvalidParameter { name: String, reason: String },
}

impl ErrorCode for AnalysisError {
    fn code(&self) -> i32 {
        match self {
            AnalysisError::InsufficientData { .. } => AnalysisErrorCodes::INSUFFICIENT_DATA,
            AnalysisError::MissingSignal { .. } => AnalysisErrorCodes::MISSING_SIGNAL,
            AnalysisError::NonFiniteMetric { .. } => AnalysisErrorCodes::NON_FINITE_METRIC,
            AnalysisError::InvalidSamplingRate { .. } => {
                AnalysisErrorCodes::INVALID_SAMPLING_RATE
            }
            AnalysisError::InvalidParameter { .. } => AnalysisErrorCodes::INVALID_PARAMETER,
        }
    }

    fn message(&self) -> String {
        match self {
            AnalysisError::InsufficientData { stage, reason } => {
                format!("Insufficient data for {}: {}", stage, reason)
            }
            AnalysisError::MissingSignal { channel } => {
                format!("No suitable signal found for {}", channel)
            }
            AnalysisError::NonFiniteMetric { metric } => {
                format!("Analysis failed: {} is not a finite number", metric)
            }
            AnalysisError::InvalidSamplingRate { label, rate } => {
                format!("Invalid sampling rate {} Hz for channel {}", rate, label)
            }
            AnalysisError::InvalidParameter { name, reason } => {
                format!("Invalid parameter {}: {}", name, reason)
            }
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnalysisError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AnalysisError {}
