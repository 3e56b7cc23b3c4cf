// Error types for the EMG analytics engine
//
// This module defines the custom error type for analysis operations,
// providing structured error handling with numeric codes so callers
// (API layer, persistence, CLI) can react without string matching.

mod analysis;

pub use analysis::{log_analysis_error, AnalysisError, AnalysisErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
