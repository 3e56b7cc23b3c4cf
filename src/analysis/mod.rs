// Analysis module - DSP stages applied to a single channel
//
// Pipeline per channel:
// - conditioning: rectification and moving-average envelope
// - contraction: threshold-based burst detection on the envelope
// - metrics: amplitude and spectral metrics of the raw signal
//
// Cross-channel work (threshold resolution, fallbacks, self-calibration)
// lives in the processor module.

pub mod conditioning;
pub mod contraction;
pub mod metrics;

pub use conditioning::{condition, moving_average_same, rectify, ConditionedSignal};
pub use contraction::{ContractionDetector, ContractionSummary};
pub use metrics::{MetricOutcome, MetricRegistry, PowerSpectrum, SignalContext, SpectralEstimator};
