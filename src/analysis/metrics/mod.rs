// Metrics module - per-channel signal metrics and their registry
//
// This module provides:
// 1. amplitude: RMS and MAV of the raw signal
// 2. psd: Welch power spectrum estimation
// 3. spectral: MPF, MDF and the FI_nsm5 fatigue index
// 4. MetricRegistry: an ordered id -> calculator table the orchestrator runs
//    over every channel. Spectral calculators share one lazily computed
//    spectrum through SignalContext.

pub mod amplitude;
pub mod psd;
pub mod spectral;

use once_cell::unsync::OnceCell;
use std::fmt;
use std::sync::Arc;

use crate::config::SpectralConfig;
use crate::error::AnalysisError;

pub use amplitude::{mav, rms};
pub use psd::{PowerSpectrum, SpectralEstimator};
pub use spectral::{
    fatigue_index, fatigue_index_fi_nsm5, mdf, mean_power_frequency, median_frequency, mpf,
};

pub const METRIC_RMS: &str = "rms";
pub const METRIC_MAV: &str = "mav";
pub const METRIC_MPF: &str = "mpf";
pub const METRIC_MDF: &str = "mdf";
pub const METRIC_FATIGUE_INDEX: &str = "fatigue_index_fi_nsm5";

/// Signature of a registered metric calculator
///
/// `Ok(None)` means the metric is undefined for this signal.
pub type MetricFn =
    Arc<dyn Fn(&SignalContext<'_>) -> Result<Option<f64>, AnalysisError> + Send + Sync>;

/// Input handed to every metric calculator
pub struct SignalContext<'a> {
    samples: &'a [f64],
    sampling_rate: f64,
    estimator: &'a SpectralEstimator,
    spectrum: OnceCell<Option<PowerSpectrum>>,
}

impl<'a> SignalContext<'a> {
    pub fn new(samples: &'a [f64], sampling_rate: f64, estimator: &'a SpectralEstimator) -> Self {
        Self {
            samples,
            sampling_rate,
            estimator,
            spectrum: OnceCell::new(),
        }
    }

    pub fn samples(&self) -> &'a [f64] {
        self.samples
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Power spectrum of the signal, computed on first use
    pub fn spectrum(&self) -> Option<&PowerSpectrum> {
        self.spectrum
            .get_or_init(|| self.estimator.estimate(self.samples, self.sampling_rate))
            .as_ref()
    }
}

/// Result of one registered metric
#[derive(Debug, Clone, PartialEq)]
pub struct MetricOutcome {
    pub id: String,
    pub result: Result<Option<f64>, AnalysisError>,
}

/// Ordered table of metric calculators
#[derive(Clone)]
pub struct MetricRegistry {
    entries: Vec<(String, MetricFn)>,
    estimator: Arc<SpectralEstimator>,
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("ids", &self.ids())
            .field("spectral", self.estimator.config())
            .finish()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::standard(SpectralConfig::default())
    }
}

impl MetricRegistry {
    /// Registry with no metrics
    pub fn empty(config: SpectralConfig) -> Self {
        Self {
            entries: Vec::new(),
            estimator: Arc::new(SpectralEstimator::new(config)),
        }
    }

    /// Registry with rms, mav, mpf, mdf and fatigue_index_fi_nsm5
    pub fn standard(config: SpectralConfig) -> Self {
        let mut registry = Self::empty(config);
        registry.register(METRIC_RMS, |ctx: &SignalContext<'_>| {
            Ok(Some(rms(ctx.samples())))
        });
        registry.register(METRIC_MAV, |ctx: &SignalContext<'_>| {
            Ok(Some(mav(ctx.samples())))
        });
        registry.register(METRIC_MPF, |ctx: &SignalContext<'_>| {
            Ok(ctx.spectrum().and_then(mean_power_frequency))
        });
        registry.register(METRIC_MDF, |ctx: &SignalContext<'_>| {
            Ok(ctx.spectrum().and_then(median_frequency))
        });
        registry.register(METRIC_FATIGUE_INDEX, |ctx: &SignalContext<'_>| {
            Ok(ctx.spectrum().and_then(fatigue_index_fi_nsm5))
        });
        registry
    }

    /// Add a metric, replacing an existing entry with the same id in place
    pub fn register<F>(&mut self, id: impl Into<String>, metric: F)
    where
        F: Fn(&SignalContext<'_>) -> Result<Option<f64>, AnalysisError> + Send + Sync + 'static,
    {
        let id = id.into();
        let metric: MetricFn = Arc::new(metric);
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = metric,
            None => self.entries.push((id, metric)),
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn estimator(&self) -> &SpectralEstimator {
        &self.estimator
    }

    /// Run every metric over one signal
    ///
    /// Each metric is evaluated on its own; a failure or non-finite value is
    /// reported in its outcome and does not affect the others.
    pub fn evaluate(&self, samples: &[f64], sampling_rate: f64) -> Vec<MetricOutcome> {
        let ctx = SignalContext::new(samples, sampling_rate, &self.estimator);
        self.entries
            .iter()
            .map(|(id, metric)| {
                let result = match metric(&ctx) {
                    Ok(Some(value)) if !value.is_finite() => Err(AnalysisError::NonFiniteMetric {
                        metric: id.clone(),
                    }),
                    other => other,
                };
                MetricOutcome {
                    id: id.clone(),
                    result,
                }
            })
            .collect()
    }
}
