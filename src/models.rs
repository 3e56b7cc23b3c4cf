//! Result records produced by the analytics engine.
//!
//! Everything here is plain serde data handed to the persistence/report
//! collaborator. Nullable metrics serialize as explicit `null` so consumers
//! can tell "not computed" from "absent".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::channels::{ChannelSet, SignalVariant, ACTIVATED_SUFFIX, RAW_SUFFIX};
use crate::session::params::SessionParameters;
use crate::session::threshold::ThresholdTier;

/// Whether a contraction reached the effort threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GoodFlag {
    /// No threshold was resolved, the event was never evaluated
    #[default]
    Undetermined,
    Good,
    NotGood,
}

impl GoodFlag {
    /// Grade a peak amplitude against an optional threshold (inclusive)
    pub fn grade(max_amplitude: f64, threshold: Option<f64>) -> Self {
        match threshold {
            Some(t) if max_amplitude >= t => GoodFlag::Good,
            Some(_) => GoodFlag::NotGood,
            None => GoodFlag::Undetermined,
        }
    }

    pub fn is_good(self) -> bool {
        self == GoodFlag::Good
    }

    pub fn as_option(self) -> Option<bool> {
        match self {
            GoodFlag::Undetermined => None,
            GoodFlag::Good => Some(true),
            GoodFlag::NotGood => Some(false),
        }
    }
}

/// One detected contraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractionEvent {
    pub start_time_ms: f64,
    pub end_time_ms: f64,
    pub duration_ms: f64,
    /// Mean of the rectified segment
    pub mean_amplitude: f64,
    /// Peak of the rectified segment
    pub max_amplitude: f64,
    #[serde(default)]
    pub is_good: GoodFlag,
}

/// Analytics for a single logical channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChannelAnalytics {
    pub contraction_count: usize,
    pub avg_duration_ms: f64,
    pub min_duration_ms: f64,
    pub max_duration_ms: f64,
    pub total_time_under_tension_ms: f64,
    pub avg_amplitude: f64,
    pub max_amplitude: f64,

    pub rms: f64,
    pub mav: f64,
    pub mpf: Option<f64>,
    pub mdf: Option<f64>,
    pub fatigue_index_fi_nsm5: Option<f64>,
    /// Values of additionally registered metrics
    #[serde(default)]
    pub extra_metrics: BTreeMap<String, Option<f64>>,

    #[serde(default)]
    pub contractions: Vec<ContractionEvent>,

    /// Effort threshold actually used for grading
    #[serde(default)]
    pub effort_threshold: Option<f64>,
    #[serde(default)]
    pub threshold_tier: Option<ThresholdTier>,
    #[serde(default)]
    pub good_contraction_count: Option<usize>,
    #[serde(default)]
    pub expected_contractions: Option<u32>,
    #[serde(default)]
    pub contraction_source: Option<SignalVariant>,

    /// Failure message per metric or stage; `None` when nothing failed
    #[serde(default)]
    pub errors: Option<BTreeMap<String, String>>,
}

impl ChannelAnalytics {
    /// Number of events at or above `boundary_ms`
    pub fn long_contraction_count(&self, boundary_ms: f64) -> usize {
        self.contractions
            .iter()
            .filter(|c| c.duration_ms >= boundary_ms)
            .count()
    }
}

/// Metadata block of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionMetadata {
    /// Free-form fields reported by the container parser (game, level, ...)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub session_parameters_used: SessionParameters,
}

/// Complete result of one processing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub source: String,
    pub metadata: SessionMetadata,
    pub analytics: BTreeMap<String, ChannelAnalytics>,
    pub available_channels: Vec<String>,
}

/// Samples of one channel together with its detected contractions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelView {
    pub channel_name: String,
    pub sampling_rate: f64,
    pub data: Vec<f64>,
    pub time_axis: Vec<f64>,
    pub activated_data: Option<Vec<f64>>,
    pub contractions: Option<Vec<ContractionEvent>>,
}

impl ChannelView {
    /// Build a view for `requested`, which may be a full label or a logical
    /// name. A logical name resolves to its exact label first, then to its raw
    /// variant. `activated_data` carries the activated counterpart.
    pub fn build(
        channels: &ChannelSet,
        requested: &str,
        report: Option<&AnalysisReport>,
    ) -> Option<Self> {
        let primary = channels.get(requested).or_else(|| {
            if requested.contains(RAW_SUFFIX) || requested.contains(ACTIVATED_SUFFIX) {
                None
            } else {
                channels.get(&SignalVariant::Raw.label_for(requested))
            }
        })?;

        let (logical, _) = SignalVariant::classify(primary.label());
        let activated_data = channels
            .get(&SignalVariant::Activated.label_for(logical))
            .map(|c| c.samples().to_vec());
        let contractions = report
            .and_then(|r| r.analytics.get(logical))
            .map(|a| a.contractions.clone());

        Some(Self {
            channel_name: primary.label().to_string(),
            sampling_rate: primary.sampling_rate(),
            data: primary.samples().to_vec(),
            time_axis: primary.time_axis(),
            activated_data,
            contractions,
        })
    }
}
