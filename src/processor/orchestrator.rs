// ChannelAnalyticsOrchestrator - per-channel analytics for one session
//
// For each logical channel (sorted by name, processed in parallel):
// 1. Resolve the effort threshold from the session parameters
// 2. Run the metric registry over the raw variant
// 3. Pick the detection signal: activated, then raw, then bare
// 4. Detect contractions graded against the resolved threshold
// 5. Self-calibrate: seed a missing channel MVC value from the detected
//    peak and a missing channel percentage from the global/default value,
//    then re-grade with the re-resolved threshold
// 6. Assemble the ChannelAnalytics record
//
// Calibration results are written back into a copy of the parameters after
// the parallel section, so later recalculation reproduces the same flags.

use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::analysis::contraction::{ContractionDetector, ContractionSummary};
use crate::analysis::metrics::{
    MetricRegistry, METRIC_FATIGUE_INDEX, METRIC_MAV, METRIC_MDF, METRIC_MPF, METRIC_RMS,
};
use crate::channels::{ChannelSet, LogicalChannel, SignalVariant};
use crate::config::AppConfig;
use crate::error::{log_analysis_error, AnalysisError, ErrorCode};
use crate::models::{AnalysisReport, ChannelAnalytics, SessionMetadata};
use crate::session::{resolve_effort_threshold, ResolvedThreshold, SessionParameters};

/// Error-map key for detection failures
pub const ERROR_KEY_CONTRACTIONS: &str = "contractions";
/// Error-map key noting a detection fallback
pub const ERROR_KEY_CONTRACTIONS_SOURCE: &str = "contractions_source";
/// Error-map key for a raw signal too short for spectral metrics
pub const ERROR_KEY_SPECTRAL: &str = "spectral";

/// Analytics of every logical channel plus the parameters that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnalytics {
    pub analytics: BTreeMap<String, ChannelAnalytics>,
    /// Input parameters with self-calibrated channel entries filled in
    pub parameters_used: SessionParameters,
    pub available_channels: Vec<String>,
}

/// Output of one channel before write-back
struct ChannelOutcome {
    name: String,
    analytics: ChannelAnalytics,
    calibrated_value: Option<f64>,
    calibrated_percentage: Option<f64>,
}

/// Runs detection and metrics over every channel of a session
#[derive(Debug, Clone)]
pub struct ChannelAnalyticsOrchestrator {
    config: AppConfig,
    detector: ContractionDetector,
    registry: MetricRegistry,
}

impl Default for ChannelAnalyticsOrchestrator {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl ChannelAnalyticsOrchestrator {
    /// Orchestrator with the standard metric set
    pub fn new(config: AppConfig) -> Self {
        let registry = MetricRegistry::standard(config.spectral.clone());
        Self::with_registry(config, registry)
    }

    /// Orchestrator with a caller-supplied metric registry
    pub fn with_registry(config: AppConfig, registry: MetricRegistry) -> Self {
        Self {
            detector: ContractionDetector::new(config.detection.clone()),
            config,
            registry,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Analyze every logical channel in `channels`
    ///
    /// # Errors
    /// `InvalidParameter` when `params` fails validation. Per-channel
    /// problems never fail the call; they land in the channel's error map.
    pub fn analyze(
        &self,
        channels: &ChannelSet,
        params: &SessionParameters,
    ) -> Result<SessionAnalytics, AnalysisError> {
        if let Err(err) = params.validate() {
            log_analysis_error(&err, "ChannelAnalyticsOrchestrator::analyze");
            return Err(err);
        }

        let logical = channels.logical_channels();
        let span = tracing::info_span!("analyze_session", channels = logical.len());
        let _guard = span.enter();

        let outcomes: Vec<ChannelOutcome> = logical
            .par_iter()
            .enumerate()
            .map(|(index, channel)| self.analyze_channel(index, channel, params))
            .collect();

        let mut parameters_used = params.clone();
        let mut analytics = BTreeMap::new();
        for outcome in outcomes {
            if let Some(value) = outcome.calibrated_value {
                parameters_used
                    .session_mvc_values
                    .insert(outcome.name.clone(), Some(value));
            }
            if let Some(pct) = outcome.calibrated_percentage {
                parameters_used
                    .session_mvc_threshold_percentages
                    .insert(outcome.name.clone(), Some(pct));
            }
            analytics.insert(outcome.name, outcome.analytics);
        }

        tracing::info!(channels = analytics.len(), "session analytics complete");
        Ok(SessionAnalytics {
            analytics,
            parameters_used,
            available_channels: channels.labels(),
        })
    }

    /// Analyze and wrap the result in a report envelope
    pub fn process(
        &self,
        source: impl Into<String>,
        attributes: BTreeMap<String, String>,
        channels: &ChannelSet,
        params: &SessionParameters,
    ) -> Result<AnalysisReport, AnalysisError> {
        let session = self.analyze(channels, params)?;
        Ok(AnalysisReport {
            source: source.into(),
            metadata: SessionMetadata {
                attributes,
                session_parameters_used: session.parameters_used,
            },
            analytics: session.analytics,
            available_channels: session.available_channels,
        })
    }

    fn analyze_channel(
        &self,
        index: usize,
        channel: &LogicalChannel<'_>,
        params: &SessionParameters,
    ) -> ChannelOutcome {
        let name = channel.name;
        let _span = tracing::debug_span!("analyze_channel", channel = name).entered();

        let mut errors = BTreeMap::new();
        let mut analytics = ChannelAnalytics {
            expected_contractions: params.expected_contractions_for(index),
            ..ChannelAnalytics::default()
        };
        let mut resolved = resolve_effort_threshold(params, name);

        if let Some(raw) = channel.raw {
            let min_samples = self.config.spectral.min_samples;
            if raw.len() < min_samples {
                let err = AnalysisError::InsufficientData {
                    stage: ERROR_KEY_SPECTRAL.to_string(),
                    reason: format!("{} samples, need at least {}", raw.len(), min_samples),
                };
                log::debug!("[Orchestrator] {}: {}", name, err);
                errors.insert(ERROR_KEY_SPECTRAL.to_string(), err.message());
            }
            for outcome in self.registry.evaluate(raw.samples(), raw.sampling_rate()) {
                let value = match outcome.result {
                    Ok(value) => value,
                    Err(err) => {
                        log::warn!("[Orchestrator] {}: {}", name, err);
                        errors.insert(outcome.id.clone(), err.message());
                        None
                    }
                };
                apply_metric(&mut analytics, outcome.id, value);
            }
        }

        let mut calibrated_value = None;
        let mut calibrated_percentage = None;
        let summary = match channel.detection_signal() {
            Some((signal, variant)) => {
                match variant {
                    SignalVariant::Activated => {}
                    SignalVariant::Raw => {
                        errors.insert(
                            ERROR_KEY_CONTRACTIONS_SOURCE.to_string(),
                            "Used Raw signal for contractions (Activated not found)".to_string(),
                        );
                    }
                    SignalVariant::Bare => {
                        errors.insert(
                            ERROR_KEY_CONTRACTIONS_SOURCE.to_string(),
                            format!("Used {} signal for contractions", signal.label()),
                        );
                    }
                }
                analytics.contraction_source = Some(variant);

                let mut summary = self.detector.detect(
                    signal.samples(),
                    signal.sampling_rate(),
                    resolved.map(|r| r.value),
                );

                if self.config.calibration.self_calibrate {
                    if params.channel_mvc_value(name).is_none() && summary.max_amplitude > 0.0 {
                        calibrated_value = Some(summary.max_amplitude);
                    }
                    // A copied global percentage is recorded but does not
                    // change the tier; only the fallback default does
                    let mut fallback_percentage = None;
                    if params.channel_threshold_percentage(name).is_none() {
                        calibrated_percentage = params.session_mvc_threshold_percentage;
                        if calibrated_percentage.is_none() {
                            fallback_percentage =
                                Some(self.config.calibration.default_threshold_percentage);
                            calibrated_percentage = fallback_percentage;
                        }
                    }
                    if calibrated_value.is_some() || fallback_percentage.is_some() {
                        resolved = recalibrated_threshold(
                            params,
                            name,
                            calibrated_value,
                            fallback_percentage,
                        );
                        summary.reflag(resolved.map(|r| r.value));
                        log::debug!(
                            "[Orchestrator] {} self-calibrated: mvc={:?} pct={:?}",
                            name,
                            calibrated_value,
                            calibrated_percentage
                        );
                    }
                }
                summary
            }
            None => {
                let err = AnalysisError::MissingSignal {
                    channel: name.to_string(),
                };
                log_analysis_error(&err, "ChannelAnalyticsOrchestrator::analyze_channel");
                errors.insert(ERROR_KEY_CONTRACTIONS.to_string(), err.message());
                ContractionSummary::empty(resolved.map(|r| r.value))
            }
        };

        apply_summary(&mut analytics, summary, resolved);
        if !errors.is_empty() {
            analytics.errors = Some(errors);
        }

        tracing::debug!(
            channel = name,
            contractions = analytics.contraction_count,
            good = ?analytics.good_contraction_count,
            tier = ?analytics.threshold_tier,
            "channel analyzed"
        );

        ChannelOutcome {
            name: name.to_string(),
            analytics,
            calibrated_value,
            calibrated_percentage,
        }
    }
}

/// Resolve again with calibrated channel entries filled in
fn recalibrated_threshold(
    params: &SessionParameters,
    name: &str,
    value: Option<f64>,
    percentage: Option<f64>,
) -> Option<ResolvedThreshold> {
    let mut updated = params.clone();
    if let Some(value) = value {
        updated
            .session_mvc_values
            .insert(name.to_string(), Some(value));
    }
    if let Some(pct) = percentage {
        updated
            .session_mvc_threshold_percentages
            .insert(name.to_string(), Some(pct));
    }
    resolve_effort_threshold(&updated, name)
}

/// Store a metric value; failed amplitude metrics default to 0
fn apply_metric(analytics: &mut ChannelAnalytics, id: String, value: Option<f64>) {
    match id.as_str() {
        METRIC_RMS => analytics.rms = value.unwrap_or(0.0),
        METRIC_MAV => analytics.mav = value.unwrap_or(0.0),
        METRIC_MPF => analytics.mpf = value,
        METRIC_MDF => analytics.mdf = value,
        METRIC_FATIGUE_INDEX => analytics.fatigue_index_fi_nsm5 = value,
        _ => {
            analytics.extra_metrics.insert(id, value);
        }
    }
}

fn apply_summary(
    analytics: &mut ChannelAnalytics,
    summary: ContractionSummary,
    resolved: Option<ResolvedThreshold>,
) {
    analytics.contraction_count = summary.contraction_count;
    analytics.avg_duration_ms = summary.avg_duration_ms;
    analytics.min_duration_ms = summary.min_duration_ms;
    analytics.max_duration_ms = summary.max_duration_ms;
    analytics.total_time_under_tension_ms = summary.total_time_under_tension_ms;
    analytics.avg_amplitude = summary.avg_amplitude;
    analytics.max_amplitude = summary.max_amplitude;
    analytics.contractions = summary.contractions;
    analytics.good_contraction_count = summary.good_contraction_count;
    analytics.effort_threshold = resolved.map(|r| r.value);
    analytics.threshold_tier = resolved.map(|r| r.tier);
}
