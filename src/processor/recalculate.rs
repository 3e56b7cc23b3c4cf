// ScoreRecalculator - re-grade stored contractions against new parameters
//
// Detection is not re-run. Each stored event is re-flagged by comparing its
// max_amplitude with the threshold resolved from the new parameters, and the
// per-channel threshold, tier, good count and expected count are rewritten.
// The tier describes the parameters passed in, not the filled copy returned.
// Running it twice with the same parameters leaves the record unchanged.

use std::collections::BTreeMap;

use crate::analysis::contraction::count_good;
use crate::error::{log_analysis_error, AnalysisError};
use crate::models::{AnalysisReport, ChannelAnalytics, GoodFlag};
use crate::session::{resolve_effort_threshold, SessionParameters};

/// Re-scores existing analytics without touching the signal
pub struct ScoreRecalculator;

impl ScoreRecalculator {
    /// Re-grade every channel in `analytics` in place
    ///
    /// # Returns
    /// The parameters actually applied: `params` with unset per-channel
    /// entries filled from the global value and percentage.
    ///
    /// # Errors
    /// `InvalidParameter` when `params` fails validation; `analytics` is
    /// left untouched in that case.
    pub fn recalculate(
        analytics: &mut BTreeMap<String, ChannelAnalytics>,
        params: &SessionParameters,
    ) -> Result<SessionParameters, AnalysisError> {
        if let Err(err) = params.validate() {
            log_analysis_error(&err, "ScoreRecalculator::recalculate");
            return Err(err);
        }

        let mut effective = params.clone();
        effective.fill_channel_defaults(analytics.keys().map(String::as_str));

        for (index, (name, channel)) in analytics.iter_mut().enumerate() {
            // Filled entries resolve to the same value; the caller's
            // parameters tell which tier actually supplied it
            let resolved = resolve_effort_threshold(params, name);
            let threshold = resolved.map(|r| r.value);

            for event in &mut channel.contractions {
                event.is_good = GoodFlag::grade(event.max_amplitude, threshold);
            }
            channel.good_contraction_count = count_good(&channel.contractions, threshold);
            channel.effort_threshold = threshold;
            channel.threshold_tier = resolved.map(|r| r.tier);
            channel.expected_contractions = params.expected_contractions_for(index);

            log::debug!(
                "[ScoreRecalculator] {}: threshold={:?} good={:?}",
                name,
                threshold,
                channel.good_contraction_count
            );
        }

        Ok(effective)
    }

    /// Re-grade a full report and record the applied parameters in its metadata
    pub fn recalculate_report(
        report: &mut AnalysisReport,
        params: &SessionParameters,
    ) -> Result<(), AnalysisError> {
        let applied = Self::recalculate(&mut report.analytics, params)?;
        report.metadata.session_parameters_used = applied;
        Ok(())
    }
}
