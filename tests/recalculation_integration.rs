//! Re-scoring stored reports
//!
//! A report is analyzed once, stored as JSON, read back and re-graded with
//! different session parameters. Detection output must stay untouched.

use emg_analytics::fixtures::FixtureCatalog;
use emg_analytics::models::{AnalysisReport, GoodFlag};
use emg_analytics::processor::{ChannelAnalyticsOrchestrator, ScoreRecalculator};
use emg_analytics::session::{SessionParameters, ThresholdTier};

fn stored_report() -> AnalysisReport {
    let input = FixtureCatalog::default()
        .load("two_channel_session")
        .unwrap();
    let params = input.params.clone().unwrap();
    let report = ChannelAnalyticsOrchestrator::default()
        .process(input.source, input.attributes, &input.channels, &params)
        .unwrap();
    let json = serde_json::to_string(&report).unwrap();
    serde_json::from_str(&json).unwrap()
}

fn flat_params(value: f64, pct: f64) -> SessionParameters {
    SessionParameters {
        session_mvc_value: Some(value),
        session_mvc_threshold_percentage: Some(pct),
        ..SessionParameters::default()
    }
}

#[test]
fn test_recalculate_with_global_parameters() {
    let original = stored_report();
    let mut report = original.clone();
    ScoreRecalculator::recalculate_report(&mut report, &flat_params(1.0, 60.0)).unwrap();

    for name in ["CH1", "CH2"] {
        let before = &original.analytics[name];
        let after = &report.analytics[name];
        assert_eq!(after.contraction_count, before.contraction_count);
        assert_eq!(after.rms, before.rms);
        assert!((after.effort_threshold.unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(
            after.threshold_tier,
            Some(ThresholdTier::GlobalValueGlobalPercentage)
        );
        for (a, b) in after.contractions.iter().zip(&before.contractions) {
            assert_eq!(a.start_time_ms, b.start_time_ms);
            assert_eq!(a.max_amplitude, b.max_amplitude);
        }
    }

    assert_eq!(report.analytics["CH1"].good_contraction_count, Some(3));
    assert_eq!(report.analytics["CH2"].good_contraction_count, Some(2));

    // Expected counts come from the new parameters, which carry none
    assert_eq!(report.analytics["CH1"].expected_contractions, None);

    let used = &report.metadata.session_parameters_used;
    assert_eq!(used.session_mvc_values["CH1"], Some(1.0));
    assert_eq!(used.session_mvc_threshold_percentages["CH2"], Some(60.0));
}

#[test]
fn test_recalculate_with_parameters_used_is_stable() {
    let original = stored_report();
    let mut report = original.clone();
    let used = original.metadata.session_parameters_used.clone();

    ScoreRecalculator::recalculate_report(&mut report, &used).unwrap();
    for (name, before) in &original.analytics {
        let after = &report.analytics[name];
        assert_eq!(after.good_contraction_count, before.good_contraction_count);
        assert_eq!(after.expected_contractions, before.expected_contractions);
        assert!((after.effort_threshold.unwrap() - before.effort_threshold.unwrap()).abs() < 1e-9);
        let flags = |a: &emg_analytics::ChannelAnalytics| {
            a.contractions.iter().map(|c| c.is_good).collect::<Vec<_>>()
        };
        assert_eq!(flags(after), flags(before));
    }

    let once = report.clone();
    ScoreRecalculator::recalculate_report(&mut report, &used).unwrap();
    assert_eq!(report, once);
}

#[test]
fn test_recalculate_matches_fresh_analysis() {
    let input = FixtureCatalog::default()
        .load("two_channel_session")
        .unwrap();
    let with_percentage = |pct: f64| {
        let mut params = flat_params(1.0, pct);
        params.session_mvc_values.insert("CH1".into(), Some(1.0));
        params.session_mvc_values.insert("CH2".into(), Some(0.9));
        params
    };
    let orchestrator = ChannelAnalyticsOrchestrator::default();
    let analyze = |params: &SessionParameters| {
        orchestrator
            .process(
                input.source.clone(),
                input.attributes.clone(),
                &input.channels,
                params,
            )
            .unwrap()
    };

    let mut report = analyze(&with_percentage(30.0));
    ScoreRecalculator::recalculate_report(&mut report, &with_percentage(80.0)).unwrap();
    let fresh = analyze(&with_percentage(80.0));

    for name in ["CH1", "CH2"] {
        let rescored = &report.analytics[name];
        let expected = &fresh.analytics[name];
        assert_eq!(rescored.effort_threshold, expected.effort_threshold);
        assert_eq!(rescored.threshold_tier, expected.threshold_tier);
        assert_eq!(
            rescored.good_contraction_count,
            expected.good_contraction_count
        );
        let flags = |a: &emg_analytics::ChannelAnalytics| {
            a.contractions.iter().map(|c| c.is_good).collect::<Vec<_>>()
        };
        assert_eq!(flags(rescored), flags(expected), "{name}");
    }
    // 0.8 keeps the 1.0, 0.9 and 0.85 bursts of CH1
    assert_eq!(report.analytics["CH1"].good_contraction_count, Some(3));
}

#[test]
fn test_recalculate_without_threshold() {
    let mut report = stored_report();
    let params = SessionParameters {
        session_mvc_threshold_percentage: None,
        ..SessionParameters::default()
    };
    ScoreRecalculator::recalculate_report(&mut report, &params).unwrap();

    for analytics in report.analytics.values() {
        assert_eq!(analytics.effort_threshold, None);
        assert_eq!(analytics.good_contraction_count, None);
        assert!(analytics
            .contractions
            .iter()
            .all(|c| c.is_good == GoodFlag::Undetermined));
    }
}

#[test]
fn test_invalid_parameters_leave_report_untouched() {
    let original = stored_report();
    let mut report = original.clone();
    assert!(ScoreRecalculator::recalculate_report(&mut report, &flat_params(-1.0, 50.0)).is_err());
    assert_eq!(report, original);
}
