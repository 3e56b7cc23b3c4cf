//! End-to-end tests over the bundled synthetic sessions
//!
//! These tests run the full library pipeline the way the CLI does:
//! - fixture rendering and session parameter loading
//! - per-channel detection, metrics and effort grading
//! - self-calibration write-back into the parameters used
//! - JSON bundle input producing the same analytics as the fixture itself

use std::collections::BTreeMap;

use emg_analytics::fixtures::{ChannelBundle, FixtureCatalog, InputSource, LoadedInput};
use emg_analytics::models::{AnalysisReport, GoodFlag};
use emg_analytics::processor::ChannelAnalyticsOrchestrator;
use emg_analytics::session::{SessionParameters, ThresholdTier};
use emg_analytics::SignalVariant;

fn load(name: &str) -> LoadedInput {
    FixtureCatalog::default()
        .load(name)
        .expect("bundled fixture should load")
}

fn analyze(input: &LoadedInput) -> AnalysisReport {
    let params = input.params.clone().unwrap_or_default();
    ChannelAnalyticsOrchestrator::default()
        .process(
            input.source.clone(),
            input.attributes.clone(),
            &input.channels,
            &params,
        )
        .expect("analysis should succeed")
}

fn good_flags(report: &AnalysisReport, channel: &str) -> Vec<GoodFlag> {
    report.analytics[channel]
        .contractions
        .iter()
        .map(|c| c.is_good)
        .collect()
}

#[test]
fn test_two_channel_session_report() {
    let input = load("two_channel_session");
    let report = analyze(&input);

    assert_eq!(report.source, "two_channel_session");
    assert_eq!(report.metadata.attributes["game_name"], "GHOSTLY");
    assert_eq!(
        report.available_channels,
        vec!["CH1 Raw", "CH1 activated", "CH2 Raw", "CH2 activated"]
    );
    assert_eq!(
        report.analytics.keys().collect::<Vec<_>>(),
        vec!["CH1", "CH2"]
    );

    let ch1 = &report.analytics["CH1"];
    assert_eq!(ch1.contraction_count, 5);
    assert_eq!(ch1.contraction_source, Some(SignalVariant::Activated));
    assert!(ch1.errors.is_none());
    assert_eq!(ch1.expected_contractions, Some(5));
    assert_eq!(
        ch1.threshold_tier,
        Some(ThresholdTier::ChannelValueChannelPercentage)
    );
    assert!((ch1.effort_threshold.unwrap() - 0.77).abs() < 1e-9);
    assert_eq!(
        good_flags(&report, "CH1"),
        vec![
            GoodFlag::Good,
            GoodFlag::Good,
            GoodFlag::NotGood,
            GoodFlag::Good,
            GoodFlag::NotGood
        ]
    );
    assert_eq!(ch1.good_contraction_count, Some(3));

    // Burst lengths survive smoothing within a few samples
    for (event, expected_ms) in ch1.contractions.iter().zip([800.0, 600.0, 1200.0, 700.0, 400.0]) {
        assert!(
            (event.duration_ms - expected_ms).abs() < 30.0,
            "duration {} vs {}",
            event.duration_ms,
            expected_ms
        );
    }
    assert!(ch1.long_contraction_count(250.0) == 5);

    let ch2 = &report.analytics["CH2"];
    assert_eq!(ch2.contraction_count, 3);
    assert_eq!(ch2.expected_contractions, Some(3));
    assert_eq!(ch2.good_contraction_count, Some(2));
    assert_eq!(
        good_flags(&report, "CH2"),
        vec![GoodFlag::Good, GoodFlag::Good, GoodFlag::NotGood]
    );
}

#[test]
fn test_self_calibration_is_recorded() {
    let input = load("two_channel_session");
    let report = analyze(&input);
    let used = &report.metadata.session_parameters_used;

    // CH1 came with its own value and percentage
    assert_eq!(used.session_mvc_values["CH1"], Some(1.1));
    assert_eq!(used.session_mvc_threshold_percentages["CH1"], Some(70.0));

    // CH2 had a null value and no percentage; both are recorded, but only
    // the calibrated value is channel-specific
    let ch2 = &report.analytics["CH2"];
    assert_eq!(used.session_mvc_values["CH2"], Some(ch2.max_amplitude));
    assert_eq!(used.session_mvc_threshold_percentages["CH2"], Some(75.0));
    assert_eq!(
        ch2.threshold_tier,
        Some(ThresholdTier::ChannelValueGlobalPercentage)
    );
    assert!((ch2.effort_threshold.unwrap() - ch2.max_amplitude * 0.75).abs() < 1e-9);

    // Untouched fields pass through
    assert_eq!(used.session_expected_contractions, Some(12));
    assert_eq!(used.display_name("CH1"), "Left Quadriceps");
}

#[test]
fn test_spectral_metrics_follow_burst_frequencies() {
    let report = analyze(&load("two_channel_session"));

    for channel in ["CH1", "CH2"] {
        let analytics = &report.analytics[channel];
        let mpf = analytics.mpf.expect("mpf defined");
        let mdf = analytics.mdf.expect("mdf defined");
        assert!(mpf > 80.0 && mpf < 200.0, "{channel} mpf {mpf}");
        assert!(mdf > 80.0 && mdf < 200.0, "{channel} mdf {mdf}");
        assert!(analytics.fatigue_index_fi_nsm5.is_some());
        assert!(analytics.rms > analytics.mav * 0.9);
        assert!(analytics.mav > 0.0);
    }
}

#[test]
fn test_raw_only_session_falls_back_to_raw() {
    let report = analyze(&load("raw_only"));
    let ch1 = &report.analytics["CH1"];

    assert_eq!(ch1.contraction_source, Some(SignalVariant::Raw));
    assert_eq!(ch1.contraction_count, 2);
    let errors = ch1.errors.as_ref().expect("fallback is noted");
    assert_eq!(
        errors["contractions_source"],
        "Used Raw signal for contractions (Activated not found)"
    );
    // Default parameters carry no MVC value, so self-calibration supplies it
    assert_eq!(
        ch1.threshold_tier,
        Some(ThresholdTier::ChannelValueGlobalPercentage)
    );
    assert!(ch1.mpf.is_some());
}

#[test]
fn test_quiet_session_has_no_events() {
    let report = analyze(&load("quiet_session"));
    let ch1 = &report.analytics["CH1"];

    assert_eq!(ch1.contraction_count, 0);
    assert_eq!(ch1.max_amplitude, 0.0);
    assert_eq!(ch1.effort_threshold, None);
    assert_eq!(ch1.good_contraction_count, None);
    assert_eq!(ch1.mpf, None);
    assert_eq!(ch1.rms, 0.0);
    assert!(!report
        .metadata
        .session_parameters_used
        .session_mvc_values
        .contains_key("CH1"));
}

#[test]
fn test_bundle_input_matches_fixture() {
    let input = load("two_channel_session");
    let bundle = ChannelBundle::from_channel_set(
        input.source.clone(),
        input.attributes.clone(),
        &input.channels,
    );
    let path = std::env::temp_dir().join(format!(
        "emg_bundle_integration_{}.json",
        std::process::id()
    ));
    std::fs::write(&path, serde_json::to_string(&bundle).unwrap()).unwrap();

    let loaded = InputSource::Bundle(path.clone())
        .load(&FixtureCatalog::default())
        .unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.source, "two_channel_session");
    assert!(loaded.params.is_none());

    let params = input.params.clone().unwrap();
    let orchestrator = ChannelAnalyticsOrchestrator::default();
    let from_bundle = orchestrator
        .process(
            loaded.source,
            loaded.attributes,
            &loaded.channels,
            &params,
        )
        .unwrap();
    let from_fixture = analyze(&input);
    assert_eq!(from_bundle.metadata.attributes, from_fixture.metadata.attributes);
    assert_eq!(from_bundle.available_channels, from_fixture.available_channels);
    for (name, expected) in &from_fixture.analytics {
        let actual = &from_bundle.analytics[name];
        assert_eq!(actual.contraction_count, expected.contraction_count);
        assert_eq!(actual.good_contraction_count, expected.good_contraction_count);
        assert!((actual.rms - expected.rms).abs() < 1e-9);
        assert!((actual.max_amplitude - expected.max_amplitude).abs() < 1e-9);
    }
}

#[test]
fn test_invalid_parameters_reject_session() {
    let input = load("two_channel_session");
    let params = SessionParameters {
        session_mvc_threshold_percentage: Some(120.0),
        ..SessionParameters::default()
    };
    let result = ChannelAnalyticsOrchestrator::default().process(
        "bad",
        BTreeMap::new(),
        &input.channels,
        &params,
    );
    assert!(result.is_err());
}
