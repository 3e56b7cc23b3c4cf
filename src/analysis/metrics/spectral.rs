// Spectral metrics - fatigue indicators derived from the power spectrum
//
// Muscle fatigue compresses the EMG spectrum toward low frequencies:
// - Mean power frequency (MPF): Σ f·P / Σ P
// - Median frequency (MDF): first bin where cumulative power reaches 50%
// - Dimitrov FI_nsm5: Σ f⁻¹·P / Σ f⁵·P over f > 0 (rises with fatigue)

use crate::analysis::metrics::psd::{PowerSpectrum, SpectralEstimator};

/// Power-weighted mean frequency
pub fn mean_power_frequency(spectrum: &PowerSpectrum) -> Option<f64> {
    let total = spectrum.total_power();
    if total == 0.0 {
        return None;
    }
    let weighted: f64 = spectrum.bins().map(|(f, p)| f * p).sum();
    Some(weighted / total)
}

/// Frequency at which cumulative power first reaches half the total
pub fn median_frequency(spectrum: &PowerSpectrum) -> Option<f64> {
    let total = spectrum.total_power();
    if total == 0.0 {
        return None;
    }
    let half = total * 0.5;
    let mut cumulative = 0.0;
    spectrum.bins().find_map(|(f, p)| {
        cumulative += p;
        (cumulative >= half).then_some(f)
    })
}

/// Dimitrov's normalized spectral moment ratio M(-1) / M(5)
pub fn fatigue_index_fi_nsm5(spectrum: &PowerSpectrum) -> Option<f64> {
    let positive: Vec<(f64, f64)> = spectrum.bins().filter(|(f, _)| *f > 0.0).collect();
    if positive.is_empty() {
        return None;
    }
    if positive.iter().map(|(_, p)| p).sum::<f64>() == 0.0 {
        return None;
    }

    let moment_neg_1: f64 = positive.iter().map(|(f, p)| p / f).sum();
    let moment_5: f64 = positive.iter().map(|(f, p)| f.powi(5) * p).sum();
    if moment_5 == 0.0 {
        return None;
    }
    Some(moment_neg_1 / moment_5)
}

/// MPF of a signal using a default estimator
pub fn mpf(signal: &[f64], sampling_rate: f64) -> Option<f64> {
    SpectralEstimator::default()
        .estimate(signal, sampling_rate)
        .and_then(|s| mean_power_frequency(&s))
}

/// MDF of a signal using a default estimator
pub fn mdf(signal: &[f64], sampling_rate: f64) -> Option<f64> {
    SpectralEstimator::default()
        .estimate(signal, sampling_rate)
        .and_then(|s| median_frequency(&s))
}

/// FI_nsm5 of a signal using a default estimator
pub fn fatigue_index(signal: &[f64], sampling_rate: f64) -> Option<f64> {
    SpectralEstimator::default()
        .estimate(signal, sampling_rate)
        .and_then(|s| fatigue_index_fi_nsm5(&s))
}
