// SpectralEstimator - Welch power spectral density
//
// The signal is cut into segments of `min(segment_len, len)` samples with 50%
// overlap. Each segment has its mean removed, is tapered by the configured
// window and transformed with a forward FFT. Squared magnitudes are averaged
// across segments and scaled to a one-sided density:
//
//   P[k] = c[k] · mean_s |X_s[k]|² / (fs · Σ w²)
//
// where c[k] = 2 for interior bins and 1 for DC and (even lengths) Nyquist.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::{Arc, Mutex};

use crate::config::{SpectralConfig, SpectralWindow};

/// One-sided power spectrum with parallel frequency and power sequences
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrum {
    /// Bin centre frequencies in Hz, from 0 to fs/2
    pub frequencies: Vec<f64>,
    /// Power spectral density per bin (units²/Hz)
    pub power: Vec<f64>,
}

impl PowerSpectrum {
    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }

    pub fn total_power(&self) -> f64 {
        self.power.iter().sum()
    }

    /// (frequency, power) pairs
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.frequencies
            .iter()
            .copied()
            .zip(self.power.iter().copied())
    }
}

/// Welch PSD estimator
pub struct SpectralEstimator {
    config: SpectralConfig,
    fft_planner: Arc<Mutex<FftPlanner<f64>>>,
}

impl Default for SpectralEstimator {
    fn default() -> Self {
        Self::new(SpectralConfig::default())
    }
}

impl SpectralEstimator {
    pub fn new(config: SpectralConfig) -> Self {
        Self {
            config,
            fft_planner: Arc::new(Mutex::new(FftPlanner::new())),
        }
    }

    pub fn config(&self) -> &SpectralConfig {
        &self.config
    }

    /// Estimate the power spectrum of `signal`
    ///
    /// # Returns
    /// `None` when the spectrum is undefined: fewer than `min_samples`
    /// samples, a standard deviation below `min_std_dev`, or an invalid rate.
    pub fn estimate(&self, signal: &[f64], sampling_rate: f64) -> Option<PowerSpectrum> {
        let n = signal.len();
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            log::debug!(
                "[SpectralEstimator] Invalid sampling rate {}",
                sampling_rate
            );
            return None;
        }
        if n < self.config.min_samples.max(2) {
            log::debug!(
                "[SpectralEstimator] Signal too short for spectral analysis: {} samples, need {}",
                n,
                self.config.min_samples
            );
            return None;
        }
        let std_dev = population_std(signal);
        if !(std_dev >= self.config.min_std_dev) {
            log::debug!(
                "[SpectralEstimator] Insufficient signal variation (std = {:e})",
                std_dev
            );
            return None;
        }

        let nperseg = self.config.segment_len.clamp(2, n);
        let step = nperseg - nperseg / 2;
        let window = make_window(self.config.window, nperseg);
        let window_energy: f64 = window.iter().map(|w| w * w).sum();
        let fft = self.plan(nperseg);

        let num_bins = nperseg / 2 + 1;
        let mut accum = vec![0.0; num_bins];
        let mut buffer: Vec<Complex<f64>> = Vec::with_capacity(nperseg);
        let mut segments = 0usize;

        let mut start = 0;
        while start + nperseg <= n {
            let segment = &signal[start..start + nperseg];
            let mean = segment.iter().sum::<f64>() / nperseg as f64;

            buffer.clear();
            buffer.extend(
                segment
                    .iter()
                    .zip(&window)
                    .map(|(&x, &w)| Complex::new((x - mean) * w, 0.0)),
            );
            fft.process(&mut buffer);

            for (acc, bin) in accum.iter_mut().zip(&buffer[..num_bins]) {
                *acc += bin.norm_sqr();
            }
            segments += 1;
            start += step;
        }

        let scale = 1.0 / (sampling_rate * window_energy * segments as f64);
        // Nyquist is only unpaired for even segment lengths
        let last_doubled = if nperseg % 2 == 0 {
            num_bins - 1
        } else {
            num_bins
        };
        let power = accum
            .iter()
            .enumerate()
            .map(|(k, &p)| {
                if k > 0 && k < last_doubled {
                    2.0 * p * scale
                } else {
                    p * scale
                }
            })
            .collect();
        let frequencies = (0..num_bins)
            .map(|k| k as f64 * sampling_rate / nperseg as f64)
            .collect();

        Some(PowerSpectrum { frequencies, power })
    }

    fn plan(&self, len: usize) -> Arc<dyn Fft<f64>> {
        // A poisoned planner is still a valid cache
        let mut planner = self
            .fft_planner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        planner.plan_fft_forward(len)
    }
}

/// Standard deviation with divisor n
pub fn population_std(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    let n = signal.len() as f64;
    let mean = signal.iter().sum::<f64>() / n;
    let variance = signal.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Periodic window of `len` taps
fn make_window(kind: SpectralWindow, len: usize) -> Vec<f64> {
    match kind {
        SpectralWindow::Hann => (0..len)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / len as f64).cos())
            .collect(),
        SpectralWindow::Rectangular => vec![1.0; len],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, rate: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / rate).sin())
            .collect()
    }

    #[test]
    fn test_short_signal_is_undefined() {
        let estimator = SpectralEstimator::default();
        assert!(estimator.estimate(&sine(50.0, 1000.0, 255), 1000.0).is_none());
        assert!(estimator.estimate(&sine(50.0, 1000.0, 256), 1000.0).is_some());
    }

    #[test]
    fn test_constant_signal_is_undefined() {
        let estimator = SpectralEstimator::default();
        assert!(estimator.estimate(&vec![0.7; 1024], 1000.0).is_none());
        assert!(estimator.estimate(&vec![0.0; 1024], 1000.0).is_none());
    }

    #[test]
    fn test_invalid_rate_is_undefined() {
        let estimator = SpectralEstimator::default();
        let signal = sine(50.0, 1000.0, 1024);
        assert!(estimator.estimate(&signal, 0.0).is_none());
        assert!(estimator.estimate(&signal, f64::INFINITY).is_none());
    }

    #[test]
    fn test_bins_and_resolution() {
        let estimator = SpectralEstimator::default();
        let spectrum = estimator.estimate(&sine(125.0, 1000.0, 2048), 1000.0).unwrap();
        assert_eq!(spectrum.len(), 129);
        assert_eq!(spectrum.frequencies[0], 0.0);
        assert_eq!(spectrum.frequencies[128], 500.0);
        assert!((spectrum.frequencies[1] - 1000.0 / 256.0).abs() < 1e-12);
        assert!(spectrum.power.iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn test_peak_at_tone_frequency() {
        let estimator = SpectralEstimator::default();
        // 125 Hz sits exactly on bin 32 at fs = 1000, nperseg = 256
        let spectrum = estimator.estimate(&sine(125.0, 1000.0, 4096), 1000.0).unwrap();
        let (peak_idx, _) = spectrum
            .power
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, &p)| if p > best.1 { (i, p) } else { best });
        assert_eq!(peak_idx, 32);
    }

    #[test]
    fn test_density_integrates_to_variance() {
        // Parseval: Σ P[k] · Δf ≈ signal variance (0.5 for a unit sine)
        for window in [SpectralWindow::Hann, SpectralWindow::Rectangular] {
            let estimator = SpectralEstimator::new(SpectralConfig {
                window,
                ..SpectralConfig::default()
            });
            let spectrum = estimator.estimate(&sine(125.0, 1000.0, 4096), 1000.0).unwrap();
            let delta_f = spectrum.frequencies[1];
            let integrated = spectrum.total_power() * delta_f;
            assert!(
                (integrated - 0.5).abs() < 0.01,
                "{:?}: integrated power {}",
                window,
                integrated
            );
        }
    }

    #[test]
    fn test_segment_length_capped_by_signal() {
        let estimator = SpectralEstimator::new(SpectralConfig {
            min_samples: 64,
            ..SpectralConfig::default()
        });
        let spectrum = estimator.estimate(&sine(100.0, 1000.0, 100), 1000.0).unwrap();
        assert_eq!(spectrum.len(), 51);
        assert!((spectrum.frequencies[1] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_population_std() {
        assert_eq!(population_std(&[]), 0.0);
        assert!((population_std(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
    }
}
