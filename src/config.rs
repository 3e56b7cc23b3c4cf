//! Configuration management for analysis parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! so detection and spectral parameters can be adjusted per deployment
//! without recompilation. Session-level thresholds (MVC values and
//! percentages) are not part of this file; they arrive per request as
//! `SessionParameters`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::AnalysisError;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub spectral: SpectralConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
}

/// Contraction detection algorithm parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionConfig {
    /// Fraction of the smoothed maximum used as the detection threshold
    pub threshold_factor: f64,
    /// Events shorter than this are discarded
    pub min_duration_ms: f64,
    /// Moving-average width in samples
    pub smoothing_window: usize,
    /// Events separated by at most this gap are merged
    pub merge_gap_ms: f64,
    /// Minimum quiet time after an accepted event (0 disables the gate)
    pub refractory_ms: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold_factor: 0.3,
            min_duration_ms: 50.0,
            smoothing_window: 25,
            merge_gap_ms: 200.0,
            refractory_ms: 0.0,
        }
    }
}

/// Window applied to each Welch segment before the FFT
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpectralWindow {
    /// Periodic Hann window
    Hann,
    /// No tapering
    Rectangular,
}

/// Power spectrum estimation parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpectralConfig {
    /// Signals shorter than this have no defined spectrum
    pub min_samples: usize,
    /// Welch segment length (capped at the signal length)
    pub segment_len: usize,
    /// Signals with a standard deviation below this have no defined spectrum
    pub min_std_dev: f64,
    pub window: SpectralWindow,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            min_samples: 256,
            segment_len: 256,
            min_std_dev: 1e-10,
            window: SpectralWindow::Hann,
        }
    }
}

/// Self-calibration behaviour of the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalibrationConfig {
    /// Percentage used when neither a channel nor a global percentage is set
    pub default_threshold_percentage: f64,
    /// Seed missing per-channel MVC values from the detected max amplitude
    pub self_calibrate: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            default_threshold_percentage: 70.0,
            self_calibrate: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the defaults if the file is missing or
    /// does not parse.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Strict variant used when the caller named a config file explicitly
    pub fn try_load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let detection = &self.detection;
        if !(detection.threshold_factor > 0.0 && detection.threshold_factor <= 1.0) {
            return Err(AnalysisError::InvalidParameter {
                name: "detection.threshold_factor".to_string(),
                reason: format!("{} not in (0, 1]", detection.threshold_factor),
            });
        }
        if detection.smoothing_window == 0 {
            return Err(AnalysisError::InvalidParameter {
                name: "detection.smoothing_window".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        for (name, value) in [
            ("detection.min_duration_ms", detection.min_duration_ms),
            ("detection.merge_gap_ms", detection.merge_gap_ms),
            ("detection.refractory_ms", detection.refractory_ms),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AnalysisError::InvalidParameter {
                    name: name.to_string(),
                    reason: format!("{} must be a non-negative number", value),
                });
            }
        }
        if self.spectral.segment_len < 2 {
            return Err(AnalysisError::InvalidParameter {
                name: "spectral.segment_len".to_string(),
                reason: format!("{} is shorter than 2 samples", self.spectral.segment_len),
            });
        }
        let pct = self.calibration.default_threshold_percentage;
        if !(0.0..=100.0).contains(&pct) {
            return Err(AnalysisError::InvalidParameter {
                name: "calibration.default_threshold_percentage".to_string(),
                reason: format!("{} not in [0, 100]", pct),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.detection.threshold_factor, 0.3);
        assert_eq!(config.detection.smoothing_window, 25);
        assert_eq!(config.detection.merge_gap_ms, 200.0);
        assert_eq!(config.spectral.segment_len, 256);
        assert_eq!(config.spectral.window, SpectralWindow::Hann);
        assert_eq!(config.calibration.default_threshold_percentage, 70.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_section_defaults() {
        let parsed: AppConfig = serde_json::from_str(
            r#"{"detection": {"threshold_factor": 0.5, "min_duration_ms": 100.0,
                "smoothing_window": 10, "merge_gap_ms": 0.0, "refractory_ms": 0.0}}"#,
        )
        .unwrap();
        assert_eq!(parsed.detection.threshold_factor, 0.5);
        assert_eq!(parsed.spectral, SpectralConfig::default());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/emg_config.json");
        assert_eq!(config, AppConfig::default());
        assert!(AppConfig::try_load_from_file("/nonexistent/emg_config.json").is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_factor() {
        let mut config = AppConfig::default();
        config.detection.threshold_factor = 1.5;
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidParameter { .. })
        ));

        config.detection.threshold_factor = 0.3;
        config.detection.smoothing_window = 0;
        assert!(config.validate().is_err());
    }
}
