// SessionParameters - therapist-supplied configuration for one session
//
// Carries the maximal voluntary contraction (MVC) reference values and the
// percentage of MVC a contraction must reach to count as "good", both as a
// global default and per logical channel. It also carries the
// expected-contraction targets and display names that callers attach to the
// results. Field names follow the JSON the configuration collaborator sends.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::error::AnalysisError;

/// Default percentage of MVC for a "good" contraction
pub const DEFAULT_MVC_THRESHOLD_PERCENTAGE: f64 = 75.0;

/// Default short/long boundary in milliseconds
pub const DEFAULT_DURATION_THRESHOLD_MS: u32 = 250;

fn default_threshold_percentage() -> Option<f64> {
    Some(DEFAULT_MVC_THRESHOLD_PERCENTAGE)
}

fn default_duration_threshold() -> u32 {
    DEFAULT_DURATION_THRESHOLD_MS
}

/// Accept `null` wherever a map is expected
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Session-level parameters for grading and targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionParameters {
    /// Global MVC value used when a channel has none
    #[serde(default)]
    pub session_mvc_value: Option<f64>,
    /// Global percentage of MVC (0-100)
    #[serde(default = "default_threshold_percentage")]
    pub session_mvc_threshold_percentage: Option<f64>,
    /// MVC value per logical channel
    #[serde(default, deserialize_with = "null_as_default")]
    pub session_mvc_values: BTreeMap<String, Option<f64>>,
    /// Percentage of MVC per logical channel
    #[serde(default, deserialize_with = "null_as_default")]
    pub session_mvc_threshold_percentages: BTreeMap<String, Option<f64>>,

    #[serde(default)]
    pub session_expected_contractions: Option<u32>,
    #[serde(default)]
    pub session_expected_contractions_ch1: Option<u32>,
    #[serde(default)]
    pub session_expected_contractions_ch2: Option<u32>,

    #[serde(default)]
    pub session_expected_long_left: Option<u32>,
    #[serde(default)]
    pub session_expected_short_left: Option<u32>,
    #[serde(default)]
    pub session_expected_long_right: Option<u32>,
    #[serde(default)]
    pub session_expected_short_right: Option<u32>,

    /// Events at least this long (ms) are "long"; evaluated by callers
    #[serde(default = "default_duration_threshold")]
    pub contraction_duration_threshold: u32,

    /// Channel name to muscle display name
    #[serde(default, deserialize_with = "null_as_default")]
    pub channel_muscle_mapping: BTreeMap<String, String>,
}

impl Default for SessionParameters {
    fn default() -> Self {
        Self {
            session_mvc_value: None,
            session_mvc_threshold_percentage: default_threshold_percentage(),
            session_mvc_values: BTreeMap::new(),
            session_mvc_threshold_percentages: BTreeMap::new(),
            session_expected_contractions: None,
            session_expected_contractions_ch1: None,
            session_expected_contractions_ch2: None,
            session_expected_long_left: None,
            session_expected_short_left: None,
            session_expected_long_right: None,
            session_expected_short_right: None,
            contraction_duration_threshold: default_duration_threshold(),
            channel_muscle_mapping: BTreeMap::new(),
        }
    }
}

impl SessionParameters {
    /// Per-channel MVC value; an explicit `null` counts as unset
    pub fn channel_mvc_value(&self, channel: &str) -> Option<f64> {
        self.session_mvc_values.get(channel).copied().flatten()
    }

    /// Per-channel percentage; an explicit `null` counts as unset
    pub fn channel_threshold_percentage(&self, channel: &str) -> Option<f64> {
        self.session_mvc_threshold_percentages
            .get(channel)
            .copied()
            .flatten()
    }

    /// Expected contraction target for the channel at `index` in
    /// logical-name order. The first two channels may be overridden.
    pub fn expected_contractions_for(&self, index: usize) -> Option<u32> {
        let override_count = match index {
            0 => self.session_expected_contractions_ch1,
            1 => self.session_expected_contractions_ch2,
            _ => None,
        };
        override_count.or(self.session_expected_contractions)
    }

    pub fn display_name<'a>(&'a self, channel: &'a str) -> &'a str {
        self.channel_muscle_mapping
            .get(channel)
            .map(String::as_str)
            .unwrap_or(channel)
    }

    /// Fill unset per-channel entries from the global value and percentage
    ///
    /// A channel that only sets its percentage keeps resolving against the
    /// global pair, so its value is left unset to keep the threshold stable.
    pub fn fill_channel_defaults<'a>(&mut self, channels: impl IntoIterator<Item = &'a str>) {
        for channel in channels {
            let value_unset = self.channel_mvc_value(channel).is_none();
            if value_unset && self.channel_threshold_percentage(channel).is_some() {
                continue;
            }
            if value_unset {
                self.session_mvc_values
                    .insert(channel.to_string(), self.session_mvc_value);
            }
            if self.channel_threshold_percentage(channel).is_none() {
                self.session_mvc_threshold_percentages
                    .insert(channel.to_string(), self.session_mvc_threshold_percentage);
            }
        }
    }

    /// Reject negative or non-finite MVC values and percentages outside 0-100
    pub fn validate(&self) -> Result<(), AnalysisError> {
        check_mvc("session_mvc_value", self.session_mvc_value)?;
        check_percentage(
            "session_mvc_threshold_percentage",
            self.session_mvc_threshold_percentage,
        )?;
        for (channel, value) in &self.session_mvc_values {
            check_mvc(&format!("session_mvc_values.{channel}"), *value)?;
        }
        for (channel, pct) in &self.session_mvc_threshold_percentages {
            check_percentage(
                &format!("session_mvc_threshold_percentages.{channel}"),
                *pct,
            )?;
        }
        Ok(())
    }
}

fn check_mvc(name: &str, value: Option<f64>) -> Result<(), AnalysisError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(AnalysisError::InvalidParameter {
            name: name.to_string(),
            reason: format!("{} must be a non-negative number", v),
        }),
        _ => Ok(()),
    }
}

fn check_percentage(name: &str, value: Option<f64>) -> Result<(), AnalysisError> {
    match value {
        Some(p) if !(0.0..=100.0).contains(&p) => Err(AnalysisError::InvalidParameter {
            name: name.to_string(),
            reason: format!("{} not in [0, 100]", p),
        }),
        _ => Ok(()),
    }
}
