//! JSON channel bundles.
//!
//! A bundle is the hand-off format between the container parser and the
//! analytics engine: labelled sample arrays plus free-form session metadata.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::channels::{Channel, ChannelSet};
use crate::error::AnalysisError;

/// Rate assumed when a record does not state one
pub const DEFAULT_SAMPLING_RATE: f64 = 1000.0;

fn default_sampling_rate() -> f64 {
    DEFAULT_SAMPLING_RATE
}

/// One labelled channel inside a bundle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelRecord {
    pub label: String,
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    pub samples: Vec<f64>,
}

/// Channels of one recording plus its metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChannelBundle {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub channels: Vec<ChannelRecord>,
}

impl ChannelBundle {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading bundle {}", path.display()))?;
        let mut bundle: Self = serde_json::from_str(&json)
            .with_context(|| format!("parsing bundle {}", path.display()))?;
        if bundle.source.is_empty() {
            bundle.source = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string();
        }
        Ok(bundle)
    }

    /// Snapshot a channel set as a bundle
    pub fn from_channel_set(
        source: impl Into<String>,
        metadata: BTreeMap<String, String>,
        channels: &ChannelSet,
    ) -> Self {
        Self {
            source: source.into(),
            metadata,
            channels: channels
                .iter()
                .map(|channel| ChannelRecord {
                    label: channel.label().to_string(),
                    sampling_rate: channel.sampling_rate(),
                    samples: channel.samples().to_vec(),
                })
                .collect(),
        }
    }

    /// Validate every record and build the channel set
    pub fn to_channel_set(&self) -> Result<ChannelSet, AnalysisError> {
        self.channels
            .iter()
            .map(|record| {
                Channel::new(
                    record.label.clone(),
                    record.sampling_rate,
                    record.samples.clone(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_default_rate() {
        let bundle: ChannelBundle = serde_json::from_str(
            r#"{"source": "s.c3d", "metadata": {"level": "3"},
                "channels": [{"label": "CH1 Raw", "samples": [0.1, -0.2]}]}"#,
        )
        .unwrap();
        assert_eq!(bundle.channels[0].sampling_rate, 1000.0);

        let set = bundle.to_channel_set().unwrap();
        assert_eq!(set.labels(), vec!["CH1 Raw".to_string()]);
        assert_eq!(set.get("CH1 Raw").unwrap().samples(), &[0.1, -0.2]);
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let bundle = ChannelBundle {
            channels: vec![ChannelRecord {
                label: "CH1 Raw".into(),
                sampling_rate: 0.0,
                samples: vec![],
            }],
            ..ChannelBundle::default()
        };
        assert!(matches!(
            bundle.to_channel_set(),
            Err(AnalysisError::InvalidSamplingRate { .. })
        ));
    }

    #[test]
    fn test_channel_set_snapshot() {
        let set: ChannelSet = [Channel::new("EMG1", 500.0, vec![1.0, 2.0]).unwrap()]
            .into_iter()
            .collect();
        let bundle = ChannelBundle::from_channel_set("x", BTreeMap::new(), &set);
        assert_eq!(bundle.to_channel_set().unwrap(), set);
    }
}
