//! Channel model and logical-channel grouping.
//!
//! The container parser hands over one sample array per analog label. A
//! muscle is usually recorded twice: a raw variant (`"CH1 Raw"`) and a
//! pre-activated, already processed variant (`"CH1 activated"`). Both share
//! the logical name `"CH1"`. Labels without either suffix are bare channels
//! whose label is also their logical name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::AnalysisError;

pub const RAW_SUFFIX: &str = " Raw";
pub const ACTIVATED_SUFFIX: &str = " activated";

/// Which recording of a muscle a channel carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalVariant {
    Raw,
    Activated,
    Bare,
}

impl SignalVariant {
    /// Split a label into its logical name and variant
    pub fn classify(label: &str) -> (&str, SignalVariant) {
        if let Some(base) = label.strip_suffix(RAW_SUFFIX) {
            (base, SignalVariant::Raw)
        } else if let Some(base) = label.strip_suffix(ACTIVATED_SUFFIX) {
            (base, SignalVariant::Activated)
        } else {
            (label, SignalVariant::Bare)
        }
    }

    pub fn label_for(self, logical_name: &str) -> String {
        match self {
            SignalVariant::Raw => format!("{logical_name}{RAW_SUFFIX}"),
            SignalVariant::Activated => format!("{logical_name}{ACTIVATED_SUFFIX}"),
            SignalVariant::Bare => logical_name.to_string(),
        }
    }
}

/// One analog channel of a recording
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    label: String,
    sampling_rate: f64,
    samples: Vec<f64>,
}

impl Channel {
    /// Create a channel, rejecting non-finite or non-positive rates
    pub fn new(
        label: impl Into<String>,
        sampling_rate: f64,
        samples: Vec<f64>,
    ) -> Result<Self, AnalysisError> {
        let label = label.into();
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(AnalysisError::InvalidSamplingRate {
                label,
                rate: sampling_rate,
            });
        }
        Ok(Self {
            label,
            sampling_rate,
            samples,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time of each sample in seconds
    pub fn time_axis(&self) -> Vec<f64> {
        (0..self.samples.len())
            .map(|i| i as f64 / self.sampling_rate)
            .collect()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sampling_rate
    }
}

/// All variants recorded for one muscle
#[derive(Debug, Clone, Copy)]
pub struct LogicalChannel<'a> {
    pub name: &'a str,
    pub raw: Option<&'a Channel>,
    pub activated: Option<&'a Channel>,
    pub bare: Option<&'a Channel>,
}

impl<'a> LogicalChannel<'a> {
    /// Signal used for contraction detection: activated, then raw, then bare
    pub fn detection_signal(&self) -> Option<(&'a Channel, SignalVariant)> {
        self.activated
            .map(|c| (c, SignalVariant::Activated))
            .or_else(|| self.raw.map(|c| (c, SignalVariant::Raw)))
            .or_else(|| self.bare.map(|c| (c, SignalVariant::Bare)))
    }
}

/// Label-ordered collection of channels from one recording
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSet {
    channels: BTreeMap<String, Channel>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a channel, replacing any channel with the same label
    pub fn insert(&mut self, channel: Channel) {
        self.channels.insert(channel.label.clone(), channel);
    }

    pub fn get(&self, label: &str) -> Option<&Channel> {
        self.channels.get(label)
    }

    pub fn labels(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Group channels by logical name, sorted by that name
    pub fn logical_channels(&self) -> Vec<LogicalChannel<'_>> {
        let mut groups: BTreeMap<&str, LogicalChannel<'_>> = BTreeMap::new();
        for channel in self.channels.values() {
            let (name, variant) = SignalVariant::classify(&channel.label);
            let entry = groups.entry(name).or_insert(LogicalChannel {
                name,
                raw: None,
                activated: None,
                bare: None,
            });
            match variant {
                SignalVariant::Raw => entry.raw = Some(channel),
                SignalVariant::Activated => entry.activated = Some(channel),
                SignalVariant::Bare => entry.bare = Some(channel),
            }
        }
        groups.into_values().collect()
    }
}

impl FromIterator<Channel> for ChannelSet {
    fn from_iter<I: IntoIterator<Item = Channel>>(iter: I) -> Self {
        let mut set = ChannelSet::new();
        for channel in iter {
            set.insert(channel);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(label: &str) -> Channel {
        Channel::new(label, 1000.0, vec![0.0; 10]).unwrap()
    }

    #[test]
    fn test_classify_labels() {
        assert_eq!(
            SignalVariant::classify("CH1 Raw"),
            ("CH1", SignalVariant::Raw)
        );
        assert_eq!(
            SignalVariant::classify("CH1 activated"),
            ("CH1", SignalVariant::Activated)
        );
        assert_eq!(SignalVariant::classify("EMG2"), ("EMG2", SignalVariant::Bare));
        assert_eq!(SignalVariant::Raw.label_for("CH2"), "CH2 Raw");
    }

    #[test]
    fn test_rejects_invalid_sampling_rate() {
        assert!(Channel::new("CH1 Raw", 0.0, vec![1.0]).is_err());
        assert!(Channel::new("CH1 Raw", -10.0, vec![1.0]).is_err());
        assert!(Channel::new("CH1 Raw", f64::NAN, vec![1.0]).is_err());
    }

    #[test]
    fn test_time_axis() {
        let ch = Channel::new("CH1 Raw", 4.0, vec![0.0; 5]).unwrap();
        assert_eq!(ch.time_axis(), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(ch.duration_secs(), 1.25);
    }

    #[test]
    fn test_logical_grouping_and_detection_priority() {
        let set: ChannelSet = ["CH1 Raw", "CH1 activated", "CH2 Raw", "EMG3"]
            .into_iter()
            .map(channel)
            .collect();

        let logical = set.logical_channels();
        let names: Vec<&str> = logical.iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["CH1", "CH2", "EMG3"]);

        let (ch1, variant) = logical[0].detection_signal().unwrap();
        assert_eq!(ch1.label(), "CH1 activated");
        assert_eq!(variant, SignalVariant::Activated);

        let (_, variant) = logical[1].detection_signal().unwrap();
        assert_eq!(variant, SignalVariant::Raw);

        let (_, variant) = logical[2].detection_signal().unwrap();
        assert_eq!(variant, SignalVariant::Bare);
        assert!(logical[2].raw.is_none());
    }
}
