// Effort threshold resolution
//
// The amplitude a contraction must reach is MVC value × percentage / 100.
// Both factors may come from the channel entry or the global default. The
// tiers are tried in a fixed order and the first fully defined one wins:
//
// 1. channel value × channel percentage
// 2. channel value × global percentage
// 3. global value × global percentage

use serde::{Deserialize, Serialize};

use crate::session::params::SessionParameters;

/// Which pair of parameters produced a threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdTier {
    ChannelValueChannelPercentage,
    ChannelValueGlobalPercentage,
    GlobalValueGlobalPercentage,
}

/// Resolved amplitude cutoff and its origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedThreshold {
    pub value: f64,
    pub tier: ThresholdTier,
}

/// Resolve the effort threshold for `channel`, or `None` when no tier is
/// fully defined
pub fn resolve_effort_threshold(
    params: &SessionParameters,
    channel: &str,
) -> Option<ResolvedThreshold> {
    let channel_value = params.channel_mvc_value(channel);
    let channel_pct = params.channel_threshold_percentage(channel);
    let global_value = params.session_mvc_value;
    let global_pct = params.session_mvc_threshold_percentage;

    [
        (
            ThresholdTier::ChannelValueChannelPercentage,
            channel_value.zip(channel_pct),
        ),
        (
            ThresholdTier::ChannelValueGlobalPercentage,
            channel_value.zip(global_pct),
        ),
        (
            ThresholdTier::GlobalValueGlobalPercentage,
            global_value.zip(global_pct),
        ),
    ]
    .into_iter()
    .find_map(|(tier, pair)| {
        pair.map(|(value, pct)| ResolvedThreshold {
            value: value * pct / 100.0,
            tier,
        })
    })
}
