// Session module - grading parameters and effort threshold resolution
//
// This module provides two main components:
// 1. SessionParameters: MVC values, percentages and targets for one session
// 2. resolve_effort_threshold: the ordered fallback from channel-specific to
//    global values that turns those parameters into an amplitude cutoff

pub mod params;
pub mod threshold;

pub use params::SessionParameters;
pub use threshold::{resolve_effort_threshold, ResolvedThreshold, ThresholdTier};
