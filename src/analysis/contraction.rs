// ContractionDetector - threshold-based burst detection on the EMG envelope
//
// Algorithm:
// 1. Rectify and smooth (centered moving average, same length)
// 2. Detection threshold = max(smoothed) × threshold_factor
// 3. Active mask: smoothed > threshold
// 4. Rising edges start an interval, falling edges end it (index of the first
//    sample below threshold). Activity at the borders synthesizes a start at
//    0 or an end at len-1.
// 5. Drop intervals shorter than the minimum duration, then apply refractory
//    gating against the previously accepted interval
// 6. Merge intervals whose gap is at most the merge gap
// 7. Measure each interval on the rectified signal [start, end] inclusive
//    and grade it against the effort threshold when one is given

use crate::analysis::conditioning::condition;
use crate::config::DetectionConfig;
use crate::models::{ContractionEvent, GoodFlag};

/// Smoothed maxima below this are treated as a silent signal
const SILENCE_FLOOR: f64 = 1e-9;

/// Detected events with aggregate statistics
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContractionSummary {
    pub contraction_count: usize,
    pub avg_duration_ms: f64,
    pub min_duration_ms: f64,
    pub max_duration_ms: f64,
    pub total_time_under_tension_ms: f64,
    /// Mean of the per-event mean amplitudes
    pub avg_amplitude: f64,
    /// Max of the per-event max amplitudes
    pub max_amplitude: f64,
    pub contractions: Vec<ContractionEvent>,
    /// `None` exactly when no effort threshold was supplied
    pub good_contraction_count: Option<usize>,
    pub effort_threshold: Option<f64>,
}

impl ContractionSummary {
    /// Summary with no events
    pub fn empty(effort_threshold: Option<f64>) -> Self {
        Self {
            good_contraction_count: effort_threshold.map(|_| 0),
            effort_threshold,
            ..Self::default()
        }
    }

    /// Build aggregates from an ordered list of events, grading each one
    pub fn from_events(events: Vec<ContractionEvent>, effort_threshold: Option<f64>) -> Self {
        if events.is_empty() {
            return Self::empty(effort_threshold);
        }

        let count = events.len();
        let durations = events.iter().map(|e| e.duration_ms);
        let total: f64 = durations.clone().sum();
        let min = durations.clone().fold(f64::INFINITY, f64::min);
        let max = durations.fold(f64::NEG_INFINITY, f64::max);
        let avg_amplitude = events.iter().map(|e| e.mean_amplitude).sum::<f64>() / count as f64;
        let max_amplitude = events
            .iter()
            .map(|e| e.max_amplitude)
            .fold(f64::NEG_INFINITY, f64::max);

        let mut summary = Self {
            contraction_count: count,
            avg_duration_ms: total / count as f64,
            min_duration_ms: min,
            max_duration_ms: max,
            total_time_under_tension_ms: total,
            avg_amplitude,
            max_amplitude,
            contractions: events,
            good_contraction_count: None,
            effort_threshold: None,
        };
        summary.reflag(effort_threshold);
        summary
    }

    /// Re-grade the stored events against a new threshold
    ///
    /// Only flags, the good count and the stored threshold change; event
    /// boundaries and amplitudes stay as detected.
    pub fn reflag(&mut self, effort_threshold: Option<f64>) {
        for event in &mut self.contractions {
            event.is_good = GoodFlag::grade(event.max_amplitude, effort_threshold);
        }
        self.good_contraction_count = count_good(&self.contractions, effort_threshold);
        self.effort_threshold = effort_threshold;
    }
}

/// Number of good events, or `None` when there is no threshold to grade by
pub fn count_good(events: &[ContractionEvent], effort_threshold: Option<f64>) -> Option<usize> {
    effort_threshold.map(|_| events.iter().filter(|e| e.is_good.is_good()).count())
}

/// Threshold-based contraction detector
#[derive(Debug, Clone, Default)]
pub struct ContractionDetector {
    config: DetectionConfig,
}

impl ContractionDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detect contraction events in `signal`
    ///
    /// # Arguments
    /// * `signal` - Bipolar EMG samples
    /// * `sampling_rate` - Samples per second
    /// * `effort_threshold` - Amplitude a peak must reach to count as good
    ///
    /// # Returns
    /// Summary of the detected events. Degenerate input (too short, silent,
    /// invalid rate or factor) yields a summary with no events.
    pub fn detect(
        &self,
        signal: &[f64],
        sampling_rate: f64,
        effort_threshold: Option<f64>,
    ) -> ContractionSummary {
        let window = self.config.smoothing_window;
        if window == 0 || signal.len() < window {
            log::debug!(
                "[ContractionDetector] Signal of {} samples shorter than smoothing window {}",
                signal.len(),
                window
            );
            return ContractionSummary::empty(effort_threshold);
        }
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            log::warn!(
                "[ContractionDetector] Invalid sampling rate {}, skipping detection",
                sampling_rate
            );
            return ContractionSummary::empty(effort_threshold);
        }
        let factor = self.config.threshold_factor;
        if factor.is_nan() || factor <= 0.0 {
            log::warn!(
                "[ContractionDetector] Invalid threshold factor {}, skipping detection",
                factor
            );
            return ContractionSummary::empty(effort_threshold);
        }
        let factor = factor.min(1.0);

        let conditioned = condition(signal, window);
        let peak = conditioned
            .smoothed
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if !(peak >= SILENCE_FLOOR) {
            return ContractionSummary::empty(effort_threshold);
        }

        let detection_threshold = peak * factor;
        let active: Vec<bool> = conditioned
            .smoothed
            .iter()
            .map(|&v| v > detection_threshold)
            .collect();

        let min_samples = ms_to_samples(self.config.min_duration_ms, sampling_rate);
        let refractory_samples = ms_to_samples(self.config.refractory_ms, sampling_rate);
        let merge_samples = ms_to_samples(self.config.merge_gap_ms, sampling_rate);

        let intervals = active_intervals(&active);
        let intervals = gate_intervals(&intervals, min_samples, refractory_samples);
        let intervals = merge_intervals(intervals, merge_samples);

        let to_ms = |idx: usize| idx as f64 / sampling_rate * 1000.0;
        let events = intervals
            .into_iter()
            .map(|(start, end)| {
                let segment = &conditioned.rectified[start..=end];
                let mean = segment.iter().sum::<f64>() / segment.len() as f64;
                let max = segment.iter().copied().fold(0.0, f64::max);
                ContractionEvent {
                    start_time_ms: to_ms(start),
                    end_time_ms: to_ms(end),
                    duration_ms: to_ms(end - start),
                    mean_amplitude: mean,
                    max_amplitude: max,
                    is_good: GoodFlag::Undetermined,
                }
            })
            .collect();

        ContractionSummary::from_events(events, effort_threshold)
    }
}

/// Milliseconds to whole samples, truncating
pub fn ms_to_samples(ms: f64, sampling_rate: f64) -> usize {
    (ms / 1000.0 * sampling_rate) as usize
}

/// Start/end indices of above-threshold runs
fn active_intervals(active: &[bool]) -> Vec<(usize, usize)> {
    let Some(&last) = active.last() else {
        return Vec::new();
    };

    let mut starts = Vec::new();
    let mut ends = Vec::new();
    if active[0] {
        starts.push(0);
    }
    for (i, pair) in active.windows(2).enumerate() {
        match (pair[0], pair[1]) {
            (false, true) => starts.push(i + 1),
            (true, false) => ends.push(i + 1),
            _ => {}
        }
    }
    if last {
        ends.push(active.len() - 1);
    }

    pair_edges(&starts, &ends)
}

/// Pair each start with the nearest end after it
///
/// Starts that fall inside an already paired interval are skipped and
/// starts without a following end are dropped.
fn pair_edges(starts: &[usize], ends: &[usize]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::with_capacity(starts.len().min(ends.len()));
    let mut ends = ends.iter().copied().peekable();
    let mut consumed_until: Option<usize> = None;

    for &start in starts {
        if consumed_until.is_some_and(|end| start <= end) {
            continue;
        }
        while ends.next_if(|&end| end <= start).is_some() {}
        match ends.next() {
            Some(end) => {
                pairs.push((start, end));
                consumed_until = Some(end);
            }
            None => break,
        }
    }
    pairs
}

/// Minimum-duration filter followed by refractory gating
fn gate_intervals(
    intervals: &[(usize, usize)],
    min_samples: usize,
    refractory_samples: usize,
) -> Vec<(usize, usize)> {
    let mut accepted: Vec<(usize, usize)> = Vec::with_capacity(intervals.len());
    for &(start, end) in intervals {
        if end - start < min_samples {
            continue;
        }
        if refractory_samples > 0 {
            if let Some(&(_, last_end)) = accepted.last() {
                if start.saturating_sub(last_end) < refractory_samples {
                    continue;
                }
            }
        }
        accepted.push((start, end));
    }
    accepted
}

/// Fuse neighbours separated by at most `merge_samples`
fn merge_intervals(intervals: Vec<(usize, usize)>, merge_samples: usize) -> Vec<(usize, usize)> {
    if merge_samples == 0 {
        return intervals;
    }
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(prev) if start - prev.1 <= merge_samples => prev.1 = end,
            _ => merged.push((start, end)),
        }
    }
    merged
}

#[cfg(test)]
#[path = "contraction_tests.rs"]
mod tests;
