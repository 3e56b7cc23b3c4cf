// SignalConditioner - rectification and envelope smoothing
//
// Contraction detection works on the amplitude envelope rather than the
// bipolar signal. The envelope is obtained by full-wave rectification
// followed by a centered moving average whose output has the same length
// as the input (zero padding at both edges, constant divisor).

/// Rectified signal and its smoothed envelope
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionedSignal {
    pub rectified: Vec<f64>,
    pub smoothed: Vec<f64>,
}

/// Full-wave rectification: |x[n]|
pub fn rectify(signal: &[f64]) -> Vec<f64> {
    signal.iter().map(|x| x.abs()).collect()
}

/// Centered moving average with "same" length output
///
/// Equivalent to convolving with a box kernel of `window` taps of value
/// `1/window` and keeping the central `signal.len()` samples. For even
/// windows the kernel sits one sample to the left of center.
///
/// # Arguments
/// * `signal` - Input samples
/// * `window` - Kernel width in samples (clamped to at least 1)
pub fn moving_average_same(signal: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    // prefix[i] = sum of signal[..i]
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &x in signal {
        acc += x;
        prefix.push(acc);
    }

    let offset = (window - 1) / 2;
    let scale = 1.0 / window as f64;
    (0..n)
        .map(|i| {
            // Kernel covers signal[i + offset + 1 - window ..= i + offset]
            let hi = (i + offset + 1).min(n);
            let lo = (i + offset + 1).saturating_sub(window);
            (prefix[hi] - prefix[lo]) * scale
        })
        .collect()
}

/// Rectify then smooth
pub fn condition(signal: &[f64], window: usize) -> ConditionedSignal {
    let rectified = rectify(signal);
    let smoothed = moving_average_same(&rectified, window);
    ConditionedSignal {
        rectified,
        smoothed,
    }
}
