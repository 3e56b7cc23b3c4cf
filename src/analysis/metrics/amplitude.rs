// Amplitude metrics - time-domain magnitude of the raw signal

/// Root mean square, 0 for empty input
pub fn rms(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = signal.iter().map(|x| x * x).sum();
    (sum_sq / signal.len() as f64).sqrt()
}

/// Mean absolute value, 0 for empty input
pub fn mav(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().map(|x| x.abs()).sum::<f64>() / signal.len() as f64
}
