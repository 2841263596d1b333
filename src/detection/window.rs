// Trailing-window statistics over sequences with gaps.
//
// Each window covers positions `[i + 1 - size, i]`, shortened at the start
// of the sequence. Missing values are skipped inside a window rather than
// poisoning it.

/// Mean and population standard deviation (divisor = count) of one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    /// True when every value in the window is identical
    pub constant: bool,
}

/// Slices of the trailing windows of `values`, one per position.
pub fn trailing_windows<T>(values: &[T], size: usize) -> impl Iterator<Item = &[T]> {
    let size = size.max(1);
    (0..values.len()).map(move |i| &values[(i + 1).saturating_sub(size)..=i])
}

/// Statistics over the present values of a window, `None` if it has fewer than `min_count`.
pub fn window_stats(window: &[Option<f64>], min_count: usize) -> Option<WindowStats> {
    let present: Vec<f64> = window.iter().flatten().copied().collect();
    if present.is_empty() || present.len() < min_count {
        return None;
    }

    let count = present.len();
    let mean = present.iter().sum::<f64>() / count as f64;
    let var = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
    let first = present[0];
    let constant = present.iter().all(|v| *v == first);

    Some(WindowStats {
        count,
        mean,
        std: var.sqrt(),
        constant,
    })
}

/// Rolling stats for every position of `values`.
pub fn rolling_stats(values: &[Option<f64>], size: usize) -> Vec<Option<WindowStats>> {
    trailing_windows(values, size)
        .map(|w| window_stats(w, 1))
        .collect()
}
