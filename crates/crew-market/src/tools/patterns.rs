//! Peak detection and chart pattern recognition over closing prices

/// Price tolerance for double tops and bottoms
const DOUBLE_TOLERANCE: f64 = 0.03;

/// Minimum spacing between peaks for a series of `len` points
pub fn peak_distance(len: usize) -> usize {
    (len / 20).max(5)
}

/// Indices of local maxima at least `distance` apart.
///
/// Flat tops count once, at their middle. When two maxima are closer than
/// `distance` the higher one wins. Returned indices are ascending.
pub fn find_peaks(values: &[f64], distance: usize) -> Vec<usize> {
    let candidates = local_maxima(values);
    if distance <= 1 || candidates.len() < 2 {
        return candidates;
    }

    let mut keep = vec![true; candidates.len()];
    let mut by_height: Vec<usize> = (0..candidates.len()).collect();
    by_height.sort_by(|&a, &b| {
        values[candidates[b]]
            .partial_cmp(&values[candidates[a]])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.cmp(&a))
    });

    for &i in &by_height {
        if !keep[i] {
            continue;
        }
        let center = candidates[i];
        for k in (0..i).rev() {
            if center - candidates[k] >= distance {
                break;
            }
            keep[k] = false;
        }
        for k in i + 1..candidates.len() {
            if candidates[k] - center >= distance {
                break;
            }
            keep[k] = false;
        }
    }

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(idx, kept)| kept.then_some(idx))
        .collect()
}

/// Indices of local minima, with the same rules as [`find_peaks`]
pub fn find_troughs(values: &[f64], distance: usize) -> Vec<usize> {
    let negated: Vec<f64> = values.iter().map(|v| -v).collect();
    find_peaks(&negated, distance)
}

fn local_maxima(values: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if values.len() < 3 {
        return peaks;
    }

    let last = values.len() - 1;
    let mut i = 1;
    while i < last {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < last && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Named patterns visible in the closing prices
pub fn identify_chart_patterns(close: &[f64]) -> Vec<String> {
    let mut patterns = Vec::new();
    if close.len() < 30 {
        return patterns;
    }

    let distance = peak_distance(close.len());
    let peaks = find_peaks(close, distance);
    let troughs = find_troughs(close, distance);

    if is_head_and_shoulders(close, &peaks) {
        patterns.push("Head and Shoulders".to_string());
    }
    if close.len() >= 40 && last_two_within_tolerance(close, &peaks) {
        patterns.push("Double Top".to_string());
    }
    if close.len() >= 40 && last_two_within_tolerance(close, &troughs) {
        patterns.push("Double Bottom".to_string());
    }
    patterns
}

fn is_head_and_shoulders(close: &[f64], peaks: &[usize]) -> bool {
    if close.len() < 60 || peaks.len() < 3 {
        return false;
    }
    let [left, head, right] = [
        peaks[peaks.len() - 3],
        peaks[peaks.len() - 2],
        peaks[peaks.len() - 1],
    ];
    close[head] > close[left] && close[head] > close[right]
}

fn last_two_within_tolerance(close: &[f64], extrema: &[usize]) -> bool {
    if extrema.len() < 2 {
        return false;
    }
    let prev = close[extrema[extrema.len() - 2]];
    let last = close[extrema[extrema.len() - 1]];
    prev != 0.0 && ((last - prev) / prev).abs() < DOUBLE_TOLERANCE
}
