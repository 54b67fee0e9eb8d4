//! Mean/variance, z-score conversions, histogram binning and stable
//! sort-by-index, the shared statistics vocabulary used by the prune and
//! cluster-size stages.

/// Population mean and variance (`variance = sum((x - mean)^2) / n`).
/// Returns `(0.0, 0.0)` for an empty slice.
pub fn mean_variance(xs: &[f64]) -> (f64, f64) {
    if xs.is_empty() {
        return (0.0, 0.0);
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let variance = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

/// `(x - mean) / sqrt(variance)`, guarded against a degenerate distribution
/// by returning `0.0` when `variance == 0.0`.
pub fn z_score(mean: f64, variance: f64, x: f64) -> f64 {
    if variance == 0.0 {
        return 0.0;
    }
    (x - mean) / variance.sqrt()
}

/// Inverse of [`z_score`]: `mean + z * sqrt(variance)`.
pub fn from_z(mean: f64, variance: f64, z: f64) -> f64 {
    mean + z * variance.sqrt()
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HistBin {
    /// Inclusive lower bound of the bin, or the overflow threshold for the
    /// final bin.
    pub lower: f64,
    pub count: u64,
    pub is_overflow: bool,
}

/// Bins `[min, min+step, min+2*step, ...]` up to `max`, plus a final
/// overflow bin covering every value strictly greater than `max`.
pub fn histogram(xs: &[f64], min: f64, max: f64, step: f64) -> Vec<HistBin> {
    assert!(step > 0.0, "histogram step must be positive");

    let mut lowers = Vec::new();
    let mut lower = min;
    while lower <= max {
        lowers.push(lower);
        lower += step;
    }
    if lowers.is_empty() {
        lowers.push(min);
    }

    let mut bins: Vec<HistBin> = lowers
        .iter()
        .map(|&lower| HistBin {
            lower,
            count: 0,
            is_overflow: false,
        })
        .collect();
    bins.push(HistBin {
        lower: max,
        count: 0,
        is_overflow: true,
    });

    for &x in xs {
        if x > max {
            bins.last_mut().unwrap().count += 1;
            continue;
        }
        // Last non-overflow bin whose lower bound is <= x.
        let idx = bins[..bins.len() - 1]
            .iter()
            .rposition(|b| b.lower <= x)
            .unwrap_or(0);
        bins[idx].count += 1;
    }

    bins
}

/// Trims leading/trailing zero-count bins when more than three bins exist,
/// always preserving at least one bin.
pub fn clean_histogram(bins: Vec<HistBin>) -> Vec<HistBin> {
    if bins.len() <= 3 {
        return bins;
    }

    let mut start = 0;
    let mut end = bins.len();
    while end - start > 1 && bins[start].count == 0 {
        start += 1;
    }
    while end - start > 1 && bins[end - 1].count == 0 {
        end -= 1;
    }
    bins[start..end].to_vec()
}

/// Equal-width bin count used when bounds aren't supplied by the caller.
const AUTO_HISTOGRAM_BINS: f64 = 10.0;

/// Bins `xs` with bounds derived from the data itself, `[0, max(xs)]` split
/// into `AUTO_HISTOGRAM_BINS` equal-width bins, then trimmed with
/// `clean_histogram`. The stage 2/stage 4 entry point: the pipeline has no
/// caller-supplied min/max/step, so it bins the distribution it just
/// computed rather than skipping the histogram stage.
pub fn auto_histogram(xs: &[f64]) -> Vec<HistBin> {
    if xs.is_empty() {
        return Vec::new();
    }
    let max = xs.iter().cloned().fold(0.0_f64, f64::max);
    let step = if max > 0.0 { max / AUTO_HISTOGRAM_BINS } else { 1.0 };
    clean_histogram(histogram(xs, 0.0, max, step))
}

/// Descending stable sort of `items` by `idx(item)`; ties keep input order.
pub fn sort_by_index<T, F>(mut items: Vec<T>, idx: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| {
        idx(b)
            .partial_cmp(&idx(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variance_of_constant_is_zero() {
        let (mean, variance) = mean_variance(&[3.0, 3.0, 3.0]);
        assert_eq!(mean, 3.0);
        assert_eq!(variance, 0.0);
        assert_eq!(z_score(mean, variance, 3.0), 0.0);
    }

    #[test]
    fn z_round_trips_through_from_z() {
        let (mean, variance) = mean_variance(&[1.0, 2.0, 3.0, 4.0]);
        let z = z_score(mean, variance, 3.5);
        let raw = from_z(mean, variance, z);
        assert!((raw - 3.5).abs() < 1e-9);
    }

    #[test]
    fn sort_by_index_is_stable_on_ties() {
        let items = vec![("a", 1.0), ("b", 1.0), ("c", 2.0)];
        let sorted = sort_by_index(items, |(_, v)| *v);
        assert_eq!(sorted, vec![("c", 2.0), ("a", 1.0), ("b", 1.0)]);
    }

    #[test]
    fn histogram_overflow_bin_catches_above_max() {
        let bins = histogram(&[0.1, 0.5, 1.5], 0.0, 1.0, 0.5);
        assert_eq!(bins.last().unwrap().count, 1);
        assert!(bins.last().unwrap().is_overflow);
    }

    #[test]
    fn auto_histogram_derives_bounds_from_the_data() {
        let bins = auto_histogram(&[0.0, 0.1, 5.0, 9.9, 10.0]);
        let total: u64 = bins.iter().map(|b| b.count).sum();
        assert_eq!(total, 5);
        assert!(!bins.last().unwrap().is_overflow || bins.last().unwrap().count == 0);
    }

    #[test]
    fn auto_histogram_of_empty_input_is_empty() {
        assert!(auto_histogram(&[]).is_empty());
    }

    #[test]
    fn auto_histogram_of_all_zeros_does_not_panic_on_zero_step() {
        let bins = auto_histogram(&[0.0, 0.0, 0.0]);
        let total: u64 = bins.iter().map(|b| b.count).sum();
        assert_eq!(total, 3);
    }
}
