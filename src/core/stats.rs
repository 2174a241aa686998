//! Pure numeric routines behind the chart reducers: z-score outlier
//! detection, percentage normalisation and rank-based downsampling.

use std::cmp::Ordering;

/// The z-score search stops stepping down once the cutoff reaches this.
const MIN_Z_CUTOFF: f64 = 1.0;
const Z_STEP: f64 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutlierOptions {
    /// Mark exactly this many of the most outlying values instead of using a cutoff.
    pub top_n: Option<usize>,
    pub z_cutoff: f64,
    /// Declared lower bound, mixed into the statistics as a sentinel.
    pub min_bound: Option<f64>,
    /// Declared upper bound, mixed into the statistics as a sentinel.
    pub max_bound: Option<f64>,
}

impl Default for OutlierOptions {
    fn default() -> Self {
        Self {
            top_n: None,
            z_cutoff: 2.0,
            min_bound: None,
            max_bound: None,
        }
    }
}

/// Population mean and standard deviation. `None` for an empty slice.
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}

/// Absolute z-scores; all zeros when the spread is zero.
pub fn abs_z_scores(values: &[f64]) -> Vec<f64> {
    match mean_std(values) {
        Some((mean, std)) if std > 0.0 && !is_constant(values) => {
            values.iter().map(|v| ((v - mean) / std).abs()).collect()
        }
        _ => vec![0.0; values.len()],
    }
}

fn is_constant(values: &[f64]) -> bool {
    match values.first() {
        Some(first) => values.iter().all(|v| v == first),
        None => true,
    }
}

/// Flags statistically unusual values.
///
/// The declared bounds are appended as extra samples before computing the
/// statistics, so values clustered tightly near one end of a fixed scale are
/// not called outliers among themselves. The returned mask is aligned with
/// `values` and never includes the sentinels.
pub fn detect_outliers(values: &[f64], opts: &OutlierOptions) -> Vec<bool> {
    let n = values.len();
    if n == 0 || opts.top_n == Some(0) {
        return vec![false; n];
    }

    let mut all = Vec::with_capacity(n + 2);
    all.extend_from_slice(values);
    all.extend(opts.min_bound);
    all.extend(opts.max_bound);
    let n_sentinels = all.len() - n;

    let Some((mean, std)) = mean_std(&all) else {
        return vec![false; n];
    };
    if std == 0.0 || is_constant(&all) {
        tracing::debug!(points = all.len(), "all points have the same value");
        return vec![false; n];
    }
    let z: Vec<f64> = all.iter().map(|v| ((v - mean) / std).abs()).collect();

    let mut mask = vec![false; n];
    if let Some(top_n) = opts.top_n {
        // Sentinels shape the statistics but are never candidates.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| z[b].total_cmp(&z[a]));
        for &i in order.iter().take(top_n) {
            mask[i] = true;
        }
        return mask;
    }

    let mut cutoff = opts.z_cutoff;
    let mut hits = z.iter().filter(|&&s| s > cutoff).count();
    while hits <= n_sentinels && cutoff > MIN_Z_CUTOFF {
        cutoff -= Z_STEP;
        hits = z.iter().filter(|&&s| s > cutoff).count();
    }
    for (i, flag) in mask.iter_mut().enumerate() {
        *flag = z[i] > cutoff;
    }
    mask
}

/// Per-sample percentages across categories.
///
/// `columns[c][i]` is category `c` at sample `i`. The denominator is the sum
/// of absolute non-NaN values at that sample, so negative contributions keep
/// their sign. A zero denominator yields 0 for every category. Short columns
/// are treated as zero-padded.
pub fn percentages_of(columns: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = columns.iter().map(Vec::len).max().unwrap_or(0);
    let mut sums = vec![0.0f64; n];
    for col in columns {
        for (i, v) in col.iter().enumerate() {
            if !v.is_nan() {
                sums[i] += v.abs();
            }
        }
    }
    columns
        .iter()
        .map(|col| {
            (0..n)
                .map(|i| {
                    let v = col.get(i).copied().unwrap_or(0.0);
                    if sums[i] == 0.0 {
                        0.0
                    } else {
                        v / sums[i] * 100.0
                    }
                })
                .collect()
        })
        .collect()
}

/// Systematic rank-order thinning to at most `cap` entries.
///
/// Entries are stably sorted by `cmp`, then every `ceil(n / cap)`-th entry is
/// kept. With room for two or more entries the top-ranked one replaces the
/// last stride pick, so both extremes are preserved. Output is in rank order.
pub fn rank_downsample_by<T, F>(entries: &[T], cap: usize, mut cmp: F) -> Vec<T>
where
    T: Clone,
    F: FnMut(&T, &T) -> Ordering,
{
    let n = entries.len();
    if n <= cap {
        return entries.to_vec();
    }
    if cap == 0 {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| cmp(&entries[a], &entries[b]));

    let step = n.div_ceil(cap);
    let mut picked: Vec<usize> = order.iter().copied().step_by(step).collect();
    let len = picked.len();
    if len >= 2 {
        picked[len - 1] = order[n - 1];
    }
    picked.into_iter().map(|i| entries[i].clone()).collect()
}

/// [`rank_downsample_by`] over `(sample, value)` pairs ordered by value.
pub fn rank_downsample<K: Clone>(entries: &[(K, f64)], cap: usize) -> Vec<(K, f64)> {
    rank_downsample_by(entries, cap, |a, b| a.1.total_cmp(&b.1))
}

/// Min and max over the finite values, if any.
pub fn finite_extent<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    let mut min_v = f64::INFINITY;
    let mut max_v = f64::NEG_INFINITY;
    for v in values {
        if !v.is_finite() {
            continue;
        }
        if v < min_v {
            min_v = v;
        }
        if v > max_v {
            max_v = v;
        }
    }
    if min_v.is_finite() && max_v.is_finite() {
        Some((min_v, max_v))
    } else {
        None
    }
}
