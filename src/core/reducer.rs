//! Per-metric reduction: classify, prune non-finite values, pick the point
//! policy and thin the primary series.

use crate::core::model::{MetricSeries, RawValue, SampleId, SampleValues};
use crate::core::settings::Settings;
use crate::core::stats::{self, OutlierOptions};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Integer,
    Float,
    /// At least one value is not a number.
    Mixed,
}

impl ValueKind {
    pub fn classify<'a, I: IntoIterator<Item = &'a RawValue>>(values: I) -> Self {
        let mut kind = ValueKind::Integer;
        for v in values {
            match v {
                RawValue::Text(_) => return ValueKind::Mixed,
                RawValue::Float(_) => kind = ValueKind::Float,
                RawValue::Int(_) => {}
            }
        }
        kind
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, ValueKind::Mixed)
    }
}

/// Which per-sample points accompany the primary visual.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointPolicy {
    ShowAll,
    ShowNone,
    OutliersOnly,
}

impl PointPolicy {
    /// Chosen from the pruned series size, not the dataset size.
    pub fn select(n: usize, kind: ValueKind, cfg: &ReducerConfig) -> Self {
        if n <= cfg.show_points_threshold {
            PointPolicy::ShowAll
        } else if n <= cfg.outliers_only_threshold {
            PointPolicy::ShowNone
        } else if kind.is_numeric() {
            PointPolicy::OutliersOnly
        } else {
            PointPolicy::ShowNone
        }
    }

    pub fn shows_points(self) -> bool {
        !matches!(self, PointPolicy::ShowNone)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReducerConfig {
    pub show_points_threshold: usize,
    pub outliers_only_threshold: usize,
    pub downsample_cap: Option<usize>,
    pub z_cutoff: f64,
}

impl ReducerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            show_points_threshold: settings.violin_show_points_threshold,
            outliers_only_threshold: settings.violin_outliers_only_threshold,
            downsample_cap: settings.violin_downsample_after,
            z_cutoff: settings.outlier_z_cutoff,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReducedSeries {
    pub kind: ValueKind,
    pub policy: PointPolicy,
    /// Input values with non-finite numbers removed, in input order.
    pub values: SampleValues<RawValue>,
    /// Primary visual values, rank-ordered and capped.
    pub primary: Vec<(SampleId, RawValue)>,
    /// Aligned with `values`; all false unless the policy is `OutliersOnly`.
    pub outlier_mask: Vec<bool>,
    /// Point layer; exempt from the downsample cap.
    pub points: Vec<(SampleId, RawValue)>,
    pub dropped_non_finite: usize,
}

impl ReducedSeries {
    pub fn finite_extent(&self) -> Option<(f64, f64)> {
        stats::finite_extent(self.values.values().filter_map(RawValue::as_f64))
    }
}

fn is_non_finite(v: &RawValue) -> bool {
    matches!(v, RawValue::Float(f) if !f.is_finite())
}

/// Reduces one metric. `None` means the metric has nothing left to show and
/// should be left out of the dataset.
pub fn reduce(series: &MetricSeries, cfg: &ReducerConfig) -> Option<ReducedSeries> {
    if series.values.is_empty() {
        tracing::debug!(metric = %series.title, "no non-empty values found");
        return None;
    }

    let mut values = series.values.clone();
    let before = values.len();
    values.retain(|_, v| !is_non_finite(v));
    let dropped_non_finite = before - values.len();
    if values.is_empty() {
        tracing::warn!(metric = %series.title, "all values are NaN or Inf");
        return None;
    }
    if dropped_non_finite > 0 {
        tracing::warn!(
            metric = %series.title,
            dropped = dropped_non_finite,
            "dropped non-finite values"
        );
    }

    let kind = ValueKind::classify(values.values());
    let policy = PointPolicy::select(values.len(), kind, cfg);

    let mut outlier_mask = vec![false; values.len()];
    let points: Vec<(SampleId, RawValue)> = match policy {
        PointPolicy::ShowAll => values.entries().to_vec(),
        PointPolicy::ShowNone => Vec::new(),
        PointPolicy::OutliersOnly => {
            let numeric: Vec<f64> = values.values().filter_map(RawValue::as_f64).collect();
            outlier_mask = stats::detect_outliers(
                &numeric,
                &OutlierOptions {
                    z_cutoff: cfg.z_cutoff,
                    min_bound: series.dmin,
                    max_bound: series.dmax,
                    ..Default::default()
                },
            );
            values
                .entries()
                .iter()
                .zip(&outlier_mask)
                .filter(|(_, is_outlier)| **is_outlier)
                .map(|(entry, _)| entry.clone())
                .collect()
        }
    };

    let primary = match cfg.downsample_cap {
        Some(cap) if values.len() > cap => {
            tracing::debug!(
                metric = %series.title,
                samples = values.len(),
                cap,
                "downsampling primary series"
            );
            stats::rank_downsample_by(values.entries(), cap, |a, b| a.1.rank_cmp(&b.1))
        }
        _ => values.entries().to_vec(),
    };

    Some(ReducedSeries {
        kind,
        policy,
        values,
        primary,
        outlier_mask,
        points,
        dropped_non_finite,
    })
}
