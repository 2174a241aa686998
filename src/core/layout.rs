use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

pub const VIOLIN_ROW_HEIGHT: u32 = 70;
/// Title and footer space of a row-oriented chart.
pub const ROW_EXTRA_HEIGHT: u32 = 63;

pub const BAR_ROW_HEIGHT: u32 = 12;
pub const BAR_EXTRA_HEIGHT: u32 = 100;
pub const MIN_BAR_HEIGHT: u32 = 300;
pub const MAX_BAR_HEIGHT: u32 = 2560;
pub const HEIGHT_PER_LEGEND_ITEM: u32 = 19;

pub const DEFAULT_PLOT_HEIGHT: u32 = 500;
pub const SCATTER_LEGEND_ITEM_HEIGHT: u32 = 5;

pub const MAX_LEGEND_LABEL: usize = 60;
const TICK_TARGET: usize = 5;
const POINT_PAD_FRACTION: f64 = 0.005;

/// Bounds the renderer may autorange within.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Autorange {
    pub min_allowed: f64,
    pub max_allowed: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AxisPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autorange: Option<Autorange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickvals: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticktext: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticksuffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoverformat: Option<String>,
}

impl AxisPlan {
    /// Range for a numeric metric.
    ///
    /// Declared bounds win over the data extent, end by end, unless that
    /// would invert the range, in which case the extent is used. A collapsed 0..0
    /// range becomes 0..1 with a single tick at 0. With `pad_points` the range
    /// grows by 0.5% of the span on each side so edge points are not clipped.
    pub fn numeric(
        declared: (Option<f64>, Option<f64>),
        extent: Option<(f64, f64)>,
        pad_points: bool,
        suffix: Option<&str>,
    ) -> Self {
        let suffix = suffix.filter(|s| !s.is_empty());
        let mut plan = AxisPlan {
            ticksuffix: suffix.map(str::to_string),
            ..Default::default()
        };
        let mixed = (
            declared.0.or(extent.map(|e| e.0)),
            declared.1.or(extent.map(|e| e.1)),
        );
        let bounds = match mixed {
            (Some(lo), Some(hi)) if hi >= lo => Some((lo, hi)),
            // A declared end on the wrong side of the data is ignored.
            _ => extent,
        };
        let Some((mut lo, mut hi)) = bounds else {
            return plan;
        };

        if lo == 0.0 && hi == 0.0 {
            hi = 1.0;
            plan.tickvals = Some(vec![0.0]);
            plan.ticktext = Some(vec![tick_label(0.0, suffix)]);
        } else {
            if pad_points {
                let pad = (hi - lo) * POINT_PAD_FRACTION;
                lo -= pad;
                hi += pad;
            }
            if hi > lo {
                let ticks = tick_values(lo, hi, TICK_TARGET);
                plan.ticktext = Some(ticks.iter().map(|&t| tick_label(t, suffix)).collect());
                plan.tickvals = Some(ticks);
            }
        }
        plan.range = Some([lo, hi]);
        plan
    }

    /// Indexed category axis: tick `i` is labelled with `categories[i]`.
    pub fn categorical(categories: &[String]) -> Self {
        AxisPlan {
            tickvals: Some((0..categories.len()).map(|i| i as f64).collect()),
            ticktext: Some(categories.to_vec()),
            categories: Some(categories.to_vec()),
            ..Default::default()
        }
    }
}

/// Plot-wide layout shared by every tab of a chart.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlotLayout {
    pub height: u32,
    pub show_legend: bool,
    pub legend_traceorder: &'static str,
    pub legend_on_bottom: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovermode: Option<&'static str>,
    pub x_axis: AxisPlan,
    pub y_axis: AxisPlan,
}

impl Default for PlotLayout {
    fn default() -> Self {
        Self {
            height: DEFAULT_PLOT_HEIGHT,
            show_legend: false,
            legend_traceorder: "normal",
            legend_on_bottom: false,
            barmode: None,
            hovermode: None,
            x_axis: AxisPlan::default(),
            y_axis: AxisPlan::default(),
        }
    }
}

/// Tick grid on 1/2/5 multiples covering `min..max`.
fn nice_ticks(min: f64, max: f64, ticks: usize) -> (f64, f64, usize) {
    let range = (max - min).abs().max(1e-9);
    let rough = range / (ticks.max(2) as f64 - 1.0);
    let mag = 10f64.powf(rough.abs().log10().floor());
    let norm = rough / mag;
    let step = if norm <= 1.0 {
        1.0
    } else if norm <= 2.0 {
        2.0
    } else if norm <= 5.0 {
        5.0
    } else {
        10.0
    } * mag;
    let start = (min / step).floor() * step;
    let end = (max / step).ceil() * step;
    let count = ((end - start) / step).round() as usize + 1;
    (start, step, count)
}

/// Ticks from the nice grid that fall inside `lo..=hi`.
pub fn tick_values(lo: f64, hi: f64, target: usize) -> Vec<f64> {
    let (start, step, count) = nice_ticks(lo, hi, target);
    let eps = step * 1e-9;
    (0..count)
        .map(|i| start + step * i as f64)
        .map(|v| if v.abs() < eps { 0.0 } else { v })
        .filter(|&v| v >= lo - eps && v <= hi + eps)
        .collect()
}

pub fn fmt_tick(v: f64) -> String {
    if (v - v.round()).abs() < 0.001 {
        format!("{}", v.round() as i64)
    } else if v.abs() < 10.0 {
        format!("{:.2}", v)
    } else {
        format!("{:.1}", v)
    }
}

fn tick_label(v: f64, suffix: Option<&str>) -> String {
    format!("{}{}", fmt_tick(v), suffix.unwrap_or(""))
}

/// Height of a chart with one row per series.
pub fn row_chart_height(rows: usize) -> u32 {
    VIOLIN_ROW_HEIGHT * rows as u32 + ROW_EXTRA_HEIGHT
}

/// Height of a horizontal bar chart.
///
/// Grouped mode draws one bar per category inside each sample's slot, so
/// `bars_in_group` multiplies the row count.
pub fn bar_chart_height(max_n_samples: usize, bars_in_group: usize, legend_items: usize) -> u32 {
    let rows = (max_n_samples as u64).saturating_mul(bars_in_group.max(1) as u64);
    let height = rows
        .saturating_mul(BAR_ROW_HEIGHT as u64)
        .saturating_add(BAR_EXTRA_HEIGHT as u64)
        .clamp(MIN_BAR_HEIGHT as u64, MAX_BAR_HEIGHT as u64) as u32;
    let legend_height = (legend_items as u64)
        .saturating_mul(HEIGHT_PER_LEGEND_ITEM as u64)
        .saturating_add(BAR_EXTRA_HEIGHT as u64)
        .min(u32::MAX as u64) as u32;
    height.max(legend_height)
}

/// Marker signature shared by points merged into one legend entry.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct LegendKey {
    pub color: Option<String>,
    pub marker_size: Option<u32>,
    pub marker_line_width: Option<u32>,
    pub group: Option<String>,
}

pub struct LegendItem<'a> {
    pub key: LegendKey,
    pub name: &'a str,
    pub hidden: bool,
}

/// Legend label for each item: `Some` on the first visible item of every
/// signature, `None` elsewhere.
pub fn dedup_legend(items: &[LegendItem<'_>]) -> Vec<Option<String>> {
    let mut names_by_key: HashMap<&LegendKey, BTreeSet<&str>> = HashMap::new();
    for item in items {
        names_by_key.entry(&item.key).or_default().insert(item.name);
    }

    let mut labelled: HashSet<&LegendKey> = HashSet::new();
    items
        .iter()
        .map(|item| {
            if item.hidden || !labelled.insert(&item.key) {
                return None;
            }
            let names: Vec<&str> = names_by_key
                .get(&item.key)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default();
            let mut label = names.join(", ");
            if let Some(group) = item.key.group.as_deref().filter(|g| !g.is_empty()) {
                label = format!("{}: {}", group, label);
            }
            Some(crop_label(&label, MAX_LEGEND_LABEL))
        })
        .collect()
}

fn crop_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_string();
    }
    let mut out: String = label.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_range_is_widened_with_tick_at_zero() {
        let plan = AxisPlan::numeric((Some(0.0), Some(0.0)), None, true, None);
        let [lo, hi] = plan.range.unwrap();
        assert!(hi > lo);
        assert_eq!(plan.tickvals, Some(vec![0.0]));
        assert_eq!(plan.ticktext, Some(vec!["0".to_string()]));
    }

    #[test]
    fn extent_of_zeros_is_also_widened() {
        let plan = AxisPlan::numeric((None, None), Some((0.0, 0.0)), false, Some("%"));
        assert_eq!(plan.range, Some([0.0, 1.0]));
        assert_eq!(plan.ticktext, Some(vec!["0%".to_string()]));
    }

    #[test]
    fn declared_bounds_win_and_points_pad() {
        let plan = AxisPlan::numeric((Some(0.0), Some(100.0)), Some((3.0, 4.0)), true, None);
        let [lo, hi] = plan.range.unwrap();
        assert!((lo + 0.5).abs() < 1e-12);
        assert!((hi - 100.5).abs() < 1e-12);
        assert_eq!(plan.tickvals, Some(vec![0.0, 50.0, 100.0]));
    }

    #[test]
    fn missing_declared_end_uses_extent() {
        let plan = AxisPlan::numeric((Some(0.0), None), Some((2.0, 8.0)), false, None);
        assert_eq!(plan.range, Some([0.0, 8.0]));
    }

    #[test]
    fn one_sided_bound_never_inverts_the_range() {
        let plan = AxisPlan::numeric((Some(0.0), None), Some((-5.0, -1.0)), true, None);
        let [lo, hi] = plan.range.unwrap();
        assert!(hi > lo);
        assert!(lo < -5.0 && hi > -1.0);
        assert!(plan.tickvals.is_some());

        let plan = AxisPlan::numeric((None, Some(10.0)), Some((20.0, 30.0)), false, None);
        assert_eq!(plan.range, Some([20.0, 30.0]));
    }

    #[test]
    fn no_data_no_range() {
        let plan = AxisPlan::numeric((None, None), None, true, Some("x"));
        assert_eq!(plan.range, None);
        assert_eq!(plan.ticksuffix.as_deref(), Some("x"));
    }

    #[test]
    fn tick_formatting() {
        assert_eq!(fmt_tick(5.0), "5");
        assert_eq!(fmt_tick(0.25), "0.25");
        assert_eq!(fmt_tick(12.5), "12.5");
    }

    #[test]
    fn heights() {
        assert_eq!(row_chart_height(3), 70 * 3 + 63);
        let stacked = bar_chart_height(40, 1, 3);
        let grouped = bar_chart_height(40, 3, 3);
        assert!(grouped > stacked);
        assert_eq!(bar_chart_height(1, 1, 0), MIN_BAR_HEIGHT);
        assert_eq!(bar_chart_height(100_000, 4, 0), MAX_BAR_HEIGHT);
        assert_eq!(bar_chart_height(1, 1, 30), 30 * HEIGHT_PER_LEGEND_ITEM + BAR_EXTRA_HEIGHT);
        assert_eq!(bar_chart_height(usize::MAX, usize::MAX, 0), MAX_BAR_HEIGHT);
        assert_eq!(bar_chart_height(400_000_000, 1, 0), MAX_BAR_HEIGHT);
    }

    fn item<'a>(name: &'a str, color: &str, group: Option<&str>) -> LegendItem<'a> {
        LegendItem {
            key: LegendKey {
                color: Some(color.to_string()),
                group: group.map(str::to_string),
                ..Default::default()
            },
            name,
            hidden: false,
        }
    }

    #[test]
    fn legend_entries_are_merged_by_signature() {
        let items = vec![
            item("b", "red", None),
            item("a", "red", None),
            item("c", "blue", Some("EUR")),
        ];
        let labels = dedup_legend(&items);
        assert_eq!(labels[0].as_deref(), Some("a, b"));
        assert_eq!(labels[1], None);
        assert_eq!(labels[2].as_deref(), Some("EUR: c"));
    }

    #[test]
    fn long_legend_labels_are_cropped() {
        let names: Vec<String> = (0..30).map(|i| format!("sample_{:02}", i)).collect();
        let items: Vec<LegendItem<'_>> = names.iter().map(|n| item(n, "grey", None)).collect();
        let label = dedup_legend(&items)[0].clone().unwrap();
        assert_eq!(label.chars().count(), MAX_LEGEND_LABEL);
        assert!(label.ends_with("..."));
    }

    #[test]
    fn hidden_items_do_not_claim_the_entry() {
        let mut first = item("a", "red", None);
        first.hidden = true;
        let labels = dedup_legend(&[first, item("b", "red", None)]);
        assert_eq!(labels[0], None);
        assert_eq!(labels[1].as_deref(), Some("a, b"));
    }
}
