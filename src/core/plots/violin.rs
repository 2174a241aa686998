use crate::core::error::Result;
use crate::core::layout::{self, AxisPlan, PlotLayout};
use crate::core::model::{
    Interner, MetricSeries, MetricTable, PlotConfig, RawValue, SampleId, SampleValues,
};
use crate::core::reducer::{self, PointPolicy, ReducerConfig, ValueKind};
use crate::core::settings::Settings;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};

const MARKER_COLOR_PLAIN: &str = "#0b79e6";
const MARKER_COLOR_ON_COLORED: &str = "black";
const ROW_LABEL_PADDING: &str = "  ";
const DEFAULT_TT_DECIMALS: u32 = 2;

/// One metric column of a violin tab.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MetricInput {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub suffix: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub dmin: Option<f64>,
    #[serde(default)]
    pub dmax: Option<f64>,
    #[serde(default)]
    pub tt_decimals: Option<u32>,
    #[serde(default)]
    pub hidden: bool,
    /// Sample → value, in column order. `null` cells are absent.
    #[serde(default)]
    pub values: Map<String, Value>,
}

/// JSON has no NaN or Inf literals, so they arrive as strings.
fn raw_from_json(v: &Value) -> Option<RawValue> {
    match v {
        Value::Null => None,
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(RawValue::Int(i)),
            None => n.as_f64().map(RawValue::Float),
        },
        Value::String(s) => Some(match s.as_str() {
            "NaN" | "nan" => RawValue::Float(f64::NAN),
            "Inf" | "inf" | "Infinity" => RawValue::Float(f64::INFINITY),
            "-Inf" | "-inf" | "-Infinity" => RawValue::Float(f64::NEG_INFINITY),
            _ => RawValue::Text(s.clone()),
        }),
        other => Some(RawValue::Text(other.to_string())),
    }
}

/// Builds the metric table for one tab. A single colour shared by every
/// metric carries no information and is dropped.
pub fn metric_table(metrics: Vec<MetricInput>, interner: &mut Interner) -> Result<MetricTable> {
    let colors: HashSet<Option<&str>> = metrics.iter().map(|m| m.color.as_deref()).collect();
    let drop_colors = colors.len() == 1;

    let mut table = MetricTable::new();
    for m in metrics {
        let mut series = MetricSeries::new(m.id);
        if let Some(title) = m.title {
            series.title = title;
        }
        series.description = m.description;
        series.namespace = m.namespace.filter(|ns| !ns.is_empty());
        series.suffix = m.suffix;
        series.color = if drop_colors { None } else { m.color };
        series.dmin = m.dmin;
        series.dmax = m.dmax;
        series.tt_decimals = m.tt_decimals;
        series.hidden = m.hidden;
        for (sample, value) in &m.values {
            if let Some(raw) = raw_from_json(value) {
                series.push(interner.intern(sample), raw)?;
            }
        }
        table.push(series)?;
    }
    Ok(table)
}

#[derive(Clone, Debug, Serialize)]
pub struct ViolinRow {
    pub metric: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub suffix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub hidden: bool,
    pub kind: ValueKind,
    pub policy: PointPolicy,
    pub tick_label: String,
    pub x_axis: AxisPlan,
    /// Violin body, possibly thinned.
    pub violin: SampleValues<RawValue>,
    /// Hoverable points drawn over the body.
    pub points: SampleValues<RawValue>,
}

impl ViolinRow {
    /// The body value wins over the point layer, as in the drawn chart.
    pub fn value(&self, sample: &str) -> Option<&RawValue> {
        self.violin.get(sample).or_else(|| self.points.get(sample))
    }
}

fn row_tick_label(title: &str, namespace: Option<&str>) -> String {
    let label = format!("{}{}", title, ROW_LABEL_PADDING);
    match namespace {
        Some(ns) => format!("{}{}<br>{}", ns, ROW_LABEL_PADDING, label),
        None => label,
    }
}

fn build_row(series: &MetricSeries, rcfg: &ReducerConfig) -> Option<ViolinRow> {
    let reduced = reducer::reduce(series, rcfg)?;

    let suffix = Some(series.suffix.as_str()).filter(|s| !s.is_empty());
    let mut x_axis = if reduced.kind.is_numeric() {
        AxisPlan::numeric(
            (series.dmin, series.dmax),
            reduced.finite_extent(),
            reduced.policy.shows_points(),
            suffix,
        )
    } else {
        AxisPlan {
            ticksuffix: suffix.map(str::to_string),
            ..Default::default()
        }
    };
    if reduced.kind == ValueKind::Float {
        let decimals = series.tt_decimals.unwrap_or(DEFAULT_TT_DECIMALS);
        x_axis.hoverformat = Some(format!(".{}f", decimals));
    }

    Some(ViolinRow {
        metric: series.id.clone(),
        title: series.title.clone(),
        description: series.description.clone(),
        namespace: series.namespace.clone(),
        suffix: series.suffix.clone(),
        color: series.color.clone(),
        hidden: series.hidden,
        kind: reduced.kind,
        policy: reduced.policy,
        tick_label: row_tick_label(&series.title, series.namespace.as_deref()),
        x_axis,
        violin: SampleValues::from_unique(reduced.primary),
        points: SampleValues::from_unique(reduced.points),
    })
}

#[derive(Clone, Debug, Serialize)]
pub struct ViolinDataset {
    /// Every metric with data left after pruning, hidden ones included.
    pub rows: Vec<ViolinRow>,
    /// Samples that appear in any body or point layer, sorted.
    pub all_samples: Vec<SampleId>,
    pub is_downsampled: bool,
    /// Distinct samples in the input tab.
    pub n_samples: usize,
    pub marker_color: &'static str,
    pub height: u32,
}

impl ViolinDataset {
    pub fn visible_rows(&self) -> impl Iterator<Item = &ViolinRow> {
        self.rows.iter().filter(|r| !r.hidden)
    }
}

pub fn assemble(
    metrics: Vec<MetricInput>,
    settings: &Settings,
    interner: &mut Interner,
) -> Result<ViolinDataset> {
    let table = metric_table(metrics, interner)?;
    let rcfg = ReducerConfig::from_settings(settings);

    let rows: Vec<ViolinRow> = table.iter().filter_map(|s| build_row(s, &rcfg)).collect();

    let mut samples: BTreeSet<SampleId> = BTreeSet::new();
    for row in &rows {
        samples.extend(row.violin.samples().cloned());
        samples.extend(row.points.samples().cloned());
    }
    let all_samples: Vec<SampleId> = samples.into_iter().collect();
    let is_downsampled = settings
        .violin_downsample_after
        .is_some_and(|cap| all_samples.len() > cap);

    let marker_color = if table.iter().any(|m| m.color.is_some()) {
        MARKER_COLOR_ON_COLORED
    } else {
        MARKER_COLOR_PLAIN
    };

    let mut ds = ViolinDataset {
        rows,
        all_samples,
        is_downsampled,
        n_samples: table.sample_union().len(),
        marker_color,
        height: layout::DEFAULT_PLOT_HEIGHT,
    };
    let visible = ds.visible_rows().count();
    if visible > 0 {
        ds.height = layout::row_chart_height(visible);
    }
    Ok(ds)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolinDisplay {
    Violin,
    Table,
}

/// Whether the tabs are shown as violins or as a table, and whether the
/// interactive table can be offered at all.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct ViolinPresentation {
    pub display: ViolinDisplay,
    pub table_available: bool,
    pub n_samples: usize,
}

impl ViolinPresentation {
    pub fn decide(datasets: &[&ViolinDataset], cfg: &PlotConfig, settings: &Settings) -> Self {
        let n_samples = datasets.iter().map(|d| d.n_samples).max().unwrap_or(0);
        let too_many = n_samples > settings.violin_max_samples && !cfg.force_violin;
        let display = if cfg.no_violin || too_many {
            ViolinDisplay::Table
        } else {
            ViolinDisplay::Violin
        };
        let table_available = cfg.no_violin || n_samples <= settings.max_table_rows;
        if !table_available {
            tracing::debug!(
                plot = %cfg.id,
                n_samples,
                max_table_rows = settings.max_table_rows,
                "table view unavailable, showing violins only"
            );
        }
        Self {
            display,
            table_available,
            n_samples,
        }
    }

    pub fn notice(&self) -> Option<String> {
        (!self.table_available).then(|| format!("Showing {} samples.", self.n_samples))
    }
}

pub fn plot_layout(datasets: &[&ViolinDataset]) -> PlotLayout {
    PlotLayout {
        height: datasets
            .iter()
            .map(|d| d.height)
            .max()
            .unwrap_or(layout::DEFAULT_PLOT_HEIGHT),
        show_legend: false,
        ..Default::default()
    }
}
