use crate::core::layout::{self, AxisPlan, LegendItem, LegendKey, PlotLayout};
use crate::core::model::{Interner, PlotConfig, RawValue, SampleId};
use crate::core::settings::Settings;
use crate::core::stats;
use serde::{Deserialize, Serialize};

const ANNOTATION_Z_START: f64 = 1.0;
const ANNOTATION_Z_LIMIT: f64 = 6.0;
const ANNOTATION_Z_STEP: f64 = 0.2;

const DEFAULT_MARKER_SIZE: u32 = 10;
const DEFAULT_MARKER_LINE_WIDTH: u32 = 1;
const DEFAULT_MARKER_COLOR: &str = "rgba(124, 181, 236, .5)";
const DIMMED_BORDER: &str = "rgba(0, 0, 0, .2)";

#[derive(Clone, Debug, Deserialize)]
pub struct ScatterPointInput {
    pub name: String,
    pub x: RawValue,
    pub y: RawValue,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub marker_size: Option<u32>,
    #[serde(default)]
    pub marker_line_width: Option<u32>,
    #[serde(default)]
    pub opacity: Option<f64>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub annotation: Option<String>,
    /// `false` keeps the point out of the outlier search.
    #[serde(default)]
    pub annotate: Option<bool>,
    #[serde(default)]
    pub hide_in_legend: bool,
}

impl ScatterPointInput {
    pub fn new(name: impl Into<String>, x: RawValue, y: RawValue) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            color: None,
            marker_size: None,
            marker_line_width: None,
            opacity: None,
            group: None,
            annotation: None,
            annotate: None,
            hide_in_legend: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Marker {
    pub size: u32,
    pub line_width: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_color: Option<&'static str>,
    pub opacity: f64,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub name: SampleId,
    pub x: RawValue,
    pub y: RawValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub marker: Marker,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    pub mode: &'static str,
    /// Set on the one point that carries each merged legend entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend_label: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScatterDataset {
    pub points: Vec<ScatterPoint>,
    pub x_axis: AxisPlan,
    pub y_axis: AxisPlan,
    pub n_annotated: usize,
    pub legend_entries: usize,
}

/// Which eligible points to label directly on the chart.
///
/// The z-score threshold starts at 1.0 and rises in 0.2 steps until the
/// labelled count plus `already` fits under `cap`, giving up at 6.0. The
/// result is best effort: heavily tied extremes can still exceed the cap.
pub fn annotation_mask(xs: &[f64], ys: &[f64], already: usize, cap: usize) -> Vec<bool> {
    let n = xs.len();
    let (Some((_, x_std)), Some((_, y_std))) = (stats::mean_std(xs), stats::mean_std(ys)) else {
        return vec![false; n];
    };
    if x_std == 0.0 && y_std == 0.0 {
        tracing::warn!(points = n, "all points have the same coordinates");
        return vec![n == 1; n];
    }

    let xz = stats::abs_z_scores(xs);
    let yz = stats::abs_z_scores(ys);
    let exceeds = |i: usize, t: f64| xz[i] > t || yz[i] > t;

    let mut threshold = ANNOTATION_Z_START;
    while threshold <= ANNOTATION_Z_LIMIT {
        let hits = (0..n).filter(|&i| exceeds(i, threshold)).count();
        if already + hits <= cap {
            break;
        }
        threshold += ANNOTATION_Z_STEP;
    }
    tracing::debug!(threshold, "scatter annotation threshold");
    (0..n).map(|i| exceeds(i, threshold)).collect()
}

fn both_numeric(p: &ScatterPointInput) -> Option<(f64, f64)> {
    Some((p.x.as_f64()?, p.y.as_f64()?))
}

pub fn assemble(
    points: Vec<ScatterPointInput>,
    cfg: &PlotConfig,
    settings: &Settings,
    interner: &mut Interner,
) -> ScatterDataset {
    let cap = settings.scatter_max_annotations;
    let mut annotations: Vec<Option<String>> = points.iter().map(|p| p.annotation.clone()).collect();
    let pre_annotated = annotations.iter().flatten().count();

    if pre_annotated < cap {
        let eligible: Vec<usize> = (0..points.len())
            .filter(|&i| points[i].annotate != Some(false))
            .collect();
        let coords: Option<Vec<(f64, f64)>> =
            eligible.iter().map(|&i| both_numeric(&points[i])).collect();
        match coords {
            Some(coords) if !coords.is_empty() => {
                let xs: Vec<f64> = coords.iter().map(|c| c.0).collect();
                let ys: Vec<f64> = coords.iter().map(|c| c.1).collect();
                let mask = annotation_mask(&xs, &ys, pre_annotated, cap);
                for (&i, hit) in eligible.iter().zip(mask) {
                    if hit {
                        annotations[i] = Some(points[i].name.clone());
                    }
                }
            }
            Some(_) => {}
            None => tracing::debug!(plot = %cfg.id, "non-numeric coordinates, skipping annotation"),
        }
    }
    let n_annotated = annotations.iter().flatten().count();

    let legend_items: Vec<LegendItem<'_>> = points
        .iter()
        .map(|p| LegendItem {
            key: LegendKey {
                color: p.color.clone(),
                marker_size: p.marker_size,
                marker_line_width: p.marker_line_width,
                group: p.group.clone(),
            },
            name: &p.name,
            hidden: p.hide_in_legend,
        })
        .collect();
    let legend_labels = layout::dedup_legend(&legend_items);
    let legend_entries = legend_labels.iter().flatten().count();

    let x_extent = stats::finite_extent(points.iter().filter_map(|p| p.x.as_f64()));
    let y_extent = stats::finite_extent(points.iter().filter_map(|p| p.y.as_f64()));

    let built: Vec<ScatterPoint> = points
        .into_iter()
        .zip(annotations)
        .zip(legend_labels)
        .map(|((p, annotation), legend_label)| ScatterPoint {
            name: interner.intern(&p.name),
            marker: Marker {
                size: p.marker_size.or(cfg.marker_size).unwrap_or(DEFAULT_MARKER_SIZE),
                line_width: p
                    .marker_line_width
                    .or(cfg.marker_line_width)
                    .unwrap_or(DEFAULT_MARKER_LINE_WIDTH),
                line_color: (n_annotated > 0).then_some(DIMMED_BORDER),
                opacity: p.opacity.or(cfg.opacity).unwrap_or(1.0),
                color: p
                    .color
                    .or_else(|| cfg.color.clone())
                    .unwrap_or_else(|| DEFAULT_MARKER_COLOR.to_string()),
            },
            mode: if annotation.is_some() { "markers+text" } else { "markers" },
            annotation,
            legend_label,
            x: p.x,
            y: p.y,
            group: p.group,
        })
        .collect();

    let x_axis = match cfg.categories.as_deref() {
        Some(categories) if !categories.is_empty() => AxisPlan::categorical(categories),
        _ => AxisPlan::numeric((cfg.xmin, cfg.xmax), x_extent, true, cfg.xsuffix.as_deref()),
    };
    let y_axis = AxisPlan::numeric((cfg.ymin, cfg.ymax), y_extent, true, cfg.ysuffix.as_deref());

    ScatterDataset {
        points: built,
        x_axis,
        y_axis,
        n_annotated,
        legend_entries,
    }
}

impl ScatterDataset {
    pub fn n_points(&self) -> usize {
        self.points.len()
    }
}

pub fn plot_layout(datasets: &[&ScatterDataset], cfg: &PlotConfig) -> PlotLayout {
    let legend_entries = datasets.iter().map(|d| d.legend_entries).max().unwrap_or(0) as u32;
    PlotLayout {
        height: layout::DEFAULT_PLOT_HEIGHT + legend_entries * layout::SCATTER_LEGEND_ITEM_HEIGHT,
        show_legend: true,
        hovermode: Some("closest"),
        x_axis: AxisPlan {
            title: cfg.xlab.clone(),
            ticksuffix: cfg.xsuffix.clone(),
            ..Default::default()
        },
        y_axis: AxisPlan {
            title: cfg.ylab.clone(),
            ticksuffix: cfg.ysuffix.clone(),
            ..Default::default()
        },
        ..Default::default()
    }
}
