use crate::core::error::{PlotError, Result};
use crate::core::layout::{self, Autorange, AxisPlan, PlotLayout};
use crate::core::model::{Interner, PlotConfig, SampleId};
use crate::core::settings::Settings;
use crate::core::stats;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BarCategoryInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// One value per sample; `null` is a gap.
    #[serde(default)]
    pub data: Vec<Option<f64>>,
    #[serde(default)]
    pub data_pct: Option<Vec<Option<f64>>>,
}

/// Bar chart input: one category list and one sample list per tab.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BarInput {
    pub categories: Vec<Vec<BarCategoryInput>>,
    pub samples: Vec<Vec<String>>,
}

#[derive(Clone, Debug, Default)]
pub struct BarTabInput {
    pub categories: Vec<BarCategoryInput>,
    pub samples: Vec<String>,
}

impl BarInput {
    pub fn into_tabs(self, plot_id: &str) -> Result<Vec<BarTabInput>> {
        if self.categories.len() != self.samples.len() {
            return Err(PlotError::DatasetCountMismatch {
                plot_id: plot_id.to_string(),
                datasets: self.categories.len(),
                sample_lists: self.samples.len(),
            });
        }
        if self.categories.is_empty() {
            return Err(PlotError::NoDatasets {
                plot_id: plot_id.to_string(),
            });
        }
        Ok(self
            .categories
            .into_iter()
            .zip(self.samples)
            .map(|(categories, samples)| BarTabInput {
                categories,
                samples,
            })
            .collect())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stacking {
    /// Side by side.
    Group,
    Overlay,
    /// Stacked, negative values drawn below zero.
    Relative,
}

impl Stacking {
    /// `None` is the legacy spelling of group mode, "normal" of relative.
    pub fn resolve(mode: Option<&str>) -> Result<Self> {
        match mode {
            None | Some("group") => Ok(Stacking::Group),
            Some("overlay") => Ok(Stacking::Overlay),
            Some("relative") | Some("normal") => Ok(Stacking::Relative),
            Some(other) => Err(PlotError::UnknownStacking(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stacking::Group => "group",
            Stacking::Overlay => "overlay",
            Stacking::Relative => "relative",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BarCategory {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub data: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_pct: Vec<f64>,
}

impl BarCategory {
    fn total(&self) -> f64 {
        self.data.iter().filter(|v| !v.is_nan()).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BarTrace {
    pub orientation: &'static str,
    pub marker_line_width: u32,
    pub textposition: &'static str,
    pub insidetextanchor: &'static str,
}

impl Default for BarTrace {
    fn default() -> Self {
        Self {
            orientation: "h",
            marker_line_width: 0,
            textposition: "inside",
            insidetextanchor: "start",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BarDataset {
    /// Reversed relative to the input, since bars are drawn bottom to top.
    pub samples: Vec<SampleId>,
    pub categories: Vec<BarCategory>,
    pub value_axis: AxisPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pct_axis: Option<AxisPlan>,
    /// Category draw order for the log view, smallest total first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_order: Option<Vec<usize>>,
    pub show_legend: bool,
    pub trace: BarTrace,
}

/// Pads to `n` with zeros, or fails if there are more values than samples.
fn fit_to_samples(
    values: &[Option<f64>],
    n: usize,
    plot_id: &str,
    category: &str,
) -> Result<Vec<f64>> {
    if values.len() > n {
        return Err(PlotError::CategoryLengthMismatch {
            plot_id: plot_id.to_string(),
            category: category.to_string(),
            values: values.len(),
            samples: n,
        });
    }
    let mut out: Vec<f64> = values.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
    out.resize(n, 0.0);
    out.reverse();
    Ok(out)
}

/// (min, max) extent the value axis must cover.
fn value_extent(categories: &[Vec<f64>], n_samples: usize, stacking: Stacking) -> Option<(f64, f64)> {
    if n_samples == 0 || categories.is_empty() {
        return None;
    }
    match stacking {
        Stacking::Group => stats::finite_extent(categories.iter().flatten().copied()),
        Stacking::Overlay | Stacking::Relative => {
            let mut pos = f64::NEG_INFINITY;
            let mut neg = f64::INFINITY;
            for i in 0..n_samples {
                let (mut p, mut n) = (0.0f64, 0.0f64);
                for col in categories {
                    let v = col[i];
                    if v > 0.0 {
                        p += v;
                    } else if v < 0.0 {
                        n += v;
                    }
                }
                pos = pos.max(p);
                neg = neg.min(n);
            }
            Some((neg, pos))
        }
    }
}

fn hoverformat(categories: &[BarCategory]) -> &'static str {
    let integral = categories
        .iter()
        .flat_map(|c| c.data.iter())
        .filter(|v| v.is_finite())
        .all(|v| v.fract() == 0.0);
    if integral { ",.0f" } else { ",.2f" }
}

pub fn assemble(
    tab: BarTabInput,
    cfg: &PlotConfig,
    stacking: Stacking,
    interner: &mut Interner,
) -> Result<BarDataset> {
    let n = tab.samples.len();
    let mut samples: Vec<SampleId> = tab.samples.iter().map(|s| interner.intern(s)).collect();
    samples.reverse();

    let mut categories = Vec::with_capacity(tab.categories.len());
    for (index, input) in tab.categories.into_iter().enumerate() {
        let name = input.name.ok_or_else(|| PlotError::MissingCategoryName {
            plot_id: cfg.id.clone(),
            index,
        })?;
        let data = fit_to_samples(&input.data, n, &cfg.id, &name)?;
        let data_pct = match input.data_pct {
            Some(pct) => fit_to_samples(&pct, n, &cfg.id, &name)?,
            None => Vec::new(),
        };
        categories.push(BarCategory {
            name,
            color: input.color,
            data,
            data_pct,
        });
    }

    let columns: Vec<Vec<f64>> = categories.iter().map(|c| c.data.clone()).collect();
    let autorange = value_extent(&columns, n, stacking).map(|(min_v, max_v)| Autorange {
        min_allowed: if min_v > 0.0 { 0.0 } else { min_v },
        max_allowed: cfg.ymax.unwrap_or(max_v),
    });

    let value_axis = AxisPlan {
        title: cfg.ylab.clone(),
        autorange,
        ticksuffix: cfg.ysuffix.clone(),
        hoverformat: Some(hoverformat(&categories).to_string()),
        ..Default::default()
    };

    let show_legend = cfg.use_legend.unwrap_or(categories.len() > 1);
    Ok(BarDataset {
        samples,
        categories,
        value_axis,
        pct_axis: None,
        log_order: None,
        show_legend,
        trace: BarTrace::default(),
    })
}

impl BarDataset {
    /// Per-sample percentages and the lowest extent they reach.
    pub fn apply_percentages(&mut self, stacking: Stacking) {
        let columns: Vec<Vec<f64>> = self.categories.iter().map(|c| c.data.clone()).collect();
        let pct = stats::percentages_of(&columns);
        let pct_min = value_extent(&pct, self.samples.len(), stacking).map(|e| e.0);
        for (cat, values) in self.categories.iter_mut().zip(pct) {
            cat.data_pct = values;
        }
        self.pct_axis = Some(AxisPlan {
            title: self.value_axis.title.clone(),
            autorange: pct_min.map(|min_v| Autorange {
                min_allowed: min_v.min(0.0),
                max_allowed: 100.0,
            }),
            ticksuffix: Some("%".to_string()),
            hoverformat: Some(",.1f".to_string()),
            ..Default::default()
        });
    }

    /// Smallest categories first, so a log axis stacks sensibly. The linear
    /// order is left untouched.
    pub fn reorder_for_log(&mut self) {
        let mut order: Vec<usize> = (0..self.categories.len()).collect();
        order.sort_by(|&a, &b| {
            self.categories[a]
                .total()
                .total_cmp(&self.categories[b].total())
        });
        self.log_order = Some(order);
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }
}

/// Plot-wide layout shared by all bar tabs.
pub fn plot_layout(
    datasets: &[&BarDataset],
    cfg: &PlotConfig,
    stacking: Stacking,
    settings: &Settings,
) -> PlotLayout {
    let max_n_cats = datasets.iter().map(|d| d.categories.len()).max().unwrap_or(0);
    let max_n_samples = datasets.iter().map(|d| d.n_samples()).max().unwrap_or(0);
    let bars_in_group = if stacking == Stacking::Group { max_n_cats } else { 1 };
    let height = layout::bar_chart_height(max_n_samples, bars_in_group, max_n_cats);

    PlotLayout {
        height,
        show_legend: cfg.use_legend.unwrap_or(true),
        legend_traceorder: if stacking == Stacking::Group || cfg.add_log_tab {
            "reversed"
        } else {
            "normal"
        },
        legend_on_bottom: settings.barplot_legend_on_bottom,
        barmode: Some(stacking.as_str()),
        hovermode: Some("y unified"),
        x_axis: AxisPlan {
            title: cfg.ylab.clone(),
            ticksuffix: cfg.ysuffix.clone(),
            ..Default::default()
        },
        y_axis: AxisPlan {
            ticksuffix: cfg.xsuffix.clone(),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(name: &str, data: &[f64]) -> BarCategoryInput {
        BarCategoryInput {
            name: Some(name.to_string()),
            data: data.iter().copied().map(Some).collect(),
            ..Default::default()
        }
    }

    fn tab(categories: Vec<BarCategoryInput>, samples: &[&str]) -> BarTabInput {
        BarTabInput {
            categories,
            samples: samples.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn pct_for(ds: &BarDataset, cat: usize, sample: &str) -> f64 {
        let idx = ds.samples.iter().position(|s| s.as_ref() == sample).unwrap();
        ds.categories[cat].data_pct[idx]
    }

    #[test]
    fn stacking_aliases() {
        assert_eq!(Stacking::resolve(None).unwrap(), Stacking::Group);
        assert_eq!(Stacking::resolve(Some("normal")).unwrap(), Stacking::Relative);
        assert_eq!(Stacking::resolve(Some("overlay")).unwrap(), Stacking::Overlay);
        assert!(Stacking::resolve(Some("stacked")).is_err());
    }

    #[test]
    fn relative_percentages() {
        let cfg = PlotConfig::new("bp");
        let mut ds = assemble(
            tab(vec![cat("X", &[1.0, 1.0]), cat("Y", &[1.0, 3.0])], &["s1", "s2"]),
            &cfg,
            Stacking::Relative,
            &mut Interner::new(),
        )
        .unwrap();
        ds.apply_percentages(Stacking::Relative);
        assert_eq!(pct_for(&ds, 0, "s1"), 50.0);
        assert_eq!(pct_for(&ds, 1, "s1"), 50.0);
        assert_eq!(pct_for(&ds, 0, "s2"), 25.0);
        assert_eq!(pct_for(&ds, 1, "s2"), 75.0);
        let pct_axis = ds.pct_axis.unwrap();
        assert_eq!(pct_axis.autorange.unwrap().min_allowed, 0.0);
    }

    #[test]
    fn samples_are_reversed_and_short_categories_padded() {
        let cfg = PlotConfig::new("bp");
        let ds = assemble(
            tab(vec![cat("X", &[5.0])], &["s1", "s2", "s3"]),
            &cfg,
            Stacking::Relative,
            &mut Interner::new(),
        )
        .unwrap();
        let names: Vec<&str> = ds.samples.iter().map(|s| s.as_ref()).collect();
        assert_eq!(names, vec!["s3", "s2", "s1"]);
        assert_eq!(ds.categories[0].data, vec![0.0, 0.0, 5.0]);
        assert!(!ds.show_legend);
    }

    #[test]
    fn malformed_categories_fail_fast() {
        let cfg = PlotConfig::new("bp");
        let mut unnamed = cat("X", &[1.0]);
        unnamed.name = None;
        let err = assemble(tab(vec![unnamed], &["s1"]), &cfg, Stacking::Group, &mut Interner::new())
            .unwrap_err();
        assert!(matches!(err, PlotError::MissingCategoryName { index: 0, .. }));

        let err = assemble(
            tab(vec![cat("X", &[1.0, 2.0, 3.0])], &["s1"]),
            &cfg,
            Stacking::Group,
            &mut Interner::new(),
        )
        .unwrap_err();
        assert!(matches!(err, PlotError::CategoryLengthMismatch { values: 3, samples: 1, .. }));
    }

    #[test]
    fn tab_count_must_match_sample_lists() {
        let input = BarInput {
            categories: vec![vec![cat("X", &[1.0])]],
            samples: vec![],
        };
        assert!(matches!(
            input.into_tabs("bp"),
            Err(PlotError::DatasetCountMismatch { datasets: 1, sample_lists: 0, .. })
        ));
    }

    #[test]
    fn stacked_and_grouped_extents() {
        let cfg = PlotConfig::new("bp");
        let cats = || vec![cat("A", &[4.0, -2.0]), cat("B", &[3.0, -5.0])];
        let stacked =
            assemble(tab(cats(), &["s1", "s2"]), &cfg, Stacking::Relative, &mut Interner::new())
                .unwrap();
        let r = stacked.value_axis.autorange.unwrap();
        assert_eq!((r.min_allowed, r.max_allowed), (-7.0, 7.0));

        let grouped =
            assemble(tab(cats(), &["s1", "s2"]), &cfg, Stacking::Group, &mut Interner::new())
                .unwrap();
        let r = grouped.value_axis.autorange.unwrap();
        assert_eq!((r.min_allowed, r.max_allowed), (-5.0, 4.0));
    }

    #[test]
    fn positive_data_starts_at_zero_and_respects_ymax() {
        let mut cfg = PlotConfig::new("bp");
        cfg.ymax = Some(100.0);
        let ds = assemble(
            tab(vec![cat("A", &[10.0, 20.0])], &["s1", "s2"]),
            &cfg,
            Stacking::Group,
            &mut Interner::new(),
        )
        .unwrap();
        let r = ds.value_axis.autorange.unwrap();
        assert_eq!((r.min_allowed, r.max_allowed), (0.0, 100.0));
        assert_eq!(ds.value_axis.hoverformat.as_deref(), Some(",.0f"));
    }

    #[test]
    fn negative_percentages_extend_lower_bound() {
        let cfg = PlotConfig::new("bp");
        let mut ds = assemble(
            tab(vec![cat("A", &[-1.0]), cat("B", &[-3.0])], &["s1"]),
            &cfg,
            Stacking::Relative,
            &mut Interner::new(),
        )
        .unwrap();
        ds.apply_percentages(Stacking::Relative);
        assert_eq!(ds.pct_axis.unwrap().autorange.unwrap().min_allowed, -100.0);
    }

    #[test]
    fn log_reorder_sorts_by_total() {
        let cfg = PlotConfig::new("bp");
        let mut ds = assemble(
            tab(vec![cat("big", &[10.0]), cat("small", &[1.0])], &["s1"]),
            &cfg,
            Stacking::Relative,
            &mut Interner::new(),
        )
        .unwrap();
        ds.reorder_for_log();
        assert_eq!(ds.log_order, Some(vec![1, 0]));
        assert_eq!(ds.categories[0].name, "big");
    }

    #[test]
    fn grouped_layout_is_taller() {
        let cfg = PlotConfig::new("bp");
        let samples: Vec<String> = (0..50).map(|i| format!("s{}", i)).collect();
        let refs: Vec<&str> = samples.iter().map(String::as_str).collect();
        let build = |stacking| {
            let ds = assemble(
                tab(vec![cat("A", &[1.0; 50]), cat("B", &[1.0; 50])], &refs),
                &cfg,
                stacking,
                &mut Interner::new(),
            )
            .unwrap();
            plot_layout(&[&ds], &cfg, stacking, &Settings::default())
        };
        let grouped = build(Stacking::Group);
        let stacked = build(Stacking::Relative);
        assert!(grouped.height > stacked.height);
        assert_eq!(grouped.legend_traceorder, "reversed");
        assert_eq!(stacked.legend_traceorder, "normal");
    }
}
