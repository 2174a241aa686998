use crate::core::error::{PlotError, Result};
use crate::core::layout::PlotLayout;
use crate::core::model::PlotConfig;
use crate::core::plots::bar::{self, Stacking};
use crate::core::plots::violin::{self, ViolinDisplay, ViolinPresentation};
use crate::core::plots::{scatter, DatasetBody, PlotKind};
use crate::core::settings::Settings;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Interactive,
    Flat,
}

impl RenderMode {
    pub fn decide(kind: PlotKind, max_n_series: usize, settings: &Settings) -> Self {
        if settings.plots_force_flat {
            return RenderMode::Flat;
        }
        if !settings.plots_force_interactive
            && kind.flattens_when_large()
            && max_n_series > settings.plots_flat_numseries
        {
            tracing::debug!(
                max_n_series,
                threshold = settings.plots_flat_numseries,
                "switching to flat rendering"
            );
            return RenderMode::Flat;
        }
        RenderMode::Interactive
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DatasetView {
    pub uid: String,
    pub label: String,
    pub body: DatasetBody,
}

/// A finished chart. Nothing mutates it once built.
#[derive(Clone, Debug, Serialize)]
pub struct PlotModel {
    pub id: String,
    pub kind: PlotKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub render_mode: RenderMode,
    pub defer_render: bool,
    pub layout: PlotLayout,
    pub datasets: Vec<DatasetView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violin: Option<ViolinPresentation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip)]
    pub config: PlotConfig,
}

impl PlotModel {
    /// Header line used by the prompt view.
    pub fn type_label(&self) -> &'static str {
        match self.violin {
            Some(p) if p.display == ViolinDisplay::Table => "table",
            _ => self.kind.label(),
        }
    }

    pub fn max_n_series(&self) -> usize {
        max_n_series(&self.datasets)
    }
}

/// Data volume of the largest tab.
fn max_n_series(datasets: &[DatasetView]) -> usize {
    datasets.iter().map(|d| d.body.n_series()).max().unwrap_or(0)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AssemblyStage {
    /// Tabs are assembled; plot-wide passes have not run.
    Assembling,
    Percentages,
    LogReorder,
    Ready,
}

/// Runs the plot-wide passes over assembled tabs and hands out the model.
#[derive(Debug)]
pub struct PlotBuilder {
    kind: PlotKind,
    config: PlotConfig,
    settings: Settings,
    stacking: Stacking,
    stage: AssemblyStage,
    datasets: Vec<DatasetView>,
}

impl PlotBuilder {
    pub fn new(config: PlotConfig, settings: Settings, bodies: Vec<DatasetBody>) -> Result<Self> {
        let Some(kind) = bodies.first().map(DatasetBody::kind) else {
            return Err(PlotError::NoDatasets { plot_id: config.id });
        };
        let stacking = match kind {
            PlotKind::Bar => Stacking::resolve(config.stacking.as_deref())?,
            _ => Stacking::Group,
        };
        let datasets = bodies
            .into_iter()
            .enumerate()
            .map(|(idx, body)| DatasetView {
                uid: config.dataset_uid(idx),
                label: config.dataset_label(idx),
                body,
            })
            .collect();
        Ok(Self {
            kind,
            config,
            settings,
            stacking,
            stage: AssemblyStage::Assembling,
            datasets,
        })
    }

    pub fn stage(&self) -> AssemblyStage {
        self.stage
    }

    fn wants_percentages(&self) -> bool {
        self.kind == PlotKind::Bar && self.config.add_pct_tab
    }

    fn wants_log(&self) -> bool {
        self.kind == PlotKind::Bar && self.config.add_log_tab
    }

    /// Runs the next pass. Passes that were not requested are skipped.
    pub fn step(&mut self) -> AssemblyStage {
        use AssemblyStage::*;
        self.stage = match self.stage {
            Assembling if self.wants_percentages() => {
                for view in &mut self.datasets {
                    if let DatasetBody::Bar(ds) = &mut view.body {
                        ds.apply_percentages(self.stacking);
                    }
                }
                Percentages
            }
            Assembling | Percentages if self.wants_log() => {
                for view in &mut self.datasets {
                    if let DatasetBody::Bar(ds) = &mut view.body {
                        ds.reorder_for_log();
                    }
                }
                LogReorder
            }
            _ => Ready,
        };
        tracing::debug!(plot = %self.config.id, stage = ?self.stage, "assembly stage");
        self.stage
    }

    pub fn build(mut self) -> PlotModel {
        while self.stage != AssemblyStage::Ready {
            self.step();
        }
        self.into_model()
    }

    fn into_model(self) -> PlotModel {
        let max_n_series = max_n_series(&self.datasets);
        let render_mode = RenderMode::decide(self.kind, max_n_series, &self.settings);
        let defer_render = self.kind.defers_when_large()
            && max_n_series > self.settings.plots_defer_loading_numseries;

        let (layout, violin_view) = match self.kind {
            PlotKind::Bar => {
                let bars: Vec<_> = self
                    .datasets
                    .iter()
                    .filter_map(|d| match &d.body {
                        DatasetBody::Bar(b) => Some(b),
                        _ => None,
                    })
                    .collect();
                let layout = bar::plot_layout(&bars, &self.config, self.stacking, &self.settings);
                (layout, None)
            }
            PlotKind::Scatter => {
                let points: Vec<_> = self
                    .datasets
                    .iter()
                    .filter_map(|d| match &d.body {
                        DatasetBody::Scatter(s) => Some(s),
                        _ => None,
                    })
                    .collect();
                (scatter::plot_layout(&points, &self.config), None)
            }
            PlotKind::Violin => {
                let violins: Vec<_> = self
                    .datasets
                    .iter()
                    .filter_map(|d| match &d.body {
                        DatasetBody::Violin(v) => Some(v),
                        _ => None,
                    })
                    .collect();
                let presentation = ViolinPresentation::decide(&violins, &self.config, &self.settings);
                (violin::plot_layout(&violins), Some(presentation))
            }
        };

        PlotModel {
            id: self.config.id.clone(),
            kind: self.kind,
            title: self.config.title.clone(),
            render_mode,
            defer_render,
            layout,
            datasets: self.datasets,
            notice: violin_view.and_then(|p| p.notice()),
            violin: violin_view,
            config: self.config,
        }
    }
}
