//! Per-chart-kind dataset assembly. Each tab is assembled independently
//! and owns everything it produces.

pub mod bar;
pub mod scatter;
pub mod violin;

use serde::Serialize;

pub use bar::BarDataset;
pub use scatter::ScatterDataset;
pub use violin::ViolinDataset;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    Bar,
    Scatter,
    Violin,
}

impl PlotKind {
    /// Violins stay cheap at any size, so only bars and scatters flatten.
    pub fn flattens_when_large(self) -> bool {
        !matches!(self, PlotKind::Violin)
    }

    pub fn defers_when_large(self) -> bool {
        matches!(self, PlotKind::Scatter)
    }

    pub fn label(self) -> &'static str {
        match self {
            PlotKind::Bar => "bar plot",
            PlotKind::Scatter => "x/y scatter plot",
            PlotKind::Violin => "violin plot",
        }
    }
}

/// One assembled tab.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DatasetBody {
    Bar(BarDataset),
    Scatter(ScatterDataset),
    Violin(ViolinDataset),
}

impl DatasetBody {
    pub fn kind(&self) -> PlotKind {
        match self {
            DatasetBody::Bar(_) => PlotKind::Bar,
            DatasetBody::Scatter(_) => PlotKind::Scatter,
            DatasetBody::Violin(_) => PlotKind::Violin,
        }
    }

    /// Data volume used for the render-mode decision.
    pub fn n_series(&self) -> usize {
        match self {
            DatasetBody::Bar(d) => d.n_samples(),
            DatasetBody::Scatter(d) => d.n_points(),
            DatasetBody::Violin(d) => d.n_samples,
        }
    }
}
