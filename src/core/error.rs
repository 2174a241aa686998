use thiserror::Error;

/// Malformed input that cannot be turned into a chart.
///
/// Degenerate data (empty, all-NaN or constant series) is never reported
/// through this type: it is logged and recovered where it is found.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlotError {
    #[error("{plot_id}: no datasets to plot")]
    NoDatasets { plot_id: String },

    #[error("{plot_id}: {datasets} datasets but {sample_lists} sample lists")]
    DatasetCountMismatch {
        plot_id: String,
        datasets: usize,
        sample_lists: usize,
    },

    #[error("bar plot {plot_id}: category #{index} is missing a name")]
    MissingCategoryName { plot_id: String, index: usize },

    #[error(
        "bar plot {plot_id}: category '{category}' has {values} values for {samples} samples"
    )]
    CategoryLengthMismatch {
        plot_id: String,
        category: String,
        values: usize,
        samples: usize,
    },

    #[error("unknown bar stacking mode '{0}' (expected group, overlay, relative or normal)")]
    UnknownStacking(String),

    #[error("metric '{metric}' lists sample '{sample}' more than once")]
    DuplicateSample { metric: String, sample: String },

    #[error("metric '{0}' is defined more than once in the same tab")]
    DuplicateMetric(String),
}

pub type Result<T, E = PlotError> = std::result::Result<T, E>;
