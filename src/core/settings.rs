use serde::{Deserialize, Serialize};

/// Thresholds and caps shared by every assembler.
///
/// Passed explicitly into the reducer, the layout planner and the chart
/// assemblers; nothing reads these from process state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Series at or below this size show every point.
    pub violin_show_points_threshold: usize,
    /// Series above this size only show outlier points (numeric series only).
    pub violin_outliers_only_threshold: usize,
    /// Cap for the primary violin body. `None` disables downsampling.
    pub violin_downsample_after: Option<usize>,
    /// Above this sample count a violin falls back to a table unless forced.
    pub violin_max_samples: usize,
    /// Above this sample count the interactive table alternative is dropped.
    pub max_table_rows: usize,
    pub plots_flat_numseries: usize,
    pub plots_defer_loading_numseries: usize,
    pub plots_force_flat: bool,
    pub plots_force_interactive: bool,
    pub scatter_max_annotations: usize,
    pub outlier_z_cutoff: f64,
    pub anonymize_samples: bool,
    pub barplot_legend_on_bottom: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            violin_show_points_threshold: 100,
            violin_outliers_only_threshold: 1000,
            violin_downsample_after: Some(2000),
            violin_max_samples: 20_000,
            max_table_rows: 500,
            plots_flat_numseries: 2000,
            plots_defer_loading_numseries: 100,
            plots_force_flat: false,
            plots_force_interactive: false,
            scatter_max_annotations: 10,
            outlier_z_cutoff: 2.0,
            anonymize_samples: true,
            barplot_legend_on_bottom: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_block_keeps_defaults() {
        let s: Settings =
            serde_json::from_str(r#"{"violin_downsample_after": 50, "anonymize_samples": false}"#)
                .unwrap();
        assert_eq!(s.violin_downsample_after, Some(50));
        assert!(!s.anonymize_samples);
        assert_eq!(s.max_table_rows, 500);
        assert_eq!(s.outlier_z_cutoff, 2.0);
    }

    #[test]
    fn null_cap_disables_downsampling() {
        let s: Settings = serde_json::from_str(r#"{"violin_downsample_after": null}"#).unwrap();
        assert_eq!(s.violin_downsample_after, None);
    }
}
