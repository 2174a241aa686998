use serde::{Deserialize, Serialize};

fn default_stacking() -> Option<String> {
    Some("relative".to_string())
}

fn default_col1_header() -> String {
    "Sample".to_string()
}

/// Per-plot options supplied alongside the data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub xlab: Option<String>,
    #[serde(default)]
    pub ylab: Option<String>,
    #[serde(default)]
    pub xsuffix: Option<String>,
    #[serde(default)]
    pub ysuffix: Option<String>,
    #[serde(default)]
    pub xmin: Option<f64>,
    #[serde(default)]
    pub xmax: Option<f64>,
    #[serde(default)]
    pub ymin: Option<f64>,
    #[serde(default)]
    pub ymax: Option<f64>,
    /// Tab labels; missing entries fall back to "Dataset N".
    #[serde(default)]
    pub data_labels: Vec<String>,
    #[serde(default)]
    pub add_pct_tab: bool,
    #[serde(default)]
    pub add_log_tab: bool,
    /// Absent means "relative"; an explicit null means "group".
    #[serde(default = "default_stacking")]
    pub stacking: Option<String>,
    #[serde(default)]
    pub use_legend: Option<bool>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub marker_size: Option<u32>,
    #[serde(default)]
    pub marker_line_width: Option<u32>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub opacity: Option<f64>,
    #[serde(default)]
    pub no_violin: bool,
    #[serde(default)]
    pub force_violin: bool,
    #[serde(default = "default_col1_header")]
    pub col1_header: String,
}

impl PlotConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            xlab: None,
            ylab: None,
            xsuffix: None,
            ysuffix: None,
            xmin: None,
            xmax: None,
            ymin: None,
            ymax: None,
            data_labels: Vec::new(),
            add_pct_tab: false,
            add_log_tab: false,
            stacking: default_stacking(),
            use_legend: None,
            categories: None,
            marker_size: None,
            marker_line_width: None,
            color: None,
            opacity: None,
            no_violin: false,
            force_violin: false,
            col1_header: default_col1_header(),
        }
    }

    /// Stable per-tab identifier used for export file names.
    pub fn dataset_uid(&self, idx: usize) -> String {
        if idx == 0 {
            self.id.clone()
        } else {
            format!("{}_{}", self.id, idx + 1)
        }
    }

    pub fn dataset_label(&self, idx: usize) -> String {
        self.data_labels
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("Dataset {}", idx + 1))
    }
}
