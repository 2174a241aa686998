use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "kira-qcplot",
    version,
    about = "Reduce QC metric tables into bar, scatter and violin chart models"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Build(BuildArgs),
}

#[derive(Parser)]
pub struct BuildArgs {
    /// Chart request, JSON or gzip-compressed JSON.
    pub input: PathBuf,

    #[arg(long)]
    pub out: PathBuf,

    #[arg(long, default_value_t = num_cpus::get())]
    pub threads: usize,

    #[arg(long, default_value_t = false)]
    pub no_zip: bool,

    #[arg(long, env = "KIRA_QCPLOT_FLAT", conflicts_with = "interactive")]
    pub flat: bool,

    #[arg(long, env = "KIRA_QCPLOT_INTERACTIVE")]
    pub interactive: bool,

    #[arg(long, env = "KIRA_QCPLOT_FLAT_NUMSERIES")]
    pub flat_numseries: Option<usize>,

    #[arg(long, env = "KIRA_QCPLOT_DEFER_NUMSERIES")]
    pub defer_numseries: Option<usize>,

    #[arg(long, env = "KIRA_QCPLOT_DOWNSAMPLE_AFTER")]
    pub downsample_after: Option<usize>,

    #[arg(long, env = "KIRA_QCPLOT_NO_DOWNSAMPLE", conflicts_with = "downsample_after")]
    pub no_downsample: bool,

    #[arg(long, env = "KIRA_QCPLOT_VIOLIN_MAX_SAMPLES")]
    pub violin_max_samples: Option<usize>,

    #[arg(long, env = "KIRA_QCPLOT_MAX_TABLE_ROWS")]
    pub max_table_rows: Option<usize>,

    #[arg(long, env = "KIRA_QCPLOT_MAX_ANNOTATIONS")]
    pub max_annotations: Option<usize>,

    #[arg(long, env = "KIRA_QCPLOT_Z_CUTOFF")]
    pub z_cutoff: Option<f64>,

    /// Keep real sample names in prompt.md.
    #[arg(long, env = "KIRA_QCPLOT_NO_ANONYMIZE")]
    pub no_anonymize: bool,

    #[arg(long, conflicts_with = "no_violin")]
    pub force_violin: bool,

    #[arg(long)]
    pub no_violin: bool,

    #[arg(short, long)]
    pub verbose: bool,
}
