use crate::cli::args::{BuildArgs, Cli, Commands};
use crate::core::engine::{self, fmt_dur, log_stage};
use crate::core::io;
use crate::core::settings::Settings;
use crate::report;
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

pub fn entry() -> Result<()> {
    let cli = Cli::parse();
    run_cli(cli).map(|_| ())
}

/// Runs a parsed command line and returns the plot output directory.
pub fn run_cli(cli: Cli) -> Result<PathBuf> {
    match cli.command {
        Commands::Build(args) => {
            init_logging(args.verbose);
            build(args)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when driven from tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn apply_overrides(args: &BuildArgs, settings: &mut Settings) {
    if args.flat {
        settings.plots_force_flat = true;
        settings.plots_force_interactive = false;
    }
    if args.interactive {
        settings.plots_force_interactive = true;
        settings.plots_force_flat = false;
    }
    if let Some(n) = args.flat_numseries {
        settings.plots_flat_numseries = n;
    }
    if let Some(n) = args.defer_numseries {
        settings.plots_defer_loading_numseries = n;
    }
    if let Some(n) = args.downsample_after {
        settings.violin_downsample_after = Some(n);
    }
    if args.no_downsample {
        settings.violin_downsample_after = None;
    }
    if let Some(n) = args.violin_max_samples {
        settings.violin_max_samples = n;
    }
    if let Some(n) = args.max_table_rows {
        settings.max_table_rows = n;
    }
    if let Some(n) = args.max_annotations {
        settings.scatter_max_annotations = n;
    }
    if let Some(z) = args.z_cutoff {
        settings.outlier_z_cutoff = z;
    }
    if args.no_anonymize {
        settings.anonymize_samples = false;
    }
}

fn build(args: BuildArgs) -> Result<PathBuf> {
    let t0 = Instant::now();

    if !args.input.is_file() {
        bail!("input file not found: {}", args.input.display());
    }
    if args.threads == 0 {
        bail!("--threads must be >= 1");
    }

    let t_read = Instant::now();
    let mut request = io::read_request(&args.input)?;
    log_stage("read", t_read);

    let plot_id = request.config.id.clone();
    if plot_id.is_empty() || plot_id.contains(['/', '\\']) || plot_id == "." || plot_id == ".." {
        bail!("plot id {:?} cannot be used as a directory name", plot_id);
    }

    apply_overrides(&args, &mut request.settings);
    if args.force_violin {
        request.config.force_violin = true;
    }
    if args.no_violin {
        request.config.no_violin = true;
    }
    let anonymize = request.settings.anonymize_samples;
    let downsample_cap = request.settings.violin_downsample_after;

    let model = engine::run(request, args.threads)
        .with_context(|| format!("failed to build plot {}", plot_id))?;
    tracing::info!(
        plot = %plot_id,
        kind = model.kind.label(),
        tabs = model.datasets.len(),
        max_series = model.max_n_series(),
        mode = ?model.render_mode,
        "plot assembled"
    );
    if let Some(notice) = &model.notice {
        tracing::info!(plot = %plot_id, "{}", notice);
    }

    let plot_dir = args.out.join(&plot_id);
    fs::create_dir_all(&plot_dir)
        .with_context(|| format!("failed to create output dir {}", plot_dir.display()))?;

    let mut files = Vec::with_capacity(model.datasets.len() + 2);

    let t_json = Instant::now();
    let json_path = plot_dir.join("plot.json");
    report::json::write(&json_path, &model)
        .with_context(|| format!("failed to write {}", json_path.display()))?;
    files.push("plot.json".to_string());
    log_stage("json", t_json);

    let t_data = Instant::now();
    for view in &model.datasets {
        let name = format!("{}.tsv", view.uid);
        let table = report::data_file::export_table(&view.body);
        report::data_file::write_tsv(&plot_dir.join(&name), &table)
            .with_context(|| format!("failed to write {}", name))?;
        files.push(name);
    }
    log_stage("data-files", t_data);

    let t_prompt = Instant::now();
    let prompt_path = plot_dir.join("prompt.md");
    let text = report::prompt::render(&model, anonymize, downsample_cap);
    report::prompt::write(&prompt_path, &text)?;
    files.push("prompt.md".to_string());
    log_stage("prompt", t_prompt);

    if !args.no_zip {
        let t_zip = Instant::now();
        report::zip::write_zip(&args.out, &plot_id, &files)
            .with_context(|| "failed to create zip output")?;
        log_stage("zip", t_zip);
    }

    tracing::info!(
        out = %plot_dir.display(),
        total = %fmt_dur(t0.elapsed()),
        "outputs written"
    );
    Ok(plot_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> BuildArgs {
        let mut argv = vec!["kira-qcplot", "build", "in.json", "--out", "out"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Build(a) => a,
        }
    }

    #[test]
    fn flags_override_request_settings() {
        let mut settings = Settings {
            anonymize_samples: true,
            plots_force_interactive: true,
            ..Settings::default()
        };
        apply_overrides(
            &args(&["--flat", "--no-downsample", "--max-annotations", "3", "--no-anonymize"]),
            &mut settings,
        );
        assert!(settings.plots_force_flat);
        assert!(!settings.plots_force_interactive);
        assert_eq!(settings.violin_downsample_after, None);
        assert_eq!(settings.scatter_max_annotations, 3);
        assert!(!settings.anonymize_samples);
    }

    #[test]
    fn absent_flags_leave_settings_alone() {
        let mut settings = Settings {
            max_table_rows: 7,
            ..Settings::default()
        };
        apply_overrides(&args(&[]), &mut settings);
        assert_eq!(settings.max_table_rows, 7);
        assert_eq!(settings.violin_downsample_after, Some(2000));
    }

    #[test]
    fn flat_and_interactive_conflict() {
        let argv = [
            "kira-qcplot",
            "build",
            "in.json",
            "--out",
            "o",
            "--flat",
            "--interactive",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
