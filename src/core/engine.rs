use crate::core::error::PlotError;
use crate::core::model::{Interner, PlotConfig};
use crate::core::plot_model::{PlotBuilder, PlotModel};
use crate::core::plots::bar::{self, BarInput, BarTabInput, Stacking};
use crate::core::plots::scatter::{self, ScatterPointInput};
use crate::core::plots::violin::{self, MetricInput};
use crate::core::plots::DatasetBody;
use crate::core::settings::Settings;
use anyhow::{Context, Result, anyhow};
use crossbeam_channel as channel;
use serde::Deserialize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// One chart request: per-plot config, optional settings overrides and the
/// tab data for one chart kind.
#[derive(Debug, Deserialize)]
pub struct PlotRequest {
    pub config: PlotConfig,
    #[serde(default)]
    pub settings: Settings,
    #[serde(flatten)]
    pub chart: ChartInput,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChartInput {
    Bar(BarInput),
    Scatter { tabs: Vec<Vec<ScatterPointInput>> },
    Violin { tabs: Vec<Vec<MetricInput>> },
}

enum TabJob {
    Bar(BarTabInput, Stacking),
    Scatter(Vec<ScatterPointInput>),
    Violin(Vec<MetricInput>),
}

impl TabJob {
    fn assemble(self, cfg: &PlotConfig, settings: &Settings) -> Result<DatasetBody, PlotError> {
        let mut interner = Interner::new();
        Ok(match self {
            TabJob::Bar(tab, stacking) => {
                DatasetBody::Bar(bar::assemble(tab, cfg, stacking, &mut interner)?)
            }
            TabJob::Scatter(points) => {
                DatasetBody::Scatter(scatter::assemble(points, cfg, settings, &mut interner))
            }
            TabJob::Violin(metrics) => {
                DatasetBody::Violin(violin::assemble(metrics, settings, &mut interner)?)
            }
        })
    }
}

fn into_jobs(chart: ChartInput, cfg: &PlotConfig) -> Result<Vec<TabJob>, PlotError> {
    let jobs: Vec<TabJob> = match chart {
        ChartInput::Bar(input) => {
            let stacking = Stacking::resolve(cfg.stacking.as_deref())?;
            input
                .into_tabs(&cfg.id)?
                .into_iter()
                .map(|tab| TabJob::Bar(tab, stacking))
                .collect()
        }
        ChartInput::Scatter { tabs } => tabs.into_iter().map(TabJob::Scatter).collect(),
        ChartInput::Violin { tabs } => tabs.into_iter().map(TabJob::Violin).collect(),
    };
    if jobs.is_empty() {
        return Err(PlotError::NoDatasets {
            plot_id: cfg.id.clone(),
        });
    }
    Ok(jobs)
}

/// Assembles every tab on a worker pool, then runs the plot-wide passes.
pub fn run(request: PlotRequest, threads: usize) -> Result<PlotModel> {
    let t_total = Instant::now();
    let config = Arc::new(request.config);
    let settings = Arc::new(request.settings);
    let jobs = into_jobs(request.chart, &config)?;
    let total = jobs.len();
    let threads = threads.clamp(1, total);
    tracing::debug!(plot = %config.id, tabs = total, threads, "assembling tabs");

    let (job_tx, job_rx) = channel::bounded::<(usize, TabJob)>(threads * 2);
    let (result_tx, result_rx) = channel::unbounded::<(usize, DatasetBody)>();
    let (err_tx, err_rx) = channel::bounded::<anyhow::Error>(1);

    let mut workers = Vec::with_capacity(threads);
    for _ in 0..threads {
        let rx = job_rx.clone();
        let tx = result_tx.clone();
        let err = err_tx.clone();
        let config = Arc::clone(&config);
        let settings = Arc::clone(&settings);
        workers.push(thread::spawn(move || {
            for (index, job) in rx.iter() {
                match job.assemble(&config, &settings) {
                    Ok(body) => {
                        if tx.send((index, body)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let e = anyhow::Error::new(e).context(format!("tab {}", index + 1));
                        let _ = err.send(e);
                        break;
                    }
                }
            }
        }));
    }
    drop(job_rx);
    drop(result_tx);
    drop(err_tx);

    let producer = thread::spawn(move || {
        for (index, job) in jobs.into_iter().enumerate() {
            if job_tx.send((index, job)).is_err() {
                return;
            }
        }
    });

    let mut parts: Vec<Option<DatasetBody>> = (0..total).map(|_| None).collect();
    let mut err_open = true;
    let mut received = 0usize;
    while received < total {
        if err_open {
            channel::select! {
                recv(err_rx) -> err => {
                    match err {
                        Ok(err) => return Err(err),
                        Err(_) => {
                            err_open = false;
                            continue;
                        }
                    }
                }
                recv(result_rx) -> msg => {
                    let (index, body) = msg.context("worker pool stopped before all tabs were assembled")?;
                    parts[index] = Some(body);
                }
            }
        } else {
            let (index, body) = result_rx
                .recv()
                .context("worker pool stopped before all tabs were assembled")?;
            parts[index] = Some(body);
        }
        received += 1;
    }

    let _ = producer.join();
    for worker in workers {
        let _ = worker.join();
    }
    log_stage("assemble", t_total);

    let bodies: Vec<DatasetBody> = parts
        .into_iter()
        .enumerate()
        .map(|(i, p)| p.ok_or_else(|| anyhow!("tab {} was never assembled", i + 1)))
        .collect::<Result<_>>()?;

    let config = Arc::try_unwrap(config).unwrap_or_else(|shared| (*shared).clone());
    let settings = Arc::try_unwrap(settings).unwrap_or_else(|shared| (*shared).clone());
    let t_passes = Instant::now();
    let model = PlotBuilder::new(config, settings, bodies)?.build();
    log_stage("plot-passes", t_passes);
    Ok(model)
}

pub fn log_stage(name: &str, t: Instant) {
    tracing::debug!(stage = name, time = %fmt_dur(t.elapsed()), "stage finished");
}

pub fn fmt_dur(d: Duration) -> String {
    if d.as_secs_f64() < 1.0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.3}s", d.as_secs_f64())
    }
}
