//! Markdown view of a finished plot, sized for pasting into a chat prompt.

use crate::core::plot_model::PlotModel;
use crate::core::plots::{BarDataset, DatasetBody, PlotKind, ScatterDataset, ViolinDataset};
use crate::report::data_file::fmt_number;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Stable `SAMPLE_<n>` names, numbered in first-seen order.
#[derive(Debug, Default)]
pub struct Pseudonymizer {
    enabled: bool,
    names: HashMap<String, String>,
}

impl Pseudonymizer {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            names: HashMap::new(),
        }
    }

    pub fn name(&mut self, sample: &str) -> String {
        if !self.enabled {
            return sample.to_string();
        }
        let next = self.names.len() + 1;
        self.names
            .entry(sample.to_string())
            .or_insert_with(|| format!("SAMPLE_{}", next))
            .clone()
    }
}

fn header(model: &PlotModel) -> String {
    let cfg = &model.config;
    let mut out = format!("Plot type: {}\n", model.type_label());
    if let Some(title) = &cfg.title {
        let _ = writeln!(out, "Title: {}", title);
    }
    match model.kind {
        PlotKind::Bar => {
            if let Some(ylab) = &cfg.ylab {
                let _ = writeln!(out, "Values: {}", ylab);
            }
        }
        PlotKind::Scatter => {
            if let Some(xlab) = &cfg.xlab {
                let _ = writeln!(out, "X axis: {}", xlab);
            }
            if let Some(ylab) = &cfg.ylab {
                let _ = writeln!(out, "Y axis: {}", ylab);
            }
            if let Some(categories) = cfg.categories.as_deref().filter(|c| !c.is_empty()) {
                let _ = writeln!(out, "X categories: {}", categories.join(", "));
            }
        }
        PlotKind::Violin => {}
    }
    if let Some(notice) = &model.notice {
        let _ = writeln!(out, "{}", notice);
    }
    out
}

fn bar_section(ds: &BarDataset, suffix: Option<&str>, names: &mut Pseudonymizer) -> String {
    let suffix = suffix.map(|s| format!(" {}", s)).unwrap_or_default();
    let mut out = String::new();
    let cats: Vec<&str> = ds.categories.iter().map(|c| c.name.as_str()).collect();
    let _ = writeln!(out, "|Sample|{}|", cats.join("|"));
    let _ = writeln!(out, "|---|{}|", vec!["---"; cats.len()].join("|"));
    for i in (0..ds.samples.len()).rev() {
        let cells: Vec<String> = ds
            .categories
            .iter()
            .map(|c| match fmt_number(c.data[i]) {
                n if n.is_empty() => n,
                n => format!("{}{}", n, suffix),
            })
            .collect();
        let _ = writeln!(out, "|{}|{}|", names.name(&ds.samples[i]), cells.join("|"));
    }
    out
}

fn scatter_section(
    ds: &ScatterDataset,
    xsuffix: &str,
    ysuffix: &str,
    names: &mut Pseudonymizer,
) -> String {
    let mut out = String::from("|Sample|X|Y|\n|---|---|---|\n");
    for p in &ds.points {
        let _ = writeln!(
            out,
            "|{}|{}{}|{}{}|",
            names.name(&p.name),
            p.x,
            xsuffix,
            p.y,
            ysuffix
        );
    }
    out
}

fn violin_section(
    ds: &ViolinDataset,
    col1_header: &str,
    downsample_cap: Option<usize>,
    names: &mut Pseudonymizer,
) -> String {
    let mut out = format!("Number of samples: {}\n", ds.all_samples.len());
    if ds.is_downsampled {
        let _ = writeln!(
            out,
            "Note: sample number {} is greater than the threshold {}, so data points were \
             downsampled to fit the context window. However, outliers for each metric were \
             identified and kept in the datasets.",
            ds.all_samples.len(),
            downsample_cap.map(|c| c.to_string()).unwrap_or_default()
        );
    }
    out.push('\n');

    let metrics: Vec<String> = ds
        .rows
        .iter()
        .map(|r| format!("{} - {}", r.title, r.description))
        .collect();
    let _ = write!(out, "Metrics:\n{}\n\n", metrics.join("\n"));

    let titles: Vec<&str> = ds.rows.iter().map(|r| r.title.as_str()).collect();
    let _ = writeln!(out, "|{}|{}|", col1_header, titles.join("|"));
    let _ = writeln!(out, "|---|{}|", vec!["---"; titles.len()].join("|"));
    for sample in &ds.all_samples {
        let cells: Vec<String> = ds
            .rows
            .iter()
            .map(|r| match r.value(sample) {
                Some(v) => format!("{}{}", v, r.suffix),
                None => String::new(),
            })
            .collect();
        if cells.iter().all(String::is_empty) {
            continue;
        }
        let _ = writeln!(out, "|{}|{}|", names.name(sample), cells.join("|"));
    }
    out
}

/// Builds the prompt text: a header, then one markdown table per tab.
pub fn render(model: &PlotModel, anonymize: bool, downsample_cap: Option<usize>) -> String {
    let cfg = &model.config;
    let mut names = Pseudonymizer::new(anonymize);
    let mut out = header(model);
    let multi = model.datasets.len() > 1;
    for view in &model.datasets {
        out.push('\n');
        if multi {
            let _ = writeln!(out, "### {}\n", view.label);
        }
        let section = match &view.body {
            DatasetBody::Bar(ds) => bar_section(ds, cfg.ysuffix.as_deref(), &mut names),
            DatasetBody::Scatter(ds) => scatter_section(
                ds,
                cfg.xsuffix.as_deref().unwrap_or(""),
                cfg.ysuffix.as_deref().unwrap_or(""),
                &mut names,
            ),
            DatasetBody::Violin(ds) => {
                violin_section(ds, &cfg.col1_header, downsample_cap, &mut names)
            }
        };
        out.push_str(&section);
    }
    out
}

pub fn write(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::{self, PlotRequest};

    fn model(json: &str) -> PlotModel {
        let req: PlotRequest = serde_json::from_str(json).unwrap();
        engine::run(req, 1).unwrap()
    }

    #[test]
    fn pseudonyms_follow_first_appearance() {
        let mut p = Pseudonymizer::new(true);
        assert_eq!(p.name("zeta"), "SAMPLE_1");
        assert_eq!(p.name("alpha"), "SAMPLE_2");
        assert_eq!(p.name("zeta"), "SAMPLE_1");
        let mut off = Pseudonymizer::new(false);
        assert_eq!(off.name("zeta"), "zeta");
    }

    #[test]
    fn bar_prompt() {
        let m = model(
            r#"{"type": "bar", "config": {"id": "b", "title": "Reads", "ylab": "Count", "ysuffix": "M"},
                "categories": [[{"name": "X", "data": [1, 2]}]], "samples": [["s1", "s2"]]}"#,
        );
        let text = render(&m, true, None);
        assert!(text.starts_with("Plot type: bar plot\nTitle: Reads\nValues: Count\n"));
        assert!(text.contains("|Sample|X|\n|---|---|\n|SAMPLE_1|1 M|\n|SAMPLE_2|2 M|\n"));
    }

    #[test]
    fn bar_gaps_are_empty_cells() {
        let m = model(
            r#"{"type": "bar", "config": {"id": "b", "ysuffix": "M"},
                "categories": [[{"name": "X", "data": [null, 2]}]], "samples": [["s1", "s2"]]}"#,
        );
        let text = render(&m, false, None);
        assert!(text.contains("|s1||\n|s2|2 M|\n"));
    }

    #[test]
    fn scatter_prompt_uses_suffixes() {
        let m = model(
            r#"{"type": "scatter", "config": {"id": "s", "xsuffix": "%", "xlab": "GC"},
                "tabs": [[{"name": "a", "x": 40, "y": 1.5}]]}"#,
        );
        let text = render(&m, false, None);
        assert!(text.contains("X axis: GC\n"));
        assert!(text.contains("|a|40%|1.5|"));
    }

    #[test]
    fn violin_prompt_lists_metrics_and_rows() {
        let m = model(
            r#"{"type": "violin", "config": {"id": "v", "col1_header": "Run"},
                "tabs": [[
                    {"id": "gc", "title": "GC", "description": "GC content", "suffix": "%",
                     "values": {"r2": 40, "r1": 50}},
                    {"id": "dup", "title": "Dups", "values": {"r1": 0.5}}
                ]]}"#,
        );
        let text = render(&m, false, Some(2000));
        assert!(text.starts_with("Plot type: violin plot\n"));
        assert!(text.contains("Number of samples: 2\n"));
        assert!(text.contains("Metrics:\nGC - GC content\nDups - \n"));
        assert!(text.contains("|Run|GC|Dups|\n|---|---|---|\n|r1|50%|0.5|\n|r2|40%||\n"));
    }
}
