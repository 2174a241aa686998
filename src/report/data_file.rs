//! Flat sample → column → value export, one TSV per tab.

use crate::core::model::SampleId;
use crate::core::plots::{BarDataset, DatasetBody, ScatterDataset, ViolinDataset};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExportTable {
    /// First entry names the sample column.
    pub columns: Vec<String>,
    pub rows: Vec<(String, Vec<String>)>,
}

pub fn fmt_number(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

fn bar_table(ds: &BarDataset) -> ExportTable {
    let mut columns = vec!["Sample".to_string()];
    columns.extend(ds.categories.iter().map(|c| c.name.clone()));
    // Stored bottom to top; export in the caller's order.
    let rows = (0..ds.samples.len())
        .rev()
        .map(|i| {
            let cells = ds.categories.iter().map(|c| fmt_number(c.data[i])).collect();
            (ds.samples[i].to_string(), cells)
        })
        .collect();
    ExportTable { columns, rows }
}

fn scatter_table(ds: &ScatterDataset) -> ExportTable {
    ExportTable {
        columns: vec!["Name".into(), "X".into(), "Y".into()],
        rows: ds
            .points
            .iter()
            .map(|p| (p.name.to_string(), vec![p.x.to_string(), p.y.to_string()]))
            .collect(),
    }
}

fn violin_table(ds: &ViolinDataset) -> ExportTable {
    let mut columns = vec!["Sample".to_string()];
    columns.extend(ds.rows.iter().map(|r| r.title.clone()));

    let mut order: Vec<SampleId> = Vec::new();
    let mut cells: HashMap<SampleId, Vec<String>> = HashMap::new();
    for (col, row) in ds.rows.iter().enumerate() {
        for (sample, value) in row.violin.iter() {
            let line = cells.entry(Arc::clone(sample)).or_insert_with(|| {
                order.push(Arc::clone(sample));
                vec![String::new(); ds.rows.len()]
            });
            line[col] = value.to_string();
        }
    }
    let rows = order
        .into_iter()
        .map(|s| {
            let line = cells.remove(&s).unwrap_or_default();
            (s.to_string(), line)
        })
        .collect();
    ExportTable { columns, rows }
}

pub fn export_table(body: &DatasetBody) -> ExportTable {
    match body {
        DatasetBody::Bar(ds) => bar_table(ds),
        DatasetBody::Scatter(ds) => scatter_table(ds),
        DatasetBody::Violin(ds) => violin_table(ds),
    }
}

/// Tabs and line breaks inside a field would split it, so they become spaces.
fn tsv_field(s: &str) -> String {
    s.replace(['\t', '\r', '\n'], " ")
}

fn tsv_line(fields: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    fields
        .into_iter()
        .map(|f| tsv_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join("\t")
}

pub fn write_tsv(path: &Path, table: &ExportTable) -> Result<()> {
    let mut w = BufWriter::new(
        File::create(path).with_context(|| format!("create {} failed", path.display()))?,
    );
    writeln!(w, "{}", tsv_line(&table.columns))?;
    for (sample, cells) in &table.rows {
        writeln!(w, "{}", tsv_line(std::iter::once(sample).chain(cells)))?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Interner, PlotConfig};
    use crate::core::plots::bar::{self, BarCategoryInput, BarTabInput, Stacking};
    use crate::core::plots::violin::{self, MetricInput};
    use crate::core::settings::Settings;
    use serde_json::json;

    #[test]
    fn bar_export_is_in_caller_order() {
        let tab = BarTabInput {
            categories: vec![BarCategoryInput {
                name: Some("reads".into()),
                data: vec![Some(1.0), Some(2.5), None],
                ..Default::default()
            }],
            samples: vec!["a".into(), "b".into(), "c".into()],
        };
        let ds = bar::assemble(tab, &PlotConfig::new("b"), Stacking::Group, &mut Interner::new())
            .unwrap();
        let table = export_table(&DatasetBody::Bar(ds));
        assert_eq!(table.columns, vec!["Sample", "reads"]);
        assert_eq!(
            table.rows,
            vec![
                ("a".to_string(), vec!["1".to_string()]),
                ("b".to_string(), vec!["2.5".to_string()]),
                ("c".to_string(), vec![String::new()]),
            ]
        );
    }

    #[test]
    fn violin_export_fills_missing_cells() {
        let metrics = vec![
            MetricInput {
                id: "m1".into(),
                values: json!({"s1": 1, "s2": 2}).as_object().cloned().unwrap(),
                ..Default::default()
            },
            MetricInput {
                id: "m2".into(),
                title: Some("Second".into()),
                values: json!({"s2": "x"}).as_object().cloned().unwrap(),
                ..Default::default()
            },
        ];
        let ds = violin::assemble(metrics, &Settings::default(), &mut Interner::new()).unwrap();
        let table = export_table(&DatasetBody::Violin(ds));
        assert_eq!(table.columns, vec!["Sample", "m1", "Second"]);
        assert_eq!(table.rows[0], ("s1".to_string(), vec!["1".to_string(), String::new()]));
        assert_eq!(table.rows[1], ("s2".to_string(), vec!["2".to_string(), "x".to_string()]));
    }

    #[test]
    fn tsv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.tsv");
        let table = ExportTable {
            columns: vec!["Name".into(), "X".into()],
            rows: vec![("p".into(), vec!["1".into()])],
        };
        write_tsv(&path, &table).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Name\tX\np\t1\n");
    }

    #[test]
    fn separators_inside_fields_are_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.tsv");
        let table = ExportTable {
            columns: vec!["Sample".into(), "GC\tcontent".into()],
            rows: vec![("run\n1".into(), vec!["a\r\nb".into()])],
        };
        write_tsv(&path, &table).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Sample\tGC content\nrun 1\ta  b\n"
        );
    }
}
