use crate::core::plot_model::PlotModel;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn write(path: &Path, model: &PlotModel) -> Result<()> {
    let mut w = BufWriter::new(
        File::create(path).with_context(|| format!("create {} failed", path.display()))?,
    );
    serde_json::to_writer_pretty(&mut w, model).with_context(|| "serialise plot model failed")?;
    writeln!(w)?;
    w.flush()?;
    Ok(())
}
