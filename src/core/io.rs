use crate::core::engine::PlotRequest;
use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputKind {
    Plain,
    Gzip,
}

pub fn detect_input_kind(path: &Path) -> Result<InputKind> {
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        if ext.eq_ignore_ascii_case("gz") {
            return Ok(InputKind::Gzip);
        }
    }
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut magic = [0u8; 2];
    let n = file
        .read(&mut magic)
        .with_context(|| "failed to read magic bytes")?;
    if n == 2 && magic == [0x1f, 0x8b] {
        Ok(InputKind::Gzip)
    } else {
        Ok(InputKind::Plain)
    }
}

pub fn open_reader(path: &Path) -> Result<Box<dyn Read + Send>> {
    let kind = detect_input_kind(path)?;
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    Ok(match kind {
        InputKind::Plain => Box::new(reader),
        InputKind::Gzip => Box::new(MultiGzDecoder::new(reader)),
    })
}

/// Reads a chart request, plain or gzip-compressed JSON.
pub fn read_request(path: &Path) -> Result<PlotRequest> {
    let reader = BufReader::new(open_reader(path)?);
    serde_json::from_reader(reader)
        .with_context(|| format!("failed to parse plot request {}", path.display()))
}
