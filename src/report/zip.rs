use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub fn zip_path(out_dir: &Path, plot_id: &str) -> PathBuf {
    out_dir.join(format!("{}_plot.zip", plot_id))
}

/// Bundles `<out_dir>/<plot_id>/<file>` for each listed file into
/// `<out_dir>/<plot_id>_plot.zip`. The archive only appears once complete.
pub fn write_zip(out_dir: &Path, plot_id: &str, files: &[String]) -> Result<PathBuf> {
    let zip_path = zip_path(out_dir, plot_id);
    let tmp_path = out_dir.join(format!("{}_plot.zip.tmp", plot_id));

    let file = File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let result = write_zip_entries(&mut zip, out_dir, plot_id, files);

    match result.and_then(|_| zip.finish().with_context(|| "failed to finalize zip")) {
        Ok(_) => {
            fs::rename(&tmp_path, &zip_path)
                .with_context(|| format!("failed to move zip to {}", zip_path.display()))?;
            Ok(zip_path)
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

fn write_zip_entries(
    zip: &mut ZipWriter<File>,
    out_dir: &Path,
    root: &str,
    files: &[String],
) -> Result<()> {
    let epoch = zip::DateTime::from_date_and_time(1980, 1, 1, 0, 0, 0)
        .map_err(|_| anyhow::anyhow!("invalid zip timestamp"))?;
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(epoch);

    zip.add_directory(format!("{}/", root), options)
        .with_context(|| "failed to add directory entry to zip")?;

    for name in files {
        let src_path = out_dir.join(root).join(name);
        let entry = format!("{}/{}", root, name);
        add_file(zip, &src_path, &entry, options)
            .with_context(|| format!("failed to add {} to zip", name))?;
    }
    Ok(())
}

fn add_file(
    zip: &mut ZipWriter<File>,
    src_path: &Path,
    zip_path: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    let mut file =
        File::open(src_path).with_context(|| format!("failed to open {}", src_path.display()))?;
    zip.start_file(zip_path, options)?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        zip.write_all(&buf[..n])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_contains_listed_files_under_plot_dir() {
        let dir = tempfile::tempdir().unwrap();
        let plot_dir = dir.path().join("gc");
        fs::create_dir_all(&plot_dir).unwrap();
        fs::write(plot_dir.join("plot.json"), "{}").unwrap();
        fs::write(plot_dir.join("prompt.md"), "x").unwrap();

        let path = write_zip(dir.path(), "gc", &["plot.json".into(), "prompt.md".into()]).unwrap();
        assert_eq!(path, dir.path().join("gc_plot.zip"));
        assert!(!dir.path().join("gc_plot.zip.tmp").exists());

        let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["gc/", "gc/plot.json", "gc/prompt.md"]);
    }

    #[test]
    fn missing_file_leaves_no_partial_archive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("gc")).unwrap();
        assert!(write_zip(dir.path(), "gc", &["absent.tsv".into()]).is_err());
        assert!(!dir.path().join("gc_plot.zip").exists());
        assert!(!dir.path().join("gc_plot.zip.tmp").exists());
    }
}
