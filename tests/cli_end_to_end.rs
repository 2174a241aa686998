use clap::Parser;
use kira_qcplot::cli::args::Cli;
use kira_qcplot::cli::run::run_cli;
use std::fs;
use std::path::Path;

fn build(input: &Path, out: &Path, extra: &[&str]) -> anyhow::Result<std::path::PathBuf> {
    let mut argv = vec![
        "kira-qcplot".to_string(),
        "build".to_string(),
        input.display().to_string(),
        "--out".to_string(),
        out.display().to_string(),
        "--threads".to_string(),
        "2".to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    run_cli(Cli::try_parse_from(argv)?)
}

#[test]
fn bar_request_writes_every_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("reads.json");
    fs::write(
        &input,
        r#"{
            "type": "bar",
            "config": {"id": "reads", "title": "Read counts", "add_pct_tab": true,
                       "data_labels": ["Raw", "Trimmed"]},
            "categories": [
                [{"name": "Unique", "data": [1, 1]}, {"name": "Duplicate", "data": [1, 3]}],
                [{"name": "Unique", "data": [5]}]
            ],
            "samples": [["alpha", "beta"], ["alpha"]]
        }"#,
    )
    .unwrap();
    let out = dir.path().join("out");

    let plot_dir = build(&input, &out, &[]).unwrap();
    assert_eq!(plot_dir, out.join("reads"));
    for name in ["plot.json", "reads.tsv", "reads_2.tsv", "prompt.md"] {
        assert!(plot_dir.join(name).is_file(), "missing {}", name);
    }
    assert!(out.join("reads_plot.zip").is_file());

    let model: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(plot_dir.join("plot.json")).unwrap()).unwrap();
    assert_eq!(model["kind"], "bar");
    assert_eq!(model["datasets"][1]["label"], "Trimmed");

    let tsv = fs::read_to_string(plot_dir.join("reads.tsv")).unwrap();
    assert_eq!(tsv, "Sample\tUnique\tDuplicate\nalpha\t1\t1\nbeta\t1\t3\n");

    let prompt = fs::read_to_string(plot_dir.join("prompt.md")).unwrap();
    assert!(prompt.contains("### Raw"));
    assert!(prompt.contains("|SAMPLE_1|"));
    assert!(!prompt.contains("alpha"));
}

#[test]
fn gzip_violin_request_without_zip() {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("metrics.json.gz");
    let mut enc = GzEncoder::new(fs::File::create(&input).unwrap(), Compression::default());
    enc.write_all(
        br#"{
            "type": "violin",
            "config": {"id": "qc"},
            "tabs": [[
                {"id": "gc", "title": "GC", "suffix": "%", "values": {"s1": 41.5, "s2": 40.1}},
                {"id": "q30", "title": "Q30", "values": {"s1": 0.9, "s2": "NaN"}}
            ]]
        }"#,
    )
    .unwrap();
    enc.finish().unwrap();
    let out = dir.path().join("out");

    let plot_dir = build(&input, &out, &["--no-zip", "--no-anonymize"]).unwrap();
    assert!(!out.join("qc_plot.zip").exists());
    let prompt = fs::read_to_string(plot_dir.join("prompt.md")).unwrap();
    assert!(prompt.starts_with("Plot type: violin plot\n"));
    assert!(prompt.contains("|s1|41.5%|0.9|"));
}

#[test]
fn malformed_request_fails_without_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.json");
    fs::write(
        &input,
        r#"{"type": "bar", "config": {"id": "bad"},
            "categories": [[{"name": "X", "data": [1, 2, 3]}]], "samples": [["s1"]]}"#,
    )
    .unwrap();
    let out = dir.path().join("out");

    let err = build(&input, &out, &[]).unwrap_err();
    assert!(format!("{:#}", err).contains("bad"));
    assert!(!out.join("bad").exists());
}

#[test]
fn missing_input_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = build(&dir.path().join("nope.json"), dir.path(), &[]).unwrap_err();
    assert!(err.to_string().contains("input file not found"));
}
