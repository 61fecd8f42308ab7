use assert_cmd::Command;
use logstat_compress::Compression;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

const BARCODE_LINE: &str = r#"{"@timestamp":"2024-01-02T10:00:00.000Z","request":{"body":{"barcodes":["111"]}},"response":{"body":{"nomenclatures":[{"id":"n1","barcodes":["111","111"]}]}}}"#;
const SEARCH_LINE: &str = r#"{"@timestamp":"2024-01-03T09:00:00.000Z","request":{"query":"q%3Dmilk","body":{"search":{"text":"milk"}}},"response":{"body":{"nomenclatures":[]}}}"#;

fn logstat() -> Command {
    let mut cmd = Command::cargo_bin("logstat").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("LOGSTAT_CONFIG");
    cmd
}

fn write_logs(dir: &Path) {
    let archive = format!("{BARCODE_LINE}\nnot json at all\n");
    fs::write(dir.join("site-2024-01-02.log.gz"), Compression::Gzip.compress(archive.as_bytes()).unwrap()).unwrap();
    fs::write(dir.join("site-2024-01-03.log"), format!("{SEARCH_LINE}\n")).unwrap();
    fs::write(dir.join("notes.txt"), "ignored").unwrap();
}

#[test]
fn stats_rejects_missing_log_dir() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");
    logstat()
        .arg("stats")
        .arg(&missing)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("is not a directory"));
    assert!(!missing.exists());
}

#[test]
fn stats_rejects_missing_save_dir() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(dir.path());
    logstat()
        .arg("stats")
        .arg(dir.path())
        .arg("--save_dir")
        .arg(dir.path().join("out"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is not a directory"));
    assert!(!dir.path().join("stat.xlsx").exists());
}

#[test]
fn stats_without_log_files_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    logstat()
        .arg("stats")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("no *.log or *.log.gz files found"));
    assert!(!dir.path().join("stat.xlsx").exists());
}

#[test]
fn stats_without_rows_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("site-2024-01-03.log"), format!("{SEARCH_LINE}\n")).unwrap();
    logstat().arg("stats").arg(dir.path()).assert().success().stdout(predicate::str::contains("no data found"));
    assert!(!dir.path().join("stat.csv").exists());
}

#[test]
fn stats_writes_barcode_report() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(dir.path());
    logstat()
        .arg("stats")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("files created:").and(predicate::str::contains("stat.xlsx")));

    assert!(dir.path().join("stat.xlsx").is_file());
    let csv = fs::read_to_string(dir.path().join("stat.csv")).unwrap();
    assert_eq!(csv, "date\tfile\tbarcode\trequested\tfound\n2024-01-02\tsite-2024-01-02.log.gz\t111\t1\t1\n");
}

#[test]
fn stats_writes_full_report_into_save_dir() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_logs(dir.path());
    logstat()
        .args(["-q", "stats", "--full", "--save_dir"])
        .arg(out.path())
        .arg(dir.path())
        .assert()
        .success();

    assert!(out.path().join("stat_full.xlsx").is_file());
    assert!(!dir.path().join("stat_full.xlsx").exists());
    let csv = fs::read_to_string(out.path().join("stat_full.csv")).unwrap();
    let mut lines = csv.lines();
    let header: Vec<&str> = lines.next().unwrap().split('\t').collect();
    assert!(header.contains(&"date"));
    assert!(header.contains(&"request_query"));
    assert!(header.contains(&"request_barcodes"));
    assert!(!header.contains(&"@timestamp"));
    assert_eq!(lines.count(), 2);
    assert!(csv.contains("q=milk"));
}

#[test]
fn stats_refuses_unopenable_workbook_before_extracting() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(dir.path());
    // A directory can't be opened for writing, whoever runs the test.
    fs::create_dir(dir.path().join("stat.xlsx")).unwrap();
    logstat()
        .arg("stats")
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("please close it"));
    assert!(dir.path().join("stat.xlsx").is_dir());
    assert!(!dir.path().join("stat.csv").exists());
}
