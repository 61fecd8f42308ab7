use crate::error::{ErrorKind, Result};
use clap::Args;
use exn::ResultExt;
use logstat_extract::{Mode, Row, discover, parse_file};
use logstat_report::ensure_unlocked;
use logstat_report::stat::{artifact_paths, write_stat_report};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Directory with *.log and *.log.gz files.
    pub log_dir: PathBuf,
    /// Directory to save statistics in, `log_dir` by default.
    #[arg(long = "save_dir", visible_alias = "save-dir")]
    pub save_dir: Option<PathBuf>,
    /// One row per record with every field, instead of barcode counts.
    #[arg(long)]
    pub full: bool,
}

pub async fn run(args: &StatsArgs) -> Result<()> {
    let save_dir = args.save_dir.clone().unwrap_or_else(|| args.log_dir.clone());
    for dir in [&args.log_dir, &save_dir] {
        if !dir.is_dir() {
            exn::bail!(ErrorKind::NotADirectory(dir.clone()));
        }
    }
    let mode = if args.full { Mode::Full } else { Mode::Barcode };
    let (workbook, _) = artifact_paths(&save_dir, mode);
    ensure_unlocked(&workbook).or_raise(|| ErrorKind::Stats)?;

    let files = discover(&args.log_dir).or_raise(|| ErrorKind::Stats)?;
    if files.is_empty() {
        println!("no *.log or *.log.gz files found in {}", args.log_dir.display());
        return Ok(());
    }
    tracing::info!(files = files.len(), ?mode, "Parsing log files");

    let rows = tokio::task::spawn_blocking(move || parse_all(&files, mode))
        .await
        .or_raise(|| ErrorKind::Stats)?
        .or_raise(|| ErrorKind::Stats)?;
    if rows.is_empty() {
        println!("no data found");
        return Ok(());
    }

    let written = tokio::task::spawn_blocking(move || write_stat_report(&rows, mode, &save_dir))
        .await
        .or_raise(|| ErrorKind::Stats)?
        .or_raise(|| ErrorKind::Stats)?;
    println!("files created:");
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn parse_all(files: &[PathBuf], mode: Mode) -> logstat_extract::error::Result<Vec<Row>> {
    let mut rows = Vec::new();
    for (index, path) in files.iter().enumerate() {
        rows.extend(parse_file(path, mode)?);
        tracing::debug!(file = %name(path), done = index + 1, total = files.len(), rows = rows.len(), "Parsed");
    }
    Ok(rows)
}

fn name(path: &Path) -> String {
    path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
}
