use crate::error::{ErrorKind, Result};
use clap::Args;
use exn::ResultExt;
use logstat_config::Config;
use logstat_index::{IndexClient, TimeRange};
use logstat_report::index::write_index_reports;
use std::path::PathBuf;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Directory to write reports into, instead of `reports.directory`.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Only time queries made at or after this instant (RFC 3339).
    #[arg(long, value_parser = rfc3339)]
    pub since: Option<OffsetDateTime>,
    /// Only time queries made at or before this instant (RFC 3339).
    #[arg(long, value_parser = rfc3339)]
    pub until: Option<OffsetDateTime>,
}

fn rfc3339(value: &str) -> std::result::Result<OffsetDateTime, time::error::Parse> {
    OffsetDateTime::parse(value, &Rfc3339)
}

pub async fn run(args: &ReportArgs, config: &Config) -> Result<()> {
    if let (Some(since), Some(until)) = (args.since, args.until)
        && since > until
    {
        exn::bail!(ErrorKind::InvalidRange);
    }
    let range = TimeRange { since: args.since, until: args.until };
    let dir = args.output_dir.as_ref().unwrap_or(&config.reports.directory);
    std::fs::create_dir_all(dir).or_raise(|| ErrorKind::NotADirectory(dir.clone()))?;

    let client = IndexClient::new(&config.index).or_raise(|| ErrorKind::Report)?;
    let written = write_index_reports(&client, &config.index, dir, &range)
        .await
        .or_raise(|| ErrorKind::Report)?;
    println!("files created:");
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}
