use crate::error::{ErrorKind, Result};
use clap::Args;
use exn::ResultExt;
use logstat_config::Config;
use logstat_storage::BackendHandle;
use logstat_storage::backend::{LocalBackend, SftpBackend, SftpCredentials};
use std::path::PathBuf;
use std::sync::Arc;
use time::{Date, OffsetDateTime};

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Local directory for decompressed logs, instead of `local.directory`.
    #[arg(long)]
    pub local_dir: Option<PathBuf>,
}

/// Today in the local timezone, or in UTC if the local offset is unknown.
fn today() -> Date {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()).date()
}

pub async fn run(args: &SyncArgs, config: &Config) -> Result<()> {
    let (host, username, password) = config.remote.require_credentials().or_raise(|| ErrorKind::Config)?;
    let local_dir = args.local_dir.as_ref().unwrap_or(&config.local.directory);
    let local_dir = std::path::absolute(local_dir).or_raise(|| ErrorKind::Sync)?;
    let local: BackendHandle = Arc::new(LocalBackend::new("local", &local_dir).or_raise(|| ErrorKind::Sync)?);

    let credentials = SftpCredentials {
        host: host.to_string(),
        port: config.remote.port,
        username: username.to_string(),
        password: password.to_string(),
    };
    let remote = SftpBackend::connect("remote", credentials, config.remote.directory.clone())
        .await
        .or_raise(|| ErrorKind::Sync)?;
    let remote: BackendHandle = Arc::new(remote);

    let report = logstat_sync::sync(&remote, &local, today()).await.or_raise(|| ErrorKind::Sync)?;
    tracing::info!(
        synced = report.synced.len(),
        corrupt = report.corrupt.len(),
        skipped_today = report.skipped_today.len(),
        "Sync finished"
    );
    for name in &report.corrupt {
        tracing::warn!(archive = %name, "Archive was corrupt and will be retried on the next run");
    }
    Ok(())
}
