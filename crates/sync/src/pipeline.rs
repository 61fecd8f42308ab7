//! Fetch-and-decompress, one archive at a time.

use crate::error::{ErrorKind, Result};
use crate::filter::{Watermark, select};
use crate::name::LogFileName;
use crate::resolve;
use exn::ResultExt;
use logstat_compress::Compression;
use logstat_storage::BackendHandle;
use logstat_storage::backend::{BoxSyncRead, BoxSyncWrite};
use logstat_storage::error::ErrorKind as StorageErrorKind;
use std::future::Future;
use std::io::{ErrorKind as IoErrorKind, Read, Write};
use std::ops::Deref;
use std::path::Path;
use time::Date;
use tracing::instrument;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// What happened to one selected archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Decompressed into the local store.
    Synced { name: String, bytes: u64 },
    /// The archive was damaged; nothing was kept and it will be retried.
    Corrupt { name: String },
}

/// Summary of a sync run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub synced: Vec<String>,
    pub corrupt: Vec<String>,
    pub skipped_today: Vec<String>,
}

/// Pull every archive dated after the local watermark and before `today`
/// from `remote`, leaving its decompressed log in `local`.
///
/// Archives are processed sequentially. A corrupt archive is logged and
/// skipped; any failure to reach the remote or to write locally stops the
/// run, keeping whatever was synced before it.
///
/// # Errors
/// - [`RemoteUnavailable`](ErrorKind::RemoteUnavailable) if listing or
///   downloading fails.
/// - [`LocalIo`](ErrorKind::LocalIo) if the local store can't be listed,
///   written or cleaned up.
/// - [`InvalidFileName`](ErrorKind::InvalidFileName) if a remote name that
///   needs syncing does not follow the dated naming pattern.
#[instrument(skip_all, fields(remote = remote.name(), local = local.name(), %today))]
pub async fn sync(remote: &BackendHandle, local: &BackendHandle, today: Date) -> Result<SyncReport> {
    let local_names = list_names(local).await.or_raise(|| ErrorKind::LocalIo)?;
    let watermark = Watermark::from_local(local_names.iter().map(String::as_str));
    tracing::debug!(watermark = %watermark.0, "Computed local watermark");

    let remote_names = list_names(remote).await.or_raise(|| ErrorKind::RemoteUnavailable)?;
    let missing = resolve::missing(
        remote_names.iter().map(String::as_str),
        local_names.iter().map(String::as_str),
    );
    let selection = select(missing, watermark, today)?;
    tracing::info!(
        selected = selection.selected.len(),
        excluded = selection.excluded.len(),
        "Resolved archives to fetch"
    );

    let mut report = SyncReport {
        skipped_today: selection.today.iter().map(LogFileName::archive_name).collect(),
        ..SyncReport::default()
    };
    for file in &selection.selected {
        match sync_file(remote, local, file).await? {
            SyncOutcome::Synced { name, .. } => report.synced.push(name),
            SyncOutcome::Corrupt { name } => report.corrupt.push(name),
        }
    }
    Ok(report)
}

async fn list_names(backend: &BackendHandle) -> logstat_storage::error::Result<Vec<String>> {
    Ok(backend.list().await?.iter().filter_map(|file| file.file_name()).map(str::to_string).collect())
}

/// Download one archive, inflate it next to the other logs, then remove the
/// downloaded archive whatever the outcome.
#[instrument(skip_all, fields(archive = %file.archive_name()))]
pub async fn sync_file(remote: &BackendHandle, local: &BackendHandle, file: &LogFileName) -> Result<SyncOutcome> {
    let archive = file.archive_name();
    let log = file.log_name();
    let outcome = scoped(local, Path::new(&archive), async {
        download(remote, local, Path::new(&archive)).await?;
        decompress(local, Path::new(&archive), Path::new(&log)).await
    })
    .await?;
    match &outcome {
        SyncOutcome::Synced { name, bytes } => tracing::info!(file = %name, bytes, "Synced"),
        SyncOutcome::Corrupt { name } => tracing::warn!(file = %name, "File is corrupted; will retry next run"),
    }
    Ok(outcome)
}

/// Run `work`, then delete `intermediate` from `local` on every exit path.
///
/// An error from `work` takes precedence over an error from the cleanup.
async fn scoped<T>(local: &BackendHandle, intermediate: &Path, work: impl Future<Output = Result<T>>) -> Result<T> {
    let result = work.await;
    let cleanup = discard(local, intermediate).await;
    let value = result?;
    cleanup?;
    Ok(value)
}

/// Delete `path` from `local`, treating an already-missing file as done.
async fn discard(local: &BackendHandle, path: &Path) -> Result<()> {
    match local.delete(path).await {
        Ok(()) => Ok(()),
        Err(e) if matches!(e.deref(), StorageErrorKind::NotFound(_)) => Ok(()),
        Err(e) => Err(e).or_raise(|| ErrorKind::LocalIo),
    }
}

async fn download(remote: &BackendHandle, local: &BackendHandle, archive: &Path) -> Result<u64> {
    let source = remote.reader(archive).await.or_raise(|| ErrorKind::RemoteUnavailable)?;
    let target = local.writer(archive).await.or_raise(|| ErrorKind::LocalIo)?;
    let bytes = tokio::task::spawn_blocking(move || copy(source, target)).await.or_raise(|| ErrorKind::LocalIo)??;
    tracing::debug!(bytes, "Downloaded archive");
    Ok(bytes)
}

/// Like [`std::io::copy`], but keeps read failures (remote) apart from write
/// failures (local).
fn copy(mut reader: BoxSyncRead, mut writer: BoxSyncWrite) -> Result<u64> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
            Err(e) => return Err(e).or_raise(|| ErrorKind::RemoteUnavailable),
        };
        writer.write_all(&buffer[..read]).or_raise(|| ErrorKind::LocalIo)?;
        total += read as u64;
    }
    writer.flush().or_raise(|| ErrorKind::LocalIo)?;
    Ok(total)
}

/// Inflate `archive` into `log`. Whenever this does not return
/// [`Synced`](SyncOutcome::Synced), no `log` is left behind: a partial one
/// would raise the watermark and the day would never be fetched again.
async fn decompress(local: &BackendHandle, archive: &Path, log: &Path) -> Result<SyncOutcome> {
    let name = log.display().to_string();
    let source = local.reader(archive).await.or_raise(|| ErrorKind::LocalIo)?;
    let target = local.writer(log).await.or_raise(|| ErrorKind::LocalIo)?;
    let result = tokio::task::spawn_blocking(move || Compression::Gzip.decompress_stream(source, target)).await;
    let failed: Result<SyncOutcome> = match result {
        Ok(Ok(bytes)) => return Ok(SyncOutcome::Synced { name, bytes }),
        Ok(Err(e)) if e.is_corrupt_input() => {
            let err = e.raise(ErrorKind::CorruptArchive(archive.display().to_string()));
            tracing::debug!(error = ?err, "Discarding partial output");
            discard(local, log).await?;
            return Ok(SyncOutcome::Corrupt { name: archive.display().to_string() });
        },
        Ok(Err(e)) => Err(e).or_raise(|| ErrorKind::LocalIo),
        Err(e) => Err(e).or_raise(|| ErrorKind::LocalIo),
    };
    if let Err(e) = discard(local, log).await {
        tracing::warn!(file = %name, error = ?e, "Could not remove partial output");
    }
    failed
}
