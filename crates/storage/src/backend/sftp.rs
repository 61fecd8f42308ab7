//! SFTP storage backend.
//!
//! Remote log stores are plain directories on an SSH host, reached with
//! username/password authentication. `ssh2` is a blocking library, so every
//! call is moved onto Tokio's blocking pool and awaited straight away; only
//! one operation is ever in flight per backend.
//!
//! The session is opened once in [`SftpBackend::connect`] and closed either
//! explicitly with [`SftpBackend::disconnect`] or when the backend is dropped.

use super::{BoxSyncRead, BoxSyncWrite, FileInfoStream};
use crate::error::{Error, ErrorKind, Result};
use crate::{FileInfo, StorageBackend, validate_path};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use ssh2::{ErrorCode, Session, Sftp};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use time::OffsetDateTime;

// libssh2 SFTP status codes.
const FX_NO_SUCH_FILE: i32 = 2;
const FX_PERMISSION_DENIED: i32 = 3;

/// Connection details for an SFTP log store.
#[derive(Clone)]
pub struct SftpCredentials {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}
impl SftpCredentials {
    fn address(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}
impl std::fmt::Debug for SftpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// SFTP storage backend rooted at a remote directory.
///
/// ```no_run
/// use logstat_storage::backend::{SftpBackend, SftpCredentials, StorageBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let credentials = SftpCredentials {
///     host: "logs.example.com".to_string(),
///     port: 22,
///     username: "reader".to_string(),
///     password: "secret".to_string(),
/// };
/// let remote = SftpBackend::connect("remote", credentials, "logstash").await?;
/// for file in remote.list().await? {
///     println!("{}", file.path.display());
/// }
/// remote.disconnect().await?;
/// # Ok(())
/// # }
/// ```
pub struct SftpBackend {
    name: String,
    root: PathBuf,
    session: Arc<Mutex<Session>>,
    sftp: Arc<Mutex<Sftp>>,
}

impl SftpBackend {
    /// Open the TCP connection, perform the SSH handshake, authenticate and
    /// start the SFTP subsystem.
    ///
    /// # Errors
    ///
    /// [`Network`](ErrorKind::Network) if the host can't be reached or the
    /// handshake fails, [`Authentication`](ErrorKind::Authentication) if the
    /// credentials are rejected.
    #[tracing::instrument(skip_all, fields(address = %credentials.address()))]
    pub async fn connect(
        name: impl Into<String>,
        credentials: SftpCredentials,
        root: impl Into<PathBuf>,
    ) -> Result<Self> {
        let name = name.into();
        let root = root.into();
        let (session, sftp) = tokio::task::spawn_blocking(move || Self::open(&credentials))
            .await
            .map_err(|e| exn::Exn::from(ErrorKind::BackendError(format!("connection task failed: {e}"))))??;
        tracing::debug!(backend = %name, root = %root.display(), "SFTP session established");
        Ok(Self {
            name,
            root,
            session: Arc::new(Mutex::new(session)),
            sftp: Arc::new(Mutex::new(sftp)),
        })
    }

    fn open(credentials: &SftpCredentials) -> Result<(Session, Sftp)> {
        let address = credentials.address();
        let tcp = TcpStream::connect((credentials.host.as_str(), credentials.port))
            .or_raise(|| ErrorKind::Network(format!("could not connect to {address}")))?;
        let mut session = Session::new().or_raise(|| ErrorKind::Network("could not create SSH session".to_string()))?;
        session.set_tcp_stream(tcp);
        session.handshake().or_raise(|| ErrorKind::Network(format!("SSH handshake with {address} failed")))?;
        session
            .userauth_password(&credentials.username, &credentials.password)
            .or_raise(|| ErrorKind::Authentication(address.clone()))?;
        if !session.authenticated() {
            exn::bail!(ErrorKind::Authentication(address));
        }
        let sftp = session.sftp().or_raise(|| ErrorKind::Network(format!("SFTP subsystem unavailable on {address}")))?;
        Ok((session, sftp))
    }

    /// Close the SSH session.
    pub async fn disconnect(self) -> Result<()> {
        let session = Arc::clone(&self.session);
        drop(self.sftp);
        tokio::task::spawn_blocking(move || {
            let session = session.lock().unwrap_or_else(PoisonError::into_inner);
            session
                .disconnect(None, "logstat sync finished", None)
                .or_raise(|| ErrorKind::Network("could not close SSH session".to_string()))
        })
        .await
        .map_err(|e| exn::Exn::from(ErrorKind::BackendError(format!("disconnect task failed: {e}"))))?
    }

    fn remote_path(&self, path: &Path) -> Result<PathBuf> {
        Ok(self.root.join(validate_path(path)?))
    }

    fn map_error(err: ssh2::Error, path: &Path) -> Error {
        let kind = match err.code() {
            ErrorCode::SFTP(FX_NO_SUCH_FILE) => ErrorKind::NotFound(path.to_path_buf()),
            ErrorCode::SFTP(FX_PERMISSION_DENIED) => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Network(format!("SFTP operation on {} failed", path.display())),
        };
        exn::Exn::from(err).raise(kind)
    }

    /// Run `f` against the SFTP channel on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Sftp) -> Result<T> + Send + 'static,
    {
        let sftp = Arc::clone(&self.sftp);
        tokio::task::spawn_blocking(move || {
            let sftp = sftp.lock().unwrap_or_else(PoisonError::into_inner);
            f(&sftp)
        })
        .await
        .map_err(|e| exn::Exn::from(ErrorKind::BackendError(format!("SFTP task failed: {e}"))))?
    }

    fn file_info(path: &Path, stat: &ssh2::FileStat) -> Option<FileInfo> {
        if !stat.is_file() {
            return None;
        }
        let name = path.file_name()?;
        let modified = stat
            .mtime
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        Some(FileInfo::new(name, stat.size.unwrap_or(0), modified))
    }
}

#[async_trait]
impl StorageBackend for SftpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self) -> FileInfoStream<'a> {
        let root = self.root.clone();
        Box::pin(stream! {
            let listing = self
                .blocking(move |sftp| sftp.readdir(&root).map_err(|e| Self::map_error(e, &root)))
                .await;
            match listing {
                Ok(entries) => {
                    for (path, stat) in entries {
                        if let Some(info) = Self::file_info(&path, &stat) {
                            yield Ok(info);
                        }
                    }
                },
                Err(e) => yield Err(e),
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let remote = self.remote_path(path)?;
        self.blocking(move |sftp| match sftp.stat(&remote) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ErrorCode::SFTP(FX_NO_SUCH_FILE) => Ok(false),
            Err(e) => Err(Self::map_error(e, &remote)),
        })
        .await
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let remote = self.remote_path(path)?;
        self.blocking(move |sftp| {
            let mut file = sftp.open(&remote).map_err(|e| Self::map_error(e, &remote))?;
            let mut data = Vec::new();
            file.read_to_end(&mut data)
                .or_raise(|| ErrorKind::Network(format!("reading {} failed", remote.display())))?;
            Ok(data)
        })
        .await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let remote = self.remote_path(path)?;
        let data = data.to_vec();
        self.blocking(move |sftp| {
            let mut file = sftp.create(&remote).map_err(|e| Self::map_error(e, &remote))?;
            file.write_all(&data)
                .or_raise(|| ErrorKind::Network(format!("writing {} failed", remote.display())))
        })
        .await
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        let remote = self.remote_path(path)?;
        let file = self.blocking(move |sftp| sftp.open(&remote).map_err(|e| Self::map_error(e, &remote))).await?;
        Ok(Box::new(file))
    }

    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite> {
        let remote = self.remote_path(path)?;
        let file = self.blocking(move |sftp| sftp.create(&remote).map_err(|e| Self::map_error(e, &remote))).await?;
        Ok(Box::new(file))
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let remote = self.remote_path(path)?;
        self.blocking(move |sftp| sftp.unlink(&remote).map_err(|e| Self::map_error(e, &remote))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = SftpCredentials {
            host: "logs.example.com".to_string(),
            port: 2222,
            username: "reader".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("hunter2"));
        assert_eq!(credentials.address(), "reader@logs.example.com:2222");
    }

    #[tokio::test]
    async fn test_connect_refused_is_network_error() {
        // Port 1 on localhost is reserved and not expected to accept SSH.
        let credentials = SftpCredentials {
            host: "127.0.0.1".to_string(),
            port: 1,
            username: "reader".to_string(),
            password: "secret".to_string(),
        };
        let err = SftpBackend::connect("remote", credentials, "logstash").await.err().unwrap();
        assert!(err.is_connectivity());
    }
}
