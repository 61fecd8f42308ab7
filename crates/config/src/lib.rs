//! Configuration for logstat.
//!
//! Values are layered with [`figment`]: built-in defaults, then a TOML file,
//! then `LOGSTAT_`-prefixed environment variables (with `__` separating
//! nested keys, so `LOGSTAT_REMOTE__PASSWORD` sets `remote.password`).
//!
//! ```toml
//! [remote]
//! host = "logs.example.com"
//! username = "reader"
//! password = "secret"
//! directory = "logstash"
//!
//! [local]
//! directory = "/var/lib/logstat/logstash"
//!
//! [index]
//! url = "http://localhost:9200"
//! name = "logstat"
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "LOGSTAT_";
pub const CONFIG_FILE_NAME: &str = "logstat.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub local: LocalConfig,
    pub index: IndexConfig,
    pub reports: ReportsConfig,
}

/// The SFTP log store that archives are pulled from.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Directory on the remote host holding `*.log.gz` archives.
    pub directory: PathBuf,
}
impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 22,
            username: None,
            password: None,
            directory: PathBuf::from("logstash"),
        }
    }
}
impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("directory", &self.directory)
            .finish()
    }
}
impl RemoteConfig {
    /// Host, username and password, or an error naming the first one missing.
    pub fn require_credentials(&self) -> Result<(&str, &str, &str)> {
        let host = self.host.as_deref().filter(|s| !s.is_empty());
        let username = self.username.as_deref().filter(|s| !s.is_empty());
        let password = self.password.as_deref();
        match (host, username, password) {
            (None, _, _) => exn::bail!(ErrorKind::InvalidValue { field: "remote.host", reason: "required for sync" }),
            (_, None, _) => exn::bail!(ErrorKind::InvalidValue {
                field: "remote.username",
                reason: "required for sync"
            }),
            (_, _, None) => exn::bail!(ErrorKind::InvalidValue {
                field: "remote.password",
                reason: "required for sync"
            }),
            (Some(host), Some(username), Some(password)) => Ok((host, username, password)),
        }
    }
}

/// The local directory decompressed `*.log` files are kept in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub directory: PathBuf,
}
impl Default for LocalConfig {
    fn default() -> Self {
        Self { directory: PathBuf::from("data/logstash") }
    }
}

/// The search-and-analytics index the reports query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub url: String,
    pub name: String,
    pub timeout_secs: u64,
    /// Hits fetched per page when paginating search results.
    pub page_size: u32,
    /// Bucket limit for terms aggregations.
    pub max_buckets: u32,
    /// Bucket limit for the most-frequent-queries report.
    pub frequent_queries_size: u32,
    /// Rows kept in the query-time report.
    pub slowest_queries: usize,
}
impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            name: "logstat".to_string(),
            timeout_secs: 120,
            page_size: 1000,
            max_buckets: 1_000_000,
            frequent_queries_size: 10_000,
            slowest_queries: 50,
        }
    }
}

/// Where index reports are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    pub directory: PathBuf,
}
impl Default for ReportsConfig {
    fn default() -> Self {
        Self { directory: PathBuf::from("data/logstash") }
    }
}

impl Config {
    /// Platform configuration file (e.g. `~/.config/logstat/logstat.toml`).
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "logstat").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Layered sources: defaults, TOML file, environment.
    ///
    /// An explicit `file` must exist; the platform default is only merged if
    /// present.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match file {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::FileNotFound(path.to_path_buf()));
                }
                figment = figment.merge(Toml::file(path));
            },
            None => {
                if let Some(path) = Self::default_path().filter(|p| p.is_file()) {
                    tracing::debug!(path = %path.display(), "Using platform configuration file");
                    figment = figment.merge(Toml::file(path));
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate configuration from every source.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(file)?)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Invalid)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.remote.port == 0 {
            exn::bail!(ErrorKind::InvalidValue { field: "remote.port", reason: "must be non-zero" });
        }
        if self.index.page_size == 0 {
            exn::bail!(ErrorKind::InvalidValue { field: "index.page_size", reason: "must be non-zero" });
        }
        if self.index.max_buckets == 0 {
            exn::bail!(ErrorKind::InvalidValue { field: "index.max_buckets", reason: "must be non-zero" });
        }
        if self.index.name.is_empty() {
            exn::bail!(ErrorKind::InvalidValue { field: "index.name", reason: "must not be empty" });
        }
        Ok(())
    }
}
