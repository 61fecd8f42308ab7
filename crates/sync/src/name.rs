//! Dated log file names.
//!
//! Rotated logs are named `<prefix>-YYYY-MM-DD.log`, and archived as
//! `<prefix>-YYYY-MM-DD.log.gz` on the remote store.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use logstat_compress::Compression;
use regex::Regex;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::LazyLock;
use time::Date;
use time::format_description::FormatItem;
use time::macros::format_description;

static LOG_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<prefix>.+)-(?P<date>\d{4}-\d{2}-\d{2})\.log(?P<ext>\.gz)?$").unwrap()
});

pub(crate) const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// A parsed `<prefix>-YYYY-MM-DD.log[.gz]` file name.
///
/// ```
/// use logstat_compress::Compression;
/// use logstat_sync::LogFileName;
/// use time::macros::date;
///
/// let name: LogFileName = "catalog-api-2024-01-02.log.gz".parse().unwrap();
/// assert_eq!(name.prefix, "catalog-api");
/// assert_eq!(name.date, date!(2024 - 01 - 02));
/// assert_eq!(name.compression, Compression::Gzip);
/// assert_eq!(name.log_name(), "catalog-api-2024-01-02.log");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogFileName {
    pub prefix: String,
    pub date: Date,
    pub compression: Compression,
}

impl LogFileName {
    /// Name of the decompressed log.
    pub fn log_name(&self) -> String {
        format!("{}-{}.log", self.prefix, self.date_str())
    }

    /// Name of the gzip archive this log is (or was) shipped as.
    pub fn archive_name(&self) -> String {
        Compression::Gzip.append_extension(&self.log_name())
    }

    fn date_str(&self) -> String {
        // Four-digit years are guaranteed by parsing, so formatting can't fail.
        self.date.format(DATE_FORMAT).unwrap_or_default()
    }
}

impl FromStr for LogFileName {
    type Err = crate::error::Error;

    fn from_str(name: &str) -> Result<Self> {
        let captures = LOG_FILE_NAME.captures(name).ok_or_else(|| exn::Exn::from(ErrorKind::InvalidFileName(name.to_string())))?;
        let date = Date::parse(&captures["date"], DATE_FORMAT).or_raise(|| ErrorKind::InvalidFileName(name.to_string()))?;
        let compression = match captures.name("ext") {
            Some(_) => Compression::Gzip,
            None => Compression::None,
        };
        Ok(Self {
            prefix: captures["prefix"].to_string(),
            date,
            compression,
        })
    }
}

impl Display for LogFileName {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.compression {
            Compression::None => f.write_str(&self.log_name()),
            Compression::Gzip => f.write_str(&self.archive_name()),
        }
    }
}
