//! Date-based selection of archives to fetch.

use crate::error::{ErrorKind, Result};
use crate::name::LogFileName;
use logstat_compress::Compression;
use time::Date;

/// The most recent date already held locally.
///
/// Recomputed from the local listing on every run; nothing is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Watermark(pub Date);

impl Default for Watermark {
    fn default() -> Self {
        Self(Date::MIN)
    }
}

impl Watermark {
    /// Maximum date among local `*.log` files.
    ///
    /// Names that don't follow the log naming pattern are logged and ignored,
    /// as are archives. With nothing to go on the watermark is [`Date::MIN`].
    pub fn from_local<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names
            .into_iter()
            .filter_map(|name| match name.parse::<LogFileName>() {
                Ok(parsed) if parsed.compression == Compression::None => Some(parsed.date),
                Ok(_) => None,
                Err(_) => {
                    tracing::debug!(file = name, "Ignoring local file that is not a dated log");
                    None
                },
            })
            .max()
            .map(Self)
            .unwrap_or_default()
    }
}

/// Archives split by whether they should be fetched on this run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Selection {
    /// Dated strictly after the watermark and strictly before today.
    pub selected: Vec<LogFileName>,
    /// Dated today; the remote may still be appending to them.
    pub today: Vec<LogFileName>,
    /// At or before the watermark, or in the future.
    pub excluded: Vec<LogFileName>,
}

/// Keep archives whose date `d` satisfies `watermark < d < today`.
///
/// Every name must be a gzip archive following the log naming pattern;
/// anything else fails the whole selection with
/// [`InvalidFileName`](ErrorKind::InvalidFileName).
pub fn select<'a>(names: impl IntoIterator<Item = &'a str>, watermark: Watermark, today: Date) -> Result<Selection> {
    let mut selection = Selection::default();
    for name in names {
        let parsed: LogFileName = name.parse()?;
        if parsed.compression != Compression::Gzip {
            exn::bail!(ErrorKind::InvalidFileName(name.to_string()));
        }
        if parsed.date == today {
            tracing::info!(file = name, "Passing current date log");
            selection.today.push(parsed);
        } else if parsed.date <= watermark.0 || parsed.date > today {
            tracing::debug!(file = name, watermark = %watermark.0, "Outside of sync window");
            selection.excluded.push(parsed);
        } else {
            selection.selected.push(parsed);
        }
    }
    Ok(selection)
}
