use crate::Compression;
use std::fmt::{Display, Formatter, Result as FmtResult};

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl Compression {
    /// Suffix appended to file names in this format, with its leading dot.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => ".gz",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
        }
    }

    /// Name of the decompressed counterpart of `name`.
    ///
    /// Returns `None` when `name` doesn't carry this format's extension (or
    /// consists of nothing but the extension).
    ///
    /// ```
    /// use logstat_compress::Compression;
    ///
    /// assert_eq!(Compression::Gzip.strip_extension("site-2024-01-01.log.gz"), Some("site-2024-01-01.log"));
    /// assert_eq!(Compression::Gzip.strip_extension("site-2024-01-01.log"), None);
    /// assert_eq!(Compression::None.strip_extension("site-2024-01-01.log"), Some("site-2024-01-01.log"));
    /// ```
    #[must_use]
    pub fn strip_extension<'a>(&self, name: &'a str) -> Option<&'a str> {
        let ext = self.extension();
        if ext.is_empty() {
            return Some(name);
        }
        let split = name.len().checked_sub(ext.len())?;
        match name.get(split..) {
            Some(tail) if split > 0 && tail.eq_ignore_ascii_case(ext) => Some(&name[..split]),
            _ => None,
        }
    }

    /// Name of the compressed counterpart of `name`.
    #[must_use]
    pub fn append_extension(&self, name: &str) -> String {
        format!("{name}{}", self.extension())
    }

    /// Verify that `bytes` start with the expected magic bytes for this format.
    #[must_use]
    pub fn check_magic_bytes(&self, bytes: &[u8]) -> bool {
        Self::from_magic_bytes(bytes) == *self
    }
}
