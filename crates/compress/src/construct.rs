use crate::Compression;
use std::path::Path;

impl Compression {
    /// Format implied by a file name: `*.gz` is gzip, anything else is
    /// read as-is.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let gzip = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
        if gzip { Compression::Gzip } else { Compression::None }
    }

    /// Format implied by the leading bytes of a stream. Anything too short
    /// or unrecognised is taken to be uncompressed.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        match bytes {
            [0x1F, 0x8B, ..] => Compression::Gzip,
            _ => Compression::None,
        }
    }
}
