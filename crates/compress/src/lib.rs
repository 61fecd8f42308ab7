//! Compression detection and decompression for log archives.
//!
//! Log stores rotate their files into gzip archives (`site-2024-01-01.log.gz`)
//! which are pulled down and inflated next to the plain `*.log` files. This
//! crate wraps that behind a small [`Compression`] enum, providing:
//!
//! - **Format detection** from file names ([`Compression::from_path`]) or
//!   magic bytes ([`Compression::from_magic_bytes`])
//! - **Suffix handling** to map archive names onto their decompressed names
//!   ([`Compression::strip_extension`], [`Compression::append_extension`])
//! - **In-memory** compression/decompression ([`Compression::compress`],
//!   [`Compression::decompress`])
//! - **Streaming** decompression that tells a truncated archive apart from
//!   garbage input and from a failing writer
//!   ([`Compression::decompress_stream`])
//!
//! Multi-member gzip streams (concatenated archives) are decoded in full.

mod construct;
pub mod error;
mod ops;
mod util;

/// A supported compression format. Defaults to [`None`](Self::None)
/// (uncompressed).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// Gzip compression (.gz)
    Gzip,
}

#[cfg(test)]
mod tests {
    use crate::Compression;

    #[test]
    fn compression_default() {
        assert_eq!(Compression::default(), Compression::None);
    }
}
