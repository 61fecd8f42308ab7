//! Compression Operations

use crate::Compression;
use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use flate2::{Compression as GzCompression, read::MultiGzDecoder, write::GzEncoder};
use std::io::{ErrorKind as IoErrorKind, Read, Write};
use tracing::instrument;

// Log archives are produced elsewhere; anything this crate compresses is a
// fixture or a re-export, so favour speed.
const GZIP_LEVEL: GzCompression = GzCompression::fast();
const COPY_BUFFER_SIZE: usize = 64 * 1024;

impl Compression {
    /// Compress a byte slice in memory.
    ///
    /// ```
    /// use logstat_compress::Compression;
    ///
    /// let data = b"{\"@timestamp\":\"2024-01-01T00:00:00Z\"}\n";
    /// let compressed = Compression::Gzip.compress(data).unwrap();
    /// assert!(Compression::Gzip.check_magic_bytes(&compressed));
    /// ```
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(input.to_vec()),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), GZIP_LEVEL);
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)
            },
        }
    }

    /// Decompress a byte slice in memory.
    ///
    /// ```rust
    /// use logstat_compress::Compression;
    ///
    /// let original = b"Hello, world!";
    /// let compressed = Compression::Gzip.compress(original).unwrap();
    /// assert_ne!(compressed, original);
    /// let decompressed = Compression::Gzip.decompress(&compressed).unwrap();
    /// assert_eq!(decompressed, original);
    /// ```
    #[instrument(skip(input), fields(format = %self, input_size = input.len()))]
    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.decompress_stream(input, &mut output)?;
        Ok(output)
    }

    /// Wrap a reader with the appropriate decompression layer.
    ///
    /// ```
    /// use std::io::{Cursor, Read};
    /// use logstat_compress::Compression;
    ///
    /// let compressed = Compression::Gzip.compress(b"line one\nline two\n").unwrap();
    /// let mut reader = Compression::Gzip.wrap_reader(Cursor::new(compressed));
    /// let mut text = String::new();
    /// reader.read_to_string(&mut text).unwrap();
    /// assert_eq!(text, "line one\nline two\n");
    /// ```
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => Box::new(reader),
            Compression::Gzip => Box::new(MultiGzDecoder::new(reader)),
        }
    }

    /// Decompress from a reader to a writer, returning bytes written.
    ///
    /// The writer is flushed before returning. Errors are classified so that
    /// callers can tell a damaged archive ([`Truncated`](ErrorKind::Truncated),
    /// [`InvalidData`](ErrorKind::InvalidData)) apart from a failing source
    /// or destination ([`Io`](ErrorKind::Io)).
    ///
    /// ```
    /// use std::io::Cursor;
    /// use logstat_compress::Compression;
    ///
    /// let original = b"Hello, world!";
    /// let compressed = Compression::Gzip.compress(original).unwrap();
    ///
    /// let mut output = Vec::new();
    /// let bytes = Compression::Gzip.decompress_stream(Cursor::new(compressed), &mut output).unwrap();
    /// assert_eq!(output, original);
    /// assert_eq!(bytes, original.len() as u64);
    /// ```
    #[instrument(skip(reader, writer), fields(format = %self, output_size))]
    pub fn decompress_stream<R: Read, W: Write>(&self, reader: R, mut writer: W) -> Result<u64> {
        let mut reader = self.wrap_reader(SourceReader(reader));
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let mut total = 0u64;
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
                Err(e) => return Err(self.read_error(e)),
            };
            writer.write_all(&buffer[..read]).or_raise(|| ErrorKind::Io)?;
            total += read as u64;
        }
        writer.flush().or_raise(|| ErrorKind::Io)?;
        tracing::Span::current().record("output_size", total);
        Ok(total)
    }

    fn read_error(&self, err: std::io::Error) -> Error {
        let from_source = err.get_ref().is_some_and(|inner| inner.is::<SourceFailed>());
        let kind = match (self, err.kind()) {
            _ if from_source => ErrorKind::Io,
            (Compression::None, _) => ErrorKind::Io,
            (Compression::Gzip, IoErrorKind::UnexpectedEof) => ErrorKind::Truncated,
            (Compression::Gzip, _) => ErrorKind::InvalidData,
        };
        exn::Exn::from(err).raise(kind)
    }
}

/// Tags errors raised by the underlying reader so they are not mistaken for
/// damage found by the decoder.
struct SourceReader<R>(R);

impl<R: Read> Read for SourceReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf).map_err(|e| match e.kind() {
            IoErrorKind::Interrupted => e,
            kind => std::io::Error::new(kind, SourceFailed(e)),
        })
    }
}

#[derive(Debug)]
struct SourceFailed(std::io::Error);

impl std::fmt::Display for SourceFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "reading source failed: {}", self.0)
    }
}

impl std::error::Error for SourceFailed {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}
