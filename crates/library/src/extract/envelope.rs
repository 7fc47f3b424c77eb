//! Compression envelope around the tarball.

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::{self, Chain, Cursor, Read};
#[cfg(feature = "xz")]
use xz2::read::XzDecoder;
#[cfg(feature = "zstd")]
use zstd::stream::read::Decoder as ZstdDecoder;

const BZIP2_MAGIC: [u8; 3] = [0x42, 0x5A, 0x68];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
#[cfg(feature = "xz")]
const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
#[cfg(feature = "zstd")]
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Enough to tell every supported envelope apart.
pub(crate) const MAGIC_LEN: usize = 6;

/// How the tarball is compressed. Detected from magic bytes, never from a
/// file name: the source has no name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Envelope {
    /// A bare tarball.
    #[default]
    None,
    Bzip2,
    Gzip,
    #[cfg(feature = "xz")]
    Xz,
    #[cfg(feature = "zstd")]
    Zstd,
}

impl Envelope {
    /// Unknown magic is treated as a bare tarball; the tar reader will
    /// reject it if it isn't one.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(&BZIP2_MAGIC) {
            return Self::Bzip2;
        }
        if bytes.starts_with(&GZIP_MAGIC) {
            return Self::Gzip;
        }
        #[cfg(feature = "xz")]
        if bytes.starts_with(&XZ_MAGIC) {
            return Self::Xz;
        }
        #[cfg(feature = "zstd")]
        if bytes.starts_with(&ZSTD_MAGIC) {
            return Self::Zstd;
        }
        Self::None
    }

    /// Wrap a reader of enveloped bytes with the matching decoder.
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Self::None => Box::new(reader),
            Self::Bzip2 => Box::new(BzDecoder::new(reader)),
            Self::Gzip => Box::new(GzDecoder::new(reader)),
            #[cfg(feature = "xz")]
            Self::Xz => Box::new(XzDecoder::new(reader)),
            #[cfg(feature = "zstd")]
            Self::Zstd => Box::new(ZstdDecoder::new(reader)?),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bzip2 => "bzip2",
            Self::Gzip => "gzip",
            #[cfg(feature = "xz")]
            Self::Xz => "xz",
            #[cfg(feature = "zstd")]
            Self::Zstd => "zstd",
        }
    }
}

impl Display for Envelope {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Reads the first few bytes of a stream without losing them.
pub(crate) struct Sniffer<R> {
    inner: R,
    head: Vec<u8>,
}

impl<R: Read> Sniffer<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, head: Vec::new() }
    }

    /// Buffer up to `limit` bytes. Shorter only if the stream ends first.
    pub fn peek(&mut self, limit: usize) -> io::Result<&[u8]> {
        if self.head.len() < limit {
            let needed = (limit - self.head.len()) as u64;
            (&mut self.inner).take(needed).read_to_end(&mut self.head)?;
        }
        Ok(&self.head[..self.head.len().min(limit)])
    }

    /// Replay the buffered head, then continue with the rest of the stream.
    pub fn into_reader(self) -> Chain<Cursor<Vec<u8>>, R> {
        Cursor::new(self.head).chain(self.inner)
    }
}

/// Detect the envelope of `reader` and return a reader of the tarball inside.
pub(crate) fn open<'a, R: Read + 'a>(reader: R) -> io::Result<(Envelope, Box<dyn Read + 'a>)> {
    let mut sniffer = Sniffer::new(reader);
    let envelope = Envelope::from_magic_bytes(sniffer.peek(MAGIC_LEN)?);
    let decoder = envelope.wrap_reader(sniffer.into_reader())?;
    Ok((envelope, decoder))
}
