use std::borrow::Cow;

use super::Codec;
use crate::error::{Error, Result};
use crate::format::DEFAULT_ZSTD_LEVEL;
use crate::kind::CompressionKind;

/// Zstandard block codec.
///
/// Each block is an independent zstd frame. Built only with the `zstd`
/// feature; otherwise every call fails with [`Error::Unsupported`], so a
/// table that asks for zstd never silently gets another algorithm.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    /// Compression level (1 = fast / larger, 22 = slow / smallest).
    pub level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self {
            level: DEFAULT_ZSTD_LEVEL,
        }
    }
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

#[cfg(feature = "zstd")]
impl Codec for ZstdCodec {
    fn kind(&self) -> CompressionKind {
        CompressionKind::Zstd
    }

    fn compress_block<'a>(&self, raw: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        let compressed = zstd::bulk::compress(raw, self.level).map_err(|e| Error::Encode {
            kind: CompressionKind::Zstd,
            message: e.to_string(),
        })?;
        Ok(Cow::Owned(compressed))
    }

    fn decompress_block<'a>(&self, compressed: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        // Frames written by `bulk::compress` carry their content size, so the
        // streaming decoder needs no capacity hint.
        let raw = zstd::decode_all(compressed)
            .map_err(|e| Error::decode(CompressionKind::Zstd, e))?;
        Ok(Cow::Owned(raw))
    }
}

#[cfg(not(feature = "zstd"))]
impl Codec for ZstdCodec {
    fn kind(&self) -> CompressionKind {
        CompressionKind::Zstd
    }

    fn compress_block<'a>(&self, _raw: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Err(Error::Unsupported {
            kind: CompressionKind::Zstd,
        })
    }

    fn decompress_block<'a>(&self, _compressed: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Err(Error::Unsupported {
            kind: CompressionKind::Zstd,
        })
    }
}
