use std::borrow::Cow;

use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use super::Codec;
use crate::error::{Error, Result};
use crate::kind::CompressionKind;

/// LZ4 block codec.
///
/// The raw length is prepended as a little-endian u32 so a block decodes
/// without outside size information. Fastest of the bundled codecs and
/// available on every target, which makes it the default for new tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

impl Codec for Lz4Codec {
    fn kind(&self) -> CompressionKind {
        CompressionKind::Lz4
    }

    fn compress_block<'a>(&self, raw: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Owned(compress_prepend_size(raw)))
    }

    fn decompress_block<'a>(&self, compressed: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        let raw = decompress_size_prepended(compressed)
            .map_err(|e| Error::decode(CompressionKind::Lz4, e))?;
        Ok(Cow::Owned(raw))
    }
}
