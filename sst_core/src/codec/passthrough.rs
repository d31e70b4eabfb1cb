use std::borrow::Cow;

use super::Codec;
use crate::error::Result;
use crate::kind::CompressionKind;

/// No-op codec: blocks are stored verbatim.
///
/// Useful for data that is already compressed, and for checking the table
/// layout independently of any algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughCodec;

impl Codec for PassThroughCodec {
    fn kind(&self) -> CompressionKind {
        CompressionKind::None
    }

    fn compress_block<'a>(&self, raw: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Borrowed(raw))
    }

    fn decompress_block<'a>(&self, compressed: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Borrowed(compressed))
    }
}
