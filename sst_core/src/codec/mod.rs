//! Block compression codecs.
//!
//! A [`Codec`] turns one raw block into its compressed bytes and back. Blocks
//! are always compressed independently, so any block of a table can be read
//! without touching its neighbours. Codecs hold only immutable settings and
//! are shared freely between reader threads.

mod lz4_codec;
mod passthrough;
mod zstd_codec;

use std::borrow::Cow;
use std::sync::Arc;

pub use self::lz4_codec::Lz4Codec;
pub use self::passthrough::PassThroughCodec;
pub use self::zstd_codec::ZstdCodec;

use crate::error::Result;
use crate::format::DEFAULT_ZSTD_LEVEL;
use crate::kind::CompressionKind;

/// Core compression abstraction.
///
/// Implementations must be pure functions of their input: no cross-block
/// state, no interior mutability.
pub trait Codec: Send + Sync {
    /// The compression kind recorded for tables built with this codec.
    fn kind(&self) -> CompressionKind;

    /// Human-readable codec name for CLI display.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Compress a single block. Codecs that store blocks verbatim borrow the
    /// input instead of copying it.
    fn compress_block<'a>(&self, raw: &'a [u8]) -> Result<Cow<'a, [u8]>>;

    /// Decompress a single block produced by [`compress_block`](Self::compress_block)
    /// of a codec of the same kind.
    fn decompress_block<'a>(&self, compressed: &'a [u8]) -> Result<Cow<'a, [u8]>>;
}

/// Tunables shared by every codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecOptions {
    /// Zstandard level (1 = fast, 22 = smallest). Ignored by other codecs.
    pub zstd_level: i32,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            zstd_level: DEFAULT_ZSTD_LEVEL,
        }
    }
}

/// Resolve the codec for `kind`.
///
/// Always succeeds: a kind that is compiled out still gets a codec, and that
/// codec reports [`Error::Unsupported`](crate::Error::Unsupported) on use.
pub fn codec_for(kind: CompressionKind, options: &CodecOptions) -> Arc<dyn Codec> {
    match kind {
        CompressionKind::None => Arc::new(PassThroughCodec),
        CompressionKind::Lz4 => Arc::new(Lz4Codec),
        CompressionKind::Zstd => Arc::new(ZstdCodec::new(options.zstd_level)),
    }
}

/// Resolve a codec from the compression id stored in table metadata.
pub fn codec_by_id(id: u8, options: &CodecOptions) -> Result<Arc<dyn Codec>> {
    let kind = CompressionKind::try_from(id)?;
    Ok(codec_for(kind, options))
}

/// Compress one block with the default settings for `kind`.
pub fn compress(kind: CompressionKind, raw: &[u8]) -> Result<Cow<'_, [u8]>> {
    match kind {
        CompressionKind::None => PassThroughCodec.compress_block(raw),
        CompressionKind::Lz4 => Lz4Codec.compress_block(raw),
        CompressionKind::Zstd => ZstdCodec::default().compress_block(raw),
    }
}

/// Inverse of [`compress`].
pub fn decompress(kind: CompressionKind, data: &[u8]) -> Result<Cow<'_, [u8]>> {
    match kind {
        CompressionKind::None => PassThroughCodec.decompress_block(data),
        CompressionKind::Lz4 => Lz4Codec.decompress_block(data),
        CompressionKind::Zstd => ZstdCodec::default().decompress_block(data),
    }
}

/// [`compress`] keyed by a raw compression id, as read from configuration.
pub fn compress_by_id(id: u8, raw: &[u8]) -> Result<Cow<'_, [u8]>> {
    compress(CompressionKind::try_from(id)?, raw)
}

/// [`decompress`] keyed by a raw compression id, as read from table metadata.
pub fn decompress_by_id(id: u8, data: &[u8]) -> Result<Cow<'_, [u8]>> {
    decompress(CompressionKind::try_from(id)?, data)
}
