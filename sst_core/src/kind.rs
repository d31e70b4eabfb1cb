use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::format::{COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_ZSTD};

/// Block compression selected for a table.
///
/// The kind is fixed when the table is built and must be supplied again when
/// its blocks are read: compressed bytes do not identify their own algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CompressionKind {
    /// Blocks are stored verbatim.
    None = COMPRESSION_NONE,
    /// LZ4 block format. Always available.
    #[default]
    Lz4 = COMPRESSION_LZ4,
    /// Zstandard. Only available when built with the `zstd` feature.
    Zstd = COMPRESSION_ZSTD,
}

impl CompressionKind {
    pub const ALL: [CompressionKind; 3] = [
        CompressionKind::None,
        CompressionKind::Lz4,
        CompressionKind::Zstd,
    ];

    /// Stable id stored in the table footer.
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionKind::None => "none",
            CompressionKind::Lz4 => "lz4",
            CompressionKind::Zstd => "zstd",
        }
    }

    /// Whether this build can actually compress and decompress with `self`.
    pub fn is_available(self) -> bool {
        match self {
            CompressionKind::None | CompressionKind::Lz4 => true,
            CompressionKind::Zstd => cfg!(feature = "zstd"),
        }
    }
}

impl TryFrom<u8> for CompressionKind {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            COMPRESSION_NONE => Ok(CompressionKind::None),
            COMPRESSION_LZ4 => Ok(CompressionKind::Lz4),
            COMPRESSION_ZSTD => Ok(CompressionKind::Zstd),
            _ => Err(Error::UnsupportedCompressionType { id }),
        }
    }
}

impl FromStr for CompressionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "passthrough" => Ok(CompressionKind::None),
            "lz4" => Ok(CompressionKind::Lz4),
            "zstd" => Ok(CompressionKind::Zstd),
            _ => Err(Error::UnsupportedCompressionName {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
