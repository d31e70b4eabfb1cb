use thiserror::Error;

use crate::kind::CompressionKind;

/// Result type alias for table build/read operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the block path.
///
/// Nothing in this crate retries or logs an error before returning it; the
/// caller owns the policy (abort the flush, fall back to `None`, report).
#[derive(Error, Debug)]
pub enum Error {
    /// A compression id read from configuration or table metadata that is not
    /// one of the known kinds.
    #[error("unsupported compression type id {id}")]
    UnsupportedCompressionType { id: u8 },

    #[error("unsupported compression type '{name}' (expected none, lz4 or zstd)")]
    UnsupportedCompressionName { name: String },

    /// A known algorithm that was not compiled into this build.
    #[error("compression algorithm {kind} not supported on this platform")]
    Unsupported { kind: CompressionKind },

    #[error("failed to allocate a {requested}-byte page")]
    AllocationFailure { requested: usize },

    #[error("{kind} compression failed: {message}")]
    Encode {
        kind: CompressionKind,
        message: String,
    },

    #[error("{kind} decompression failed: {message}")]
    Decode {
        kind: CompressionKind,
        message: String,
    },

    #[error("write after finalize")]
    Finalized,

    /// An earlier write into the build buffer failed part way through.
    #[error("table build aborted by an earlier write failure")]
    BuildAborted,

    #[error("block of {len} bytes exceeds the 4 GiB block limit")]
    BlockTooLarge { len: usize },

    #[error("block checksum mismatch: expected {expected:016x}, got {actual:016x}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    #[error("block decompressed to {actual} bytes but handle says {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("range {offset}+{len} out of bounds for {available} bytes")]
    OutOfBounds {
        offset: u64,
        len: u64,
        available: u64,
    },

    #[error("corrupt table: {message}")]
    Corrupt { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for configuration errors naming a compression type that does not
    /// exist at all, as opposed to one that exists but is compiled out.
    pub fn is_unsupported_type(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedCompressionType { .. } | Error::UnsupportedCompressionName { .. }
        )
    }

    pub(crate) fn decode(kind: CompressionKind, err: impl std::fmt::Display) -> Self {
        Error::Decode {
            kind,
            message: err.to_string(),
        }
    }

    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Error::Corrupt {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_type_is_distinct_from_unsupported() {
        assert!(Error::UnsupportedCompressionType { id: 9 }.is_unsupported_type());
        assert!(Error::UnsupportedCompressionName {
            name: "brotli".into()
        }
        .is_unsupported_type());
        assert!(!Error::Unsupported {
            kind: CompressionKind::Zstd
        }
        .is_unsupported_type());
    }

    #[test]
    fn messages_name_the_kind() {
        let err = Error::Unsupported {
            kind: CompressionKind::Zstd,
        };
        assert_eq!(
            err.to_string(),
            "compression algorithm zstd not supported on this platform"
        );
    }
}
