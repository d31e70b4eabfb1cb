//! Block path of a sorted-table storage engine.
//!
//! Raw blocks go through a pluggable [`Codec`] selected by a
//! [`CompressionKind`], land in a [`PagedBuffer`] that never moves bytes it
//! has already stored, and come back out through [`TableReader`].
//!
//! Zstandard support is the default `zstd` feature. The tests that check
//! every zstd call fails with [`Error::Unsupported`] only build without it:
//!
//! ```text
//! cargo test -p sst_core
//! cargo test -p sst_core --no-default-features
//! ```

pub mod buffer;
pub mod builder;
pub mod codec;
pub mod error;
pub mod format;
pub mod kind;
pub mod options;
pub mod reader;

pub use buffer::PagedBuffer;
pub use builder::TableBuilder;
pub use codec::{codec_by_id, codec_for, compress, decompress, Codec, CodecOptions};
pub use error::{Error, Result};
pub use format::{BlockHandle, TableFooter};
pub use kind::CompressionKind;
pub use options::TableOptions;
pub use reader::TableReader;
