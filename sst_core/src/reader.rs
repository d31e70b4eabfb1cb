use std::borrow::Cow;

use xxhash_rust::xxh3::xxh3_64;

use crate::codec::decompress;
use crate::error::{Error, Result};
use crate::format::{BlockHandle, TableFooter};
use crate::kind::CompressionKind;

/// Random-access reader over an in-memory table image.
///
/// The caller hands over the bytes (read or mapped by whatever owns the
/// file). Opening parses the footer and keeps the block index in RAM;
/// [`read_block`] then slices out and decodes only the requested block.
///
/// The reader never mutates anything after opening, so one instance can be
/// shared by any number of threads.
///
/// [`read_block`]: Self::read_block
#[derive(Debug, Clone)]
pub struct TableReader<'a> {
    blocks: &'a [u8],
    handles: Vec<BlockHandle>,
    kind: CompressionKind,
    verify_checksums: bool,
}

impl<'a> TableReader<'a> {
    /// Decompress one block given its exact compressed bytes.
    ///
    /// `kind` must be the kind the table was built with. Passing another kind
    /// is not detected beyond whatever the algorithm itself rejects.
    pub fn decompress_block(kind: CompressionKind, compressed: &[u8]) -> Result<Cow<'_, [u8]>> {
        decompress(kind, compressed)
    }

    /// Open a full table image: blocks, index, footer.
    pub fn open(table: &'a [u8]) -> Result<Self> {
        let (blocks, handles, footer) = TableFooter::parse_table(table)?;
        Ok(Self::from_parts(blocks, handles, footer.kind))
    }

    /// Wrap the output of [`TableBuilder::finish`](crate::TableBuilder::finish)
    /// together with the handles the builder recorded.
    pub fn from_parts(blocks: &'a [u8], handles: Vec<BlockHandle>, kind: CompressionKind) -> Self {
        Self {
            blocks,
            handles,
            kind,
            verify_checksums: true,
        }
    }

    /// Toggle xxh3 verification of each block before decoding (on by default).
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Decompress block `idx`.
    pub fn read_block(&self, idx: usize) -> Result<Cow<'a, [u8]>> {
        let handle = self.handles.get(idx).ok_or(Error::OutOfBounds {
            offset: idx as u64,
            len: 1,
            available: self.handles.len() as u64,
        })?;
        let compressed = self.compressed_block(handle)?;

        if self.verify_checksums {
            let actual = xxh3_64(compressed);
            if actual != handle.checksum {
                return Err(Error::ChecksumMismatch {
                    expected: handle.checksum,
                    actual,
                });
            }
        }

        let raw = decompress(self.kind, compressed)?;
        if raw.len() != handle.raw_len as usize {
            return Err(Error::LengthMismatch {
                expected: handle.raw_len as usize,
                actual: raw.len(),
            });
        }
        Ok(raw)
    }

    /// The compressed bytes `handle` points at.
    pub fn compressed_block(&self, handle: &BlockHandle) -> Result<&'a [u8]> {
        let out_of_bounds = || Error::OutOfBounds {
            offset: handle.offset,
            len: handle.compressed_len as u64,
            available: self.blocks.len() as u64,
        };
        let range = handle.range().ok_or_else(out_of_bounds)?;
        let start = usize::try_from(range.start).map_err(|_| out_of_bounds())?;
        let end = usize::try_from(range.end).map_err(|_| out_of_bounds())?;
        self.blocks.get(start..end).ok_or_else(out_of_bounds)
    }

    pub fn kind(&self) -> CompressionKind {
        self.kind
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.handles.len()
    }

    pub fn handles(&self) -> &[BlockHandle] {
        &self.handles
    }

    /// Total uncompressed size of all blocks in bytes.
    pub fn raw_size(&self) -> u64 {
        self.handles.iter().map(|h| h.raw_len as u64).sum()
    }

    /// Total compressed size of all blocks in bytes (excluding index/footer).
    pub fn compressed_size(&self) -> u64 {
        self.handles.iter().map(|h| h.compressed_len as u64).sum()
    }

    /// Compression ratio (raw / compressed).
    pub fn ratio(&self) -> f64 {
        let compressed = self.compressed_size();
        if compressed == 0 {
            return 1.0;
        }
        self.raw_size() as f64 / compressed as f64
    }
}
