use std::io::Write;
use std::sync::Arc;

use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_64;

use crate::buffer::PagedBuffer;
use crate::codec::{codec_for, Codec};
use crate::error::{Error, Result};
use crate::format::{encode_index, BlockHandle, TableFooter, BLOCK_HANDLE_SIZE, FOOTER_SIZE};
use crate::kind::CompressionKind;
use crate::options::TableOptions;

/// Accumulates compressed blocks for one table.
///
/// # Build contract
/// Call [`add_block`] once per raw block, in the order the blocks should
/// appear in the table. Each block is compressed on its own and appended to a
/// [`PagedBuffer`], and its placement is recorded as a [`BlockHandle`]. Call
/// [`finish`] (or [`write_table`]) exactly once to take the bytes; the builder
/// rejects every call after that.
///
/// A single builder has one writer. If a page allocation fails the build is
/// lost: every later call returns [`Error::BuildAborted`].
///
/// [`add_block`]: Self::add_block
/// [`finish`]: Self::finish
/// [`write_table`]: Self::write_table
pub struct TableBuilder {
    codec: Arc<dyn Codec>,
    buf: PagedBuffer,
    handles: Vec<BlockHandle>,
    raw_size: u64,
    finished: bool,
    aborted: bool,
}

impl TableBuilder {
    pub fn new(options: &TableOptions) -> Self {
        Self::with_codec(codec_for(options.compression, &options.codec), options.page_size)
    }

    /// Build with an already resolved codec.
    pub fn with_codec(codec: Arc<dyn Codec>, page_size: usize) -> Self {
        Self {
            codec,
            buf: PagedBuffer::new(page_size),
            handles: Vec::new(),
            raw_size: 0,
            finished: false,
            aborted: false,
        }
    }

    /// Compress `raw` and append it to the table.
    ///
    /// Compression errors are returned as is and leave the buffer untouched.
    pub fn add_block(&mut self, raw: &[u8]) -> Result<BlockHandle> {
        self.check_open()?;

        let compressed = self.codec.compress_block(raw)?;
        let compressed_len = u32::try_from(compressed.len()).map_err(|_| Error::BlockTooLarge {
            len: compressed.len(),
        })?;
        let raw_len =
            u32::try_from(raw.len()).map_err(|_| Error::BlockTooLarge { len: raw.len() })?;

        let handle = BlockHandle {
            offset: self.buf.len() as u64,
            compressed_len,
            raw_len,
            checksum: xxh3_64(&compressed),
        };
        if let Err(err) = self.buf.write(&compressed) {
            self.aborted = true;
            return Err(err);
        }

        self.raw_size += raw_len as u64;
        self.handles.push(handle);
        debug!(
            block = self.handles.len() - 1,
            offset = handle.offset,
            raw_len,
            compressed_len,
            "added block"
        );
        Ok(handle)
    }

    /// Seal the builder and return the concatenated compressed blocks.
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        self.check_open()?;
        self.finished = true;
        let bytes = self.buf.finalize()?;
        info!(
            codec = self.codec.name(),
            blocks = self.handles.len(),
            raw_size = self.raw_size,
            compressed_size = bytes.len(),
            "finished table"
        );
        Ok(bytes)
    }

    /// Seal the builder and stream a complete table into `sink`:
    /// the blocks page by page, then the block index, then the footer.
    pub fn write_table<W: Write>(&mut self, sink: &mut W) -> Result<TableFooter> {
        self.check_open()?;
        self.finished = true;
        self.buf.seal()?;

        self.buf.write_to(sink)?;
        sink.write_all(&encode_index(&self.handles))?;
        let footer = TableFooter {
            index_offset: self.buf.len() as u64,
            block_count: self.handles.len() as u64,
            kind: self.codec.kind(),
        };
        sink.write_all(&footer.to_bytes())?;
        sink.flush()?;

        info!(
            codec = self.codec.name(),
            blocks = footer.block_count,
            raw_size = self.raw_size,
            compressed_size = footer.index_offset,
            "wrote table"
        );
        Ok(footer)
    }

    fn check_open(&self) -> Result<()> {
        if self.aborted {
            return Err(Error::BuildAborted);
        }
        if self.finished {
            return Err(Error::Finalized);
        }
        Ok(())
    }

    /// Placement of every block added so far, in table order.
    pub fn handles(&self) -> &[BlockHandle] {
        &self.handles
    }

    pub fn kind(&self) -> CompressionKind {
        self.codec.kind()
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.handles.len()
    }

    /// Total uncompressed bytes added.
    pub fn raw_size(&self) -> u64 {
        self.raw_size
    }

    /// Compressed bytes buffered so far.
    pub fn compressed_size(&self) -> u64 {
        self.buf.len() as u64
    }

    /// Size of the table if it were written now, index and footer included.
    pub fn estimated_size(&self) -> u64 {
        self.compressed_size() + (self.handles.len() * BLOCK_HANDLE_SIZE + FOOTER_SIZE) as u64
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decompress;

    fn blocks() -> Vec<Vec<u8>> {
        vec![
            b"alpha alpha alpha alpha".to_vec(),
            Vec::new(),
            b"bravo".repeat(100),
            b"charlie".to_vec(),
        ]
    }

    #[test]
    fn handles_locate_each_block() {
        let opts = TableOptions::default()
            .with_compression(CompressionKind::Lz4)
            .with_page_size(16);
        let mut builder = TableBuilder::new(&opts);
        for block in blocks() {
            builder.add_block(&block).unwrap();
        }
        let handles = builder.handles().to_vec();
        let bytes = builder.finish().unwrap();

        let mut expected_offset = 0;
        for (handle, raw) in handles.iter().zip(blocks()) {
            assert_eq!(handle.offset, expected_offset);
            expected_offset += handle.compressed_len as u64;
            let range = handle.range().unwrap();
            let packed = &bytes[range.start as usize..range.end as usize];
            assert_eq!(xxh3_64(packed), handle.checksum);
            assert_eq!(handle.raw_len as usize, raw.len());
            assert_eq!(decompress(CompressionKind::Lz4, packed).unwrap().as_ref(), raw.as_slice());
        }
        assert_eq!(expected_offset, bytes.len() as u64);
    }

    #[test]
    fn none_builder_output_is_plain_concatenation() {
        let opts = TableOptions::default()
            .with_compression(CompressionKind::None)
            .with_page_size(5);
        let mut builder = TableBuilder::new(&opts);
        for block in blocks() {
            builder.add_block(&block).unwrap();
        }
        assert_eq!(builder.raw_size(), builder.compressed_size());
        assert_eq!(builder.finish().unwrap(), blocks().concat());
    }

    #[test]
    fn calls_after_finish_are_rejected() {
        let mut builder = TableBuilder::new(&TableOptions::default());
        builder.add_block(b"only").unwrap();
        builder.finish().unwrap();
        assert!(builder.is_finished());
        assert!(matches!(builder.add_block(b"late"), Err(Error::Finalized)));
        assert!(matches!(builder.finish(), Err(Error::Finalized)));
        let mut sink = Vec::new();
        assert!(matches!(builder.write_table(&mut sink), Err(Error::Finalized)));
        assert_eq!(builder.block_count(), 1);
    }

    #[test]
    fn failed_page_allocation_aborts_the_build() {
        let opts = TableOptions::default()
            .with_compression(CompressionKind::None)
            .with_page_size(usize::MAX);
        let mut builder = TableBuilder::new(&opts);
        assert!(matches!(
            builder.add_block(b"never fits"),
            Err(Error::AllocationFailure {
                requested: usize::MAX
            })
        ));
        assert!(matches!(builder.add_block(b"x"), Err(Error::BuildAborted)));
        assert!(matches!(builder.finish(), Err(Error::BuildAborted)));
        let mut sink = Vec::new();
        assert!(matches!(builder.write_table(&mut sink), Err(Error::BuildAborted)));
        assert!(sink.is_empty());
        assert_eq!(builder.block_count(), 0);
    }

    #[test]
    fn write_table_appends_index_and_footer() {
        let opts = TableOptions::default().with_page_size(8);
        let mut builder = TableBuilder::new(&opts);
        for block in blocks() {
            builder.add_block(&block).unwrap();
        }
        let estimate = builder.estimated_size();
        let mut sink = Vec::new();
        let footer = builder.write_table(&mut sink).unwrap();

        assert_eq!(sink.len() as u64, estimate);
        assert_eq!(footer.block_count, 4);
        assert_eq!(footer.kind, CompressionKind::Lz4);
        let (region, handles, parsed) = TableFooter::parse_table(&sink).unwrap();
        assert_eq!(parsed, footer);
        assert_eq!(handles.as_slice(), builder.handles());
        assert_eq!(region.len() as u64, builder.compressed_size());
        assert!(matches!(builder.add_block(b"x"), Err(Error::Finalized)));
    }

    #[cfg(not(feature = "zstd"))]
    #[test]
    fn unsupported_codec_error_propagates_without_writing() {
        let opts = TableOptions::default().with_compression(CompressionKind::Zstd);
        let mut builder = TableBuilder::new(&opts);
        assert!(matches!(
            builder.add_block(b"data"),
            Err(Error::Unsupported {
                kind: CompressionKind::Zstd
            })
        ));
        assert_eq!(builder.block_count(), 0);
        assert_eq!(builder.compressed_size(), 0);
    }
}
