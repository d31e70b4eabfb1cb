use crate::error::{Error, Result};
use crate::kind::CompressionKind;

/// Default raw bytes per block handed to the builder by the CLI: 4 KB.
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024;

/// Default page size for the build buffer: 1 MB.
pub const DEFAULT_PAGE_SIZE: usize = 1 << 20;

/// Default Zstandard level.
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

// ── Compression ids ────────────────────────────────────────────────────────

pub const COMPRESSION_NONE: u8 = 0;
pub const COMPRESSION_LZ4: u8 = 1;
pub const COMPRESSION_ZSTD: u8 = 2;

// ── Table layout ───────────────────────────────────────────────────────────
//
// [BLOCK 0] ... [BLOCK N-1]
// [INDEX: BLOCK_HANDLE_SIZE × N]
// [FOOTER: FOOTER_SIZE]

/// Magic bytes closing every table file.
pub const MAGIC: &[u8; 8] = b"PSST\x00\x00\x00\x01";

/// Size of each encoded BlockHandle.
///   offset:u64 + compressed_len:u32 + raw_len:u32 + checksum:u64 = 24
pub const BLOCK_HANDLE_SIZE: usize = 24;

/// Size of the table footer.
///   index_offset:u64 + block_count:u64 + kind:u8 + pad[7] + magic[8] = 32
pub const FOOTER_SIZE: usize = 32;

// ── Block handle ───────────────────────────────────────────────────────────

/// Placement of one compressed block inside the built byte stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockHandle {
    /// Offset of the compressed block from the start of the stream.
    pub offset: u64,
    pub compressed_len: u32,
    /// Length of the block before compression.
    pub raw_len: u32,
    /// xxhash3-64 of the compressed bytes.
    pub checksum: u64,
}

impl BlockHandle {
    /// Byte range of the compressed block, or `None` if a corrupt handle
    /// points past `u64::MAX`.
    pub fn range(&self) -> Option<std::ops::Range<u64>> {
        let end = self.offset.checked_add(self.compressed_len as u64)?;
        Some(self.offset..end)
    }

    pub fn to_bytes(&self) -> [u8; BLOCK_HANDLE_SIZE] {
        let mut buf = [0u8; BLOCK_HANDLE_SIZE];
        buf[0..8].copy_from_slice(&self.offset.to_le_bytes());
        buf[8..12].copy_from_slice(&self.compressed_len.to_le_bytes());
        buf[12..16].copy_from_slice(&self.raw_len.to_le_bytes());
        buf[16..24].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; BLOCK_HANDLE_SIZE]) -> Self {
        let mut u64_at = [0u8; 8];
        let mut u32_at = [0u8; 4];

        u64_at.copy_from_slice(&buf[0..8]);
        let offset = u64::from_le_bytes(u64_at);
        u32_at.copy_from_slice(&buf[8..12]);
        let compressed_len = u32::from_le_bytes(u32_at);
        u32_at.copy_from_slice(&buf[12..16]);
        let raw_len = u32::from_le_bytes(u32_at);
        u64_at.copy_from_slice(&buf[16..24]);
        let checksum = u64::from_le_bytes(u64_at);

        Self {
            offset,
            compressed_len,
            raw_len,
            checksum,
        }
    }
}

/// Encode the block index written between the last block and the footer.
pub fn encode_index(handles: &[BlockHandle]) -> Vec<u8> {
    let mut out = Vec::with_capacity(handles.len() * BLOCK_HANDLE_SIZE);
    for handle in handles {
        out.extend_from_slice(&handle.to_bytes());
    }
    out
}

/// Decode `count` handles from an index region.
pub fn decode_index(buf: &[u8], count: usize) -> Result<Vec<BlockHandle>> {
    let expected = count
        .checked_mul(BLOCK_HANDLE_SIZE)
        .ok_or_else(|| Error::corrupt(format!("block count {count} overflows index size")))?;
    if buf.len() != expected {
        return Err(Error::corrupt(format!(
            "index is {} bytes, expected {} for {} blocks",
            buf.len(),
            expected,
            count
        )));
    }
    let mut entry = [0u8; BLOCK_HANDLE_SIZE];
    Ok(buf
        .chunks_exact(BLOCK_HANDLE_SIZE)
        .map(|chunk| {
            entry.copy_from_slice(chunk);
            BlockHandle::from_bytes(&entry)
        })
        .collect())
}

// ── Footer ─────────────────────────────────────────────────────────────────

/// Decoded table footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFooter {
    pub index_offset: u64,
    pub block_count: u64,
    pub kind: CompressionKind,
}

impl TableFooter {
    pub fn to_bytes(&self) -> [u8; FOOTER_SIZE] {
        let mut buf = [0u8; FOOTER_SIZE];
        buf[0..8].copy_from_slice(&self.index_offset.to_le_bytes());
        buf[8..16].copy_from_slice(&self.block_count.to_le_bytes());
        buf[16] = self.kind.id();
        // buf[17..24] padding stays zero
        buf[24..32].copy_from_slice(MAGIC);
        buf
    }

    /// Decode a footer, checking the magic and the compression id.
    pub fn from_bytes(buf: &[u8; FOOTER_SIZE]) -> Result<Self> {
        if &buf[24..32] != MAGIC {
            return Err(Error::corrupt("bad footer magic, not a table file"));
        }
        let mut word = [0u8; 8];
        word.copy_from_slice(&buf[0..8]);
        let index_offset = u64::from_le_bytes(word);
        word.copy_from_slice(&buf[8..16]);
        let block_count = u64::from_le_bytes(word);
        let kind = CompressionKind::try_from(buf[16])?;
        Ok(Self {
            index_offset,
            block_count,
            kind,
        })
    }

    /// Split a whole table image into its block region, its handles, and the
    /// footer.
    pub fn parse_table(table: &[u8]) -> Result<(&[u8], Vec<BlockHandle>, TableFooter)> {
        if table.len() < FOOTER_SIZE {
            return Err(Error::corrupt(format!(
                "table is {} bytes, shorter than its footer",
                table.len()
            )));
        }
        let split = table.len() - FOOTER_SIZE;
        let mut footer_buf = [0u8; FOOTER_SIZE];
        footer_buf.copy_from_slice(&table[split..]);
        let footer = TableFooter::from_bytes(&footer_buf)?;

        let index_offset = usize::try_from(footer.index_offset)
            .map_err(|_| Error::corrupt("index offset does not fit in memory"))?;
        if index_offset > split {
            return Err(Error::corrupt(format!(
                "index offset {} past footer at {}",
                index_offset, split
            )));
        }
        let count = usize::try_from(footer.block_count)
            .map_err(|_| Error::corrupt("block count does not fit in memory"))?;
        let handles = decode_index(&table[index_offset..split], count)?;
        for (i, handle) in handles.iter().enumerate() {
            match handle.range() {
                Some(range) if range.end <= footer.index_offset => {}
                _ => {
                    return Err(Error::corrupt(format!(
                        "block {} at {}+{} runs past the block region ({} bytes)",
                        i, handle.offset, handle.compressed_len, footer.index_offset
                    )))
                }
            }
        }
        Ok((&table[..index_offset], handles, footer))
    }
}
