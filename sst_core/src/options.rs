use crate::codec::CodecOptions;
use crate::format::DEFAULT_PAGE_SIZE;
use crate::kind::CompressionKind;

/// Settings fixed for the lifetime of one table build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    pub compression: CompressionKind,
    /// Size of each page in the build buffer.
    pub page_size: usize,
    pub codec: CodecOptions,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            compression: CompressionKind::default(),
            page_size: DEFAULT_PAGE_SIZE,
            codec: CodecOptions::default(),
        }
    }
}

impl TableOptions {
    pub fn with_compression(mut self, compression: CompressionKind) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_zstd_level(mut self, level: i32) -> Self {
        self.codec.zstd_level = level;
        self
    }
}
