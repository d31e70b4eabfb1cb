use std::borrow::Cow;
use std::fmt;
use std::io;

use tracing::trace;

use crate::error::{Error, Result};

/// Append-only byte buffer built from fixed-size pages.
///
/// A page is reserved at full capacity when it is first needed and is only
/// ever filled up to that capacity, so its heap storage is never reallocated.
/// Bytes that have been written stay at the same address for the lifetime of
/// the buffer, unlike a `Vec<u8>` that copies everything on each doubling.
///
/// Every page except the last is exactly `page_size` bytes long.
pub struct PagedBuffer {
    page_size: usize,
    pages: Vec<Vec<u8>>,
    len: usize,
    finalized: bool,
}

impl PagedBuffer {
    /// Create an empty buffer. No page is allocated until the first write.
    ///
    /// # Panics
    /// If `page_size` is zero.
    pub fn new(page_size: usize) -> Self {
        assert!(page_size > 0, "PagedBuffer page size must be positive");
        Self {
            page_size,
            pages: Vec::new(),
            len: 0,
            finalized: false,
        }
    }

    /// Append `data` to the end of the buffer, spilling into as many new pages
    /// as it takes.
    ///
    /// Fails with [`Error::AllocationFailure`] if a page cannot be reserved and
    /// with [`Error::Finalized`] after [`finalize`](Self::finalize). Bytes copied
    /// before an allocation failure stay in the buffer.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.finalized {
            return Err(Error::Finalized);
        }
        self.append(data)
    }

    fn append(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let full = self
                .pages
                .last()
                .map_or(true, |page| page.len() == self.page_size);
            if full {
                let page = alloc_page(self.page_size)?;
                self.pages.push(page);
                trace!(pages = self.pages.len(), page_size = self.page_size, "allocated page");
            }

            let last = self.pages.len() - 1;
            let page = &mut self.pages[last];
            let n = (self.page_size - page.len()).min(data.len());

            let base = page.as_ptr();
            page.extend_from_slice(&data[..n]);
            debug_assert_eq!(base, page.as_ptr(), "page storage moved");

            data = &data[n..];
            self.len += n;
        }
        Ok(())
    }

    /// Everything written so far, in write order.
    ///
    /// Borrows the page directly when the content fits in a single page and
    /// concatenates otherwise.
    pub fn bytes(&self) -> Cow<'_, [u8]> {
        match self.pages.as_slice() {
            [] => Cow::Borrowed(&[]),
            [page] => Cow::Borrowed(page.as_slice()),
            pages => {
                let mut out = Vec::with_capacity(self.len);
                for page in pages {
                    out.extend_from_slice(page);
                }
                Cow::Owned(out)
            }
        }
    }

    /// Terminal read: returns the full content and rejects further writes.
    pub fn finalize(&mut self) -> Result<Vec<u8>> {
        self.seal()?;
        Ok(self.bytes().into_owned())
    }

    /// Reject further writes without copying anything out. Pages stay
    /// readable through [`pages`](Self::pages) and [`bytes`](Self::bytes).
    pub fn seal(&mut self) -> Result<()> {
        if self.finalized {
            return Err(Error::Finalized);
        }
        self.finalized = true;
        Ok(())
    }

    /// The `len` bytes starting at `offset`, or `None` if the range runs past
    /// the end. Borrowed when the range lies inside one page.
    pub fn slice(&self, offset: usize, len: usize) -> Option<Cow<'_, [u8]>> {
        let end = offset.checked_add(len)?;
        if end > self.len {
            return None;
        }
        if len == 0 {
            return Some(Cow::Borrowed(&[]));
        }

        let first = offset / self.page_size;
        let last = (end - 1) / self.page_size;
        let start_in_page = offset % self.page_size;

        if first == last {
            let page = &self.pages[first];
            return Some(Cow::Borrowed(&page[start_in_page..start_in_page + len]));
        }

        let mut out = Vec::with_capacity(len);
        out.extend_from_slice(&self.pages[first][start_in_page..]);
        for page in &self.pages[first + 1..last] {
            out.extend_from_slice(page);
        }
        let end_in_last = end - last * self.page_size;
        out.extend_from_slice(&self.pages[last][..end_in_last]);
        Some(Cow::Owned(out))
    }

    /// Filled pages in write order.
    pub fn pages(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.pages.iter().map(Vec::as_slice)
    }

    /// Stream every page into `sink` without building a contiguous copy.
    pub fn write_to<W: io::Write>(&self, sink: &mut W) -> io::Result<()> {
        for page in self.pages() {
            sink.write_all(page)?;
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

fn alloc_page(page_size: usize) -> Result<Vec<u8>> {
    let mut page = Vec::new();
    page.try_reserve_exact(page_size)
        .map_err(|_| Error::AllocationFailure { requested: page_size })?;
    Ok(page)
}

impl io::Write for PagedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.finalized {
            return Err(io::Error::new(io::ErrorKind::Other, Error::Finalized));
        }
        self.append(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Debug for PagedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedBuffer")
            .field("page_size", &self.page_size)
            .field("pages", &self.pages.len())
            .field("len", &self.len)
            .field("finalized", &self.finalized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_four_writes_straddle_five_byte_pages() {
        let mut buf = PagedBuffer::new(5);
        let mut expected = Vec::new();
        for i in 0..4 {
            let chunk = format!("{:4}", i).into_bytes();
            expected.extend_from_slice(&chunk);
            buf.write(&chunk).unwrap();
        }
        assert_eq!(buf.bytes().as_ref(), expected.as_slice());
        assert_eq!(buf.len(), 16);
        assert_eq!(buf.page_count(), 4);
        let sizes: Vec<usize> = buf.pages().map(<[u8]>::len).collect();
        assert_eq!(sizes, vec![5, 5, 5, 1]);
    }

    #[test]
    fn empty_buffer_allocates_nothing() {
        let mut buf = PagedBuffer::new(8);
        buf.write(&[]).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.page_count(), 0);
        assert!(buf.bytes().is_empty());
    }

    #[test]
    fn one_write_spanning_many_pages() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut buf = PagedBuffer::new(7);
        buf.write(&data[..3]).unwrap();
        buf.write(&data[3..]).unwrap();
        assert_eq!(buf.bytes().as_ref(), data.as_slice());
        assert_eq!(buf.page_count(), (1000 + 6) / 7);
    }

    #[test]
    fn earlier_pages_never_move() {
        let mut buf = PagedBuffer::new(16);
        buf.write(b"first page bytes").unwrap();
        let first = buf.pages().next().unwrap().as_ptr();
        for _ in 0..100 {
            buf.write(b"more data that keeps spilling over").unwrap();
        }
        assert_eq!(buf.pages().next().unwrap().as_ptr(), first);
        assert_eq!(&buf.bytes()[..16], b"first page bytes");
    }

    #[test]
    fn single_page_bytes_are_borrowed() {
        let mut buf = PagedBuffer::new(64);
        buf.write(b"abc").unwrap();
        assert!(matches!(buf.bytes(), Cow::Borrowed(b"abc")));
        buf.write(&[b'x'; 64]).unwrap();
        assert!(matches!(buf.bytes(), Cow::Owned(_)));
    }

    #[test]
    fn bytes_is_repeatable_and_sees_later_writes() {
        let mut buf = PagedBuffer::new(3);
        buf.write(b"hello").unwrap();
        assert_eq!(buf.bytes(), buf.bytes());
        buf.write(b" world").unwrap();
        assert_eq!(buf.bytes().as_ref(), b"hello world");
    }

    #[test]
    fn slice_within_and_across_pages() {
        let mut buf = PagedBuffer::new(4);
        buf.write(b"0123456789").unwrap();
        assert!(matches!(buf.slice(4, 3), Some(Cow::Borrowed(b"456"))));
        assert_eq!(buf.slice(2, 7).unwrap().as_ref(), b"2345678");
        assert_eq!(buf.slice(0, 10).unwrap().as_ref(), b"0123456789");
        assert_eq!(buf.slice(10, 0).unwrap().as_ref(), b"");
        assert!(buf.slice(8, 3).is_none());
        assert!(buf.slice(usize::MAX, 2).is_none());
    }

    #[test]
    fn write_after_finalize_is_rejected() {
        let mut buf = PagedBuffer::new(4);
        buf.write(b"abcdef").unwrap();
        assert_eq!(buf.finalize().unwrap(), b"abcdef");
        assert!(matches!(buf.write(b"g"), Err(Error::Finalized)));
        assert!(matches!(buf.finalize(), Err(Error::Finalized)));
        assert_eq!(buf.bytes().as_ref(), b"abcdef");
    }

    #[test]
    fn io_write_and_write_to() {
        use std::io::Write;

        let mut buf = PagedBuffer::new(5);
        write!(buf, "{}-{}", "paged", 42).unwrap();
        buf.flush().unwrap();

        let mut sink = Vec::new();
        buf.write_to(&mut sink).unwrap();
        assert_eq!(sink, b"paged-42");

        buf.finalize().unwrap();
        let err = Write::write(&mut buf, b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn unreservable_page_reports_allocation_failure() {
        let mut buf = PagedBuffer::new(usize::MAX);
        assert!(matches!(
            buf.write(b"x"),
            Err(Error::AllocationFailure {
                requested: usize::MAX
            })
        ));
        assert!(buf.is_empty());
        assert_eq!(buf.page_count(), 0);
    }

    #[test]
    #[should_panic(expected = "page size must be positive")]
    fn zero_page_size_panics() {
        let _ = PagedBuffer::new(0);
    }
}
