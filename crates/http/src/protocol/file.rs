use std::fmt;
use std::fmt::{Debug, Formatter};
use std::io;
use std::io::SeekFrom;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::protocol::RangedSlice;

/// Random access to the bytes of a resource served as a response body.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Reads up to `len` bytes starting at `offset`.
    ///
    /// Returning fewer bytes than asked for is allowed; an empty result means the resource
    /// ends before `offset`.
    async fn read_chunk(&mut self, offset: u64, len: usize) -> io::Result<Bytes>;
}

#[async_trait]
impl FileSource for Bytes {
    async fn read_chunk(&mut self, offset: u64, len: usize) -> io::Result<Bytes> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(self.len());
        let end = start.saturating_add(len).min(self.len());
        Ok(self.slice(start..end))
    }
}

#[async_trait]
impl FileSource for tokio::fs::File {
    async fn read_chunk(&mut self, offset: u64, len: usize) -> io::Result<Bytes> {
        self.seek(SeekFrom::Start(offset)).await?;

        let mut buf = BytesMut::with_capacity(len);
        while buf.len() < len {
            // read_buf appends at most the spare capacity
            if self.read_buf(&mut buf).await? == 0 {
                break;
            }
        }
        Ok(buf.freeze())
    }
}

/// A slice of a [`FileSource`] queued as a response body.
pub struct FileBody {
    source: Box<dyn FileSource>,
    slice: RangedSlice,
}

impl FileBody {
    pub fn new(source: Box<dyn FileSource>, slice: RangedSlice) -> Self {
        Self { source, slice }
    }

    #[inline]
    pub fn slice(&self) -> &RangedSlice {
        &self.slice
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.slice.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slice.is_empty()
    }

    pub(crate) fn source_mut(&mut self) -> &mut dyn FileSource {
        self.source.as_mut()
    }
}

impl Debug for FileBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileBody").field("slice", &self.slice).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn bytes_source_clamps() {
        let mut source = Bytes::from_static(b"0123456789");
        assert_eq!(source.read_chunk(2, 3).await.unwrap(), Bytes::from_static(b"234"));
        assert_eq!(source.read_chunk(8, 10).await.unwrap(), Bytes::from_static(b"89"));
        assert!(source.read_chunk(20, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_source_reads_at_offset() {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(b"hello, world").unwrap();

        let mut file = tokio::fs::File::open(temp.path()).await.unwrap();
        assert_eq!(file.read_chunk(7, 5).await.unwrap(), Bytes::from_static(b"world"));
        assert_eq!(file.read_chunk(0, 5).await.unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(file.read_chunk(10, 100).await.unwrap(), Bytes::from_static(b"ld"));
    }
}
