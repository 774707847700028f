use bytes::{Bytes, BytesMut};
use memchr::memmem;

/// Accumulates raw bytes and hands them out one CRLF-terminated line at a time.
///
/// Incomplete lines stay buffered until more data arrives. A scan offset remembers how far
/// the previous search got so every byte is only scanned once; when the buffer ends in a
/// lone CR the offset stays on it, since the LF may be in the next chunk.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
    scan_from: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, bytes: BytesMut) {
        if self.buf.is_empty() {
            self.buf = bytes;
        } else {
            self.buf.unsplit(bytes);
        }
    }

    /// Returns the next complete line without its CRLF, or `None` if no full line is buffered.
    pub fn read_line(&mut self) -> Option<Bytes> {
        let found = memmem::find(&self.buf[self.scan_from..], b"\r\n");

        match found {
            Some(index) => {
                let end = self.scan_from + index;
                let mut line = self.buf.split_to(end + 2);
                line.truncate(end);
                self.scan_from = 0;
                Some(line.freeze())
            }
            None => {
                self.scan_from = self.buf.len();
                if self.buf.last() == Some(&b'\r') {
                    self.scan_from -= 1;
                }
                None
            }
        }
    }

    /// Returns and discards every buffered byte.
    pub fn purge(&mut self) -> Bytes {
        self.scan_from = 0;
        self.buf.split().freeze()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_of(chunks: &[&[u8]]) -> LineBuffer {
        let mut buffer = LineBuffer::new();
        for chunk in chunks {
            buffer.append(BytesMut::from(*chunk));
        }
        buffer
    }

    #[test]
    fn reads_complete_lines() {
        let mut buffer = buffer_of(&[b"GET / HTTP/1.1\r\nHost: a\r\n\r\nrest"]);
        assert_eq!(buffer.read_line().unwrap(), "GET / HTTP/1.1");
        assert_eq!(buffer.read_line().unwrap(), "Host: a");
        assert_eq!(buffer.read_line().unwrap(), "");
        assert!(buffer.read_line().is_none());
        assert_eq!(buffer.purge(), "rest");
        assert!(buffer.is_empty());
    }

    #[test]
    fn line_split_between_cr_and_lf() {
        let mut buffer = buffer_of(&[b"abc\r"]);
        assert!(buffer.read_line().is_none());

        buffer.append(BytesMut::from(&b"\ndef"[..]));
        assert_eq!(buffer.read_line().unwrap(), "abc");
        assert!(buffer.read_line().is_none());
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn line_split_across_many_chunks() {
        let mut buffer = LineBuffer::new();
        for byte in b"hello world\r\n" {
            assert!(buffer.read_line().is_none());
            buffer.append(BytesMut::from(&[*byte][..]));
        }
        assert_eq!(buffer.read_line().unwrap(), "hello world");
    }

    #[test]
    fn bare_lf_is_not_a_line_end() {
        let mut buffer = buffer_of(&[b"a\nb\r\n"]);
        assert_eq!(buffer.read_line().unwrap(), "a\nb");
    }

    #[test]
    fn purge_resets_scan_offset() {
        let mut buffer = buffer_of(&[b"partial"]);
        assert!(buffer.read_line().is_none());
        assert_eq!(buffer.purge(), "partial");

        buffer.append(BytesMut::from(&b"x\r\n"[..]));
        assert_eq!(buffer.read_line().unwrap(), "x");
    }
}
