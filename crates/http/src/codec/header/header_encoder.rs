//! HTTP header encoder implementation for serializing HTTP response headers
//!
//! This module writes the status line and header block of a response. Before writing it
//! fills in the headers the server always sends:
//!
//! - `Server`, always overwritten with the configured server name
//! - `Date`, unless the handler set one
//! - `Content-Length`, always overwritten with the size of the body actually sent

use std::io;
use std::io::Write;
use std::time::SystemTime;

use bytes::{BufMut, BytesMut};
use http::HeaderValue;
use http::header::{CONTENT_LENGTH, DATE, SERVER};
use tokio_util::codec::Encoder;
use tracing::warn;

use crate::protocol::{PayloadSize, ResponseHead, SendError};

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for HTTP response headers implementing the [`Encoder`] trait.
#[derive(Debug, Clone)]
pub struct HeaderEncoder {
    server_name: HeaderValue,
}

impl HeaderEncoder {
    pub fn new(server_name: &str) -> Self {
        let server_name = HeaderValue::from_str(server_name).unwrap_or_else(|e| {
            warn!(cause = %e, server_name, "invalid server name, falling back to the crate name");
            HeaderValue::from_static(env!("CARGO_PKG_NAME"))
        });
        Self { server_name }
    }
}

impl Encoder<(ResponseHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (head, payload_size) = item;
        let mut headers = head.headers.into_map();

        headers.insert(SERVER, self.server_name.clone());
        if !headers.contains_key(DATE) {
            let date = httpdate::fmt_http_date(SystemTime::now());
            let date = HeaderValue::from_str(&date).map_err(|e| SendError::io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
            headers.insert(DATE, date);
        }
        headers.insert(CONTENT_LENGTH, payload_size.len().into());

        dst.reserve(INIT_HEADER_SIZE);
        write!(FastWrite(dst), "HTTP/{} {:03} {}\r\n", head.version, head.status, head.reason)?;

        // Write all headers
        for (header_name, header_value) in &headers {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Fast writer implementation for writing to BytesMut.
///
/// Avoids bounds checks when writing into the buffer, since enough space was reserved.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{HttpHeaders, HttpVersion};

    fn encode(head: ResponseHead, payload_size: PayloadSize) -> String {
        let mut dst = BytesMut::new();
        HeaderEncoder::new("test-server").encode((head, payload_size), &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    fn head(status: u16, reason: &str) -> ResponseHead {
        ResponseHead { version: HttpVersion::HTTP_11, status, reason: reason.to_string(), headers: HttpHeaders::new() }
    }

    #[test]
    fn writes_status_line_and_injected_headers() {
        let mut head = head(200, "OK");
        head.headers.set_header("Content-Type", "text/plain", false).unwrap();
        head.headers.set_header("Server", "spoofed", false).unwrap();

        let encoded = encode(head, PayloadSize::Length(12));
        assert!(encoded.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(encoded.contains("content-type: text/plain\r\n"));
        assert!(encoded.contains("server: test-server\r\n"));
        assert!(!encoded.contains("spoofed"));
        assert!(encoded.contains("content-length: 12\r\n"));
        assert!(encoded.contains("date: "));
        assert!(encoded.ends_with("\r\n\r\n"));
    }

    #[test]
    fn content_length_reflects_payload() {
        let mut head = head(304, "Not Modified");
        head.headers.set_header("Content-Length", "9999", false).unwrap();

        let encoded = encode(head, PayloadSize::Empty);
        assert!(encoded.starts_with("HTTP/1.1 304 Not Modified\r\n"));
        assert!(encoded.contains("content-length: 0\r\n"));
        assert!(!encoded.contains("9999"));
    }

    #[test]
    fn keeps_handler_date_and_pads_status() {
        let mut head = head(7, "Odd");
        head.version = HttpVersion::HTTP_10;
        head.headers.set_header("Date", "Sun, 06 Nov 1994 08:49:37 GMT", false).unwrap();

        let encoded = encode(head, PayloadSize::Empty);
        assert!(encoded.starts_with("HTTP/1.0 007 Odd\r\n"));
        assert!(encoded.contains("date: Sun, 06 Nov 1994 08:49:37 GMT\r\n"));
    }
}
