//! HTTP codec module for decoding requests and encoding responses
//!
//! # Architecture
//!
//! - Request handling:
//!   - [`LineBuffer`]: splits raw bytes into CRLF-terminated lines across chunk boundaries
//!   - [`RequestDecoder`]: incremental state machine producing one [`Request`](crate::protocol::Request)
//!
//! - Response handling:
//!   - [`ResponseEncoder`]: encodes a response head followed by its payload
//!   - Header encoding via the `header` module
//!   - Payload encoding via the `body` module
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bytes::BytesMut;
//! use httpd_core::codec::RequestDecoder;
//! use httpd_core::protocol::ServerIdentity;
//! use tokio_util::codec::Decoder;
//!
//! let identity = Arc::new(ServerIdentity::new());
//! identity.initialize("127.0.0.1", 8080).unwrap();
//!
//! let mut decoder = RequestDecoder::new(identity);
//! let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\n"[..]);
//! assert!(decoder.decode(&mut buffer).unwrap().is_none());
//!
//! let mut buffer = BytesMut::from(&b"Host: 127.0.0.1:8080\r\n\r\n"[..]);
//! assert!(decoder.decode(&mut buffer).unwrap().is_some());
//! ```

mod body;
mod header;
mod line_buffer;
mod request_decoder;
mod response_encoder;

pub use line_buffer::LineBuffer;
pub use request_decoder::{DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_HEAD_SIZE, RequestDecoder};
pub use response_encoder::ResponseEncoder;
