//! HTTP header processing module
//!
//! Requests are parsed line by line by the [`RequestDecoder`](crate::codec::RequestDecoder),
//! so this module only holds the response side:
//!
//! - [`HeaderEncoder`]: writes the status line and header block
//!   - Injects `Server`, `Date` and `Content-Length`
//!   - Serializes header fields in insertion order

mod header_encoder;

pub use header_encoder::HeaderEncoder;
