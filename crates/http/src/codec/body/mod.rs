//! HTTP body encoding for responses.
//!
//! Every response body is delimited by `Content-Length`, so there are only two strategies:
//!
//! - [`LengthEncoder`]: writes exactly the announced number of bytes
//! - [`PayloadEncoder`]: picks the strategy from the [`PayloadSize`](crate::protocol::PayloadSize)

mod length_encoder;
mod payload_encoder;

pub use payload_encoder::PayloadEncoder;
