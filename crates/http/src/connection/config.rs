use std::time::Duration;

use crate::codec::{DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_HEAD_SIZE};

/// Tunables of a single connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Value of the `Server` header sent with every response.
    pub server_name: String,
    /// Initial capacity of the read buffer.
    pub read_buffer_capacity: usize,
    /// Upper bound of the request line plus headers; larger requests are rejected with a 400.
    pub max_head_size: usize,
    /// Upper bound of a request body; larger `Content-Length`s are rejected with a 413.
    pub max_body_size: u64,
    /// File slices up to this size are read whole and written at once, larger ones are streamed.
    pub stream_threshold: u64,
    /// Size of each unit a streamed file slice is written in.
    pub stream_unit: usize,
    /// How long the client may take to send its request or accept a unit of response data.
    pub idle_timeout: Duration,
    pub dump_request_head: bool,
    pub dump_request_body: bool,
    pub dump_response_head: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server_name: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            read_buffer_capacity: 8 * 1024,
            max_head_size: DEFAULT_MAX_HEAD_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            stream_threshold: 1024 * 1024,
            stream_unit: 64 * 1024,
            idle_timeout: Duration::from_secs(30),
            dump_request_head: false,
            dump_request_body: false,
            dump_response_head: false,
        }
    }
}
