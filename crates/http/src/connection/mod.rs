//! HTTP connection handling module
//!
//! # Components
//!
//! - [`HttpConnection`]: reads one request, dispatches it to a handler and writes the reply
//! - [`ResponseWriter`]: serializes a response, streaming large file bodies under an idle timeout
//! - [`ConnectionConfig`]: buffer sizes, limits, timeouts and diagnostic dumps

mod config;
mod http_connection;
mod response_writer;

pub use config::ConnectionConfig;
pub use http_connection::HttpConnection;
pub use response_writer::ResponseWriter;
