//! The protocol core of an embeddable HTTP/1.0 and HTTP/1.1 server
//!
//! This crate reads requests incrementally from any async transport, hands each of them to a
//! handler and writes the handler's response back, streaming large file bodies with bounded
//! memory. Routing, error pages and the listener live in the `httpd-server` crate.
//!
//! # Features
//!
//! - Incremental request parsing, resumable at any byte boundary
//! - RFC 2616 header normalization and merging
//! - Validation of the requested `(scheme, host, port)` against a [`protocol::ServerIdentity`]
//! - Byte range resolution for partial responses
//! - Streamed file bodies with an idle timeout on slow clients
//! - One request per connection, no keep-alive
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn, Level};
//! use tracing_subscriber::FmtSubscriber;
//! use httpd_core::connection::{ConnectionConfig, HttpConnection};
//! use httpd_core::handler::{make_handler, Incoming, Reply};
//! use httpd_core::protocol::{Response, ServerIdentity};
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//!     tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
//!
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let identity = Arc::new(ServerIdentity::new());
//!     identity.initialize("127.0.0.1", 8080).expect("valid host");
//!     let config = Arc::new(ConnectionConfig::default());
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let (identity, config, handler) = (identity.clone(), config.clone(), handler.clone());
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::new(reader, writer, identity, config);
//!             match connection.process(handler).await {
//!                 Ok(()) => info!("finished process, connection shutdown"),
//!                 Err(e) => error!("service has error, cause {}, connection shutdown", e),
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(incoming: Incoming) -> Reply {
//!     let mut response = Response::new();
//!     match incoming {
//!         Incoming::Request(request) => {
//!             info!(path = request.path(), "request");
//!             response.set_header("Content-Type", "text/plain", false).unwrap();
//!             response.write("Hello World!\r\n").unwrap();
//!         }
//!         Incoming::Failed(failure) => {
//!             response.set_status(failure.status()).unwrap();
//!         }
//!     }
//!     Reply::Respond(response)
//! }
//! ```
//!
//! # Architecture
//!
//! - [`connection`]: drives one exchange over a transport
//! - [`protocol`]: requests, responses, headers, identity, ranges and errors
//! - [`codec`]: the request decoder and response encoder
//! - [`handler`]: the trait a connection dispatches to
//!
//! # Limitations
//!
//! - Request bodies must be delimited by `Content-Length`; chunked requests get a 501
//! - No TLS; `https` locations are only recorded for host validation
//! - The request head is limited to 64 KiB by default

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
