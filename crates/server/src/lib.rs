//! An embeddable HTTP/1.0 and HTTP/1.1 server built on `httpd-core`
//!
//! Requests are routed by exact path or longest path prefix to [`RequestHandler`]s. Failures
//! are answered with error pages that fall back from the exact status code to its hundred
//! class and then to a 500. Directories can be served with range and conditional request
//! support.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use httpd_core::protocol::{HandlerError, Request, Response};
//! use httpd_server::{Dispatcher, Server, ServerConfig, handler_fn};
//!
//! async fn hello(request: Arc<Request>, mut response: Response) -> Result<Response, HandlerError> {
//!     response.set_header("Content-Type", "text/plain", false)?;
//!     response.write(format!("hello from {}\r\n", request.path()))?;
//!     Ok(response)
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let dispatcher = Dispatcher::builder()
//!         .path("/hello", handler_fn(hello))
//!         .directory("/", "./public")
//!         .build()
//!         .unwrap();
//!
//!     let config = ServerConfig { port: 8080, ..ServerConfig::default() };
//!     let server = Server::builder().config(config).dispatcher(dispatcher).build().unwrap();
//!
//!     server.start().await.unwrap();
//!     tokio::signal::ctrl_c().await.unwrap();
//!     server.stop().await.unwrap();
//! }
//! ```

mod config;
mod dispatcher;
pub mod file;
mod handler;
mod server;
mod shutdown;

pub use config::{ConfigError, ServerConfig};
pub use dispatcher::{Dispatcher, DispatcherBuilder, RegistrationError};
pub use handler::{FnHandler, RequestHandler, handler_fn};
pub use server::{Server, ServerBuildError, ServerBuilder, ServerError};
pub use shutdown::ShutdownSignal;
