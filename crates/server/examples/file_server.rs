//! Serves a directory over HTTP.
//!
//! ```text
//! cargo run --example file_server -- ./public server.toml
//! curl -v -H "Range: bytes=0-99" http://127.0.0.1:8080/index.html
//! ```

use std::sync::Arc;

use httpd_core::protocol::{HandlerError, Request, Response};
use httpd_server::{Dispatcher, Server, ServerConfig, handler_fn};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

async fn status(request: Arc<Request>, mut response: Response) -> Result<Response, HandlerError> {
    response.set_header("Content-Type", "text/plain", false)?;
    response.write(format!("serving {} for {}\r\n", request.path(), request.host().unwrap_or("-")))?;
    Ok(response)
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut args = std::env::args().skip(1);
    let root = args.next().unwrap_or_else(|| ".".to_string());
    let config = match args.next() {
        Some(path) => {
            let source = std::fs::read_to_string(&path).expect("read configuration");
            ServerConfig::from_toml_str(&source).expect("parse configuration")
        }
        None => ServerConfig { port: 8080, ..ServerConfig::default() },
    };

    let dispatcher = Dispatcher::builder()
        .path("/status", handler_fn(status))
        .directory("/", root)
        .build()
        .unwrap();
    let server = Server::builder().config(config).dispatcher(dispatcher).build().unwrap();

    match server.start().await {
        Ok(local_addr) => info!(%local_addr, "serving files"),
        Err(e) => {
            error!(cause = %e, "start server error");
            return;
        }
    }

    tokio::signal::ctrl_c().await.expect("wait for ctrl-c");
    if let Err(e) = server.stop().await {
        error!(cause = %e, "stop server error");
    }
}
