use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use httpd_core::connection::{ConnectionConfig, HttpConnection};
use httpd_core::protocol::{IdentityError, ServerIdentity};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("dispatcher must be set")]
    MissingDispatcher,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("server is already running")]
    AlreadyStarted,

    #[error("server is not running")]
    NotRunning,

    #[error("invalid listen host: {source}")]
    Identity {
        #[from]
        source: IdentityError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

pub struct ServerBuilder {
    config: ServerConfig,
    dispatcher: Option<Dispatcher>,
    identity: Option<Arc<ServerIdentity>>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { config: ServerConfig::default(), dispatcher: None, identity: None }
    }

    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Shares an existing identity, for example one with extra locations already registered.
    #[must_use]
    pub fn identity(mut self, identity: Arc<ServerIdentity>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let dispatcher = self.dispatcher.ok_or(ServerBuildError::MissingDispatcher)?;
        let connection_config = Arc::new(self.config.connection_config());
        Ok(Server {
            inner: Arc::new(Inner {
                config: self.config,
                connection_config,
                dispatcher: Arc::new(dispatcher),
                identity: self.identity.unwrap_or_default(),
                running: Mutex::new(None),
            }),
        })
    }
}

/// A TCP listener answering each connection with one response.
///
/// The server can be started and stopped repeatedly. It also stops by itself, once the
/// response in flight is delivered, after a failure it can not recover from: an I/O error
/// while reading a request, a handler failing with [`httpd_core::protocol::HandlerError::Fatal`]
/// or a panicking connection.
#[derive(Clone)]
pub struct Server {
    inner: Arc<Inner>,
}

struct Inner {
    config: ServerConfig,
    connection_config: Arc<ConnectionConfig>,
    dispatcher: Arc<Dispatcher>,
    identity: Arc<ServerIdentity>,
    running: Mutex<Option<Running>>,
}

struct Running {
    local_addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// The locations requests are accepted for.
    pub fn identity(&self) -> &Arc<ServerIdentity> {
        &self.inner.identity
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Binds the listener and starts accepting connections in the background.
    ///
    /// Returns the bound address, which tells the port picked when the configured one is 0.
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        let mut running = self.inner.running.lock().await;
        if running.as_ref().is_some_and(|running| !running.task.is_finished()) {
            return Err(ServerError::AlreadyStarted);
        }

        let host = self.inner.config.host.as_str();
        let listener = TcpListener::bind((host, self.inner.config.port)).await?;
        let local_addr = listener.local_addr()?;
        self.inner.identity.initialize(host, local_addr.port())?;

        self.inner.dispatcher.shutdown_signal().reset();
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(Arc::clone(&self.inner).serve(listener, stopped));

        info!(%local_addr, "start listening");
        *running = Some(Running { local_addr, stop, task });
        Ok(local_addr)
    }

    /// Stops accepting connections and drops the open ones, responses in flight included.
    pub async fn stop(&self) -> Result<(), ServerError> {
        let running = self.inner.running.lock().await.take().ok_or(ServerError::NotRunning)?;

        // the accept loop may have ended by itself already
        let _ = running.stop.send(());
        if let Err(e) = running.task.await {
            error!(cause = %e, "accept loop failed");
        }
        info!(local_addr = %running.local_addr, "server stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.inner.running.lock().await.as_ref().is_some_and(|running| !running.task.is_finished())
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.running.lock().await.as_ref().map(|running| running.local_addr)
    }
}

impl Inner {
    async fn serve(self: Arc<Self>, listener: TcpListener, mut stopped: oneshot::Receiver<()>) {
        let shutdown = self.dispatcher.shutdown_signal().clone();
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = &mut stopped => {
                    debug!(connections = connections.len(), "stop requested, dropping open connections");
                    connections.abort_all();
                    break;
                }

                Some(joined) = connections.join_next() => {
                    if let Err(e) = joined {
                        error!(cause = %e, "connection task failed");
                        shutdown.request();
                    }
                    if shutdown.is_requested() {
                        warn!("shutting down after a fatal error");
                        break;
                    }
                }

                accepted = listener.accept() => match accepted {
                    Ok((tcp_stream, remote_addr)) => {
                        connections.spawn(Arc::clone(&self).process(tcp_stream, remote_addr));
                    }
                    Err(e) => warn!(cause = %e, "failed to accept"),
                },
            }
        }

        drop(listener);
        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined
                && !e.is_cancelled()
            {
                error!(cause = %e, "connection task failed");
            }
        }
        self.identity.teardown();
    }

    async fn process(self: Arc<Self>, tcp_stream: TcpStream, remote_addr: SocketAddr) {
        let (reader, writer) = tcp_stream.into_split();
        let connection =
            HttpConnection::new(reader, writer, Arc::clone(&self.identity), Arc::clone(&self.connection_config));

        match connection.process(Arc::clone(&self.dispatcher)).await {
            Ok(()) => debug!(%remote_addr, "finished process, connection shutdown"),
            Err(e) => warn!(%remote_addr, cause = %e, "connection failed"),
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.inner.config)
            .field("dispatcher", &self.inner.dispatcher)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder").field("config", &self.config).field("dispatcher", &self.dispatcher).finish()
    }
}
