use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, warn};

use crate::codec::RequestDecoder;
use crate::connection::{ConnectionConfig, ResponseWriter};
use crate::handler::{Handler, Incoming, Reply, RequestFailure};
use crate::protocol::{ConnectionError, Request, ServerIdentity};
use crate::utils::latin1;

/// A single HTTP exchange over one transport.
///
/// The connection reads exactly one request, hands it (or the reason it could not be read)
/// to the [`Handler`], writes the reply and closes. There is no keep-alive.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
#[derive(Debug)]
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    writer: ResponseWriter<W>,
    config: Arc<ConnectionConfig>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, identity: Arc<ServerIdentity>, config: Arc<ConnectionConfig>) -> Self {
        let decoder = RequestDecoder::new(identity)
            .with_max_head_size(config.max_head_size)
            .with_max_body_size(config.max_body_size);
        Self {
            framed_read: FramedRead::with_capacity(reader, decoder, config.read_buffer_capacity),
            writer: ResponseWriter::new(writer, Arc::clone(&config)),
            config,
        }
    }

    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), ConnectionError>
    where
        H: Handler + ?Sized,
    {
        let idle_timeout = self.config.idle_timeout;
        let Ok(read) = tokio::time::timeout(idle_timeout, self.framed_read.next()).await else {
            info!(?idle_timeout, "no request received in time, closing connection");
            self.writer.close().await?;
            return Ok(());
        };

        let incoming = match read {
            Some(Ok(request)) => {
                self.dump_request(&request);
                Incoming::Request(request)
            }

            Some(Err(e)) => {
                if e.is_fatal() {
                    error!(cause = %e, "failed to read request");
                } else {
                    info!(cause = %e, status = %e.status(), "rejecting malformed request");
                }
                let request = self.framed_read.decoder_mut().take_partial();
                Incoming::Failed(RequestFailure::new(e, request))
            }

            None => {
                info!("cant read more request, break this connection down");
                return Ok(());
            }
        };

        let trailing = self.framed_read.decoder().trailing_bytes() + self.framed_read.read_buffer().len();
        if trailing > 0 {
            warn!(size = trailing, "discarding data received after the request");
        }

        match handler.call(incoming).await {
            Reply::Respond(mut response) => {
                self.writer.send(&mut response).await?;
                self.writer.close().await?;
            }
            Reply::Abort => {
                warn!("no response could be produced, closing connection");
                self.writer.close().await?;
            }
        }
        Ok(())
    }

    fn dump_request(&self, request: &Request) {
        if self.config.dump_request_head {
            debug!(
                method = %request.method(),
                target = request.target(),
                version = %request.version(),
                headers = ?request.headers(),
                "request head"
            );
        }
        if self.config.dump_request_body && !request.body().is_empty() {
            debug!(size = request.body().len(), body = %latin1(request.body()), "request body");
        }
    }
}
