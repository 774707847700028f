use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;
use tracing::{debug, trace};

use crate::codec::ResponseEncoder;
use crate::connection::ConnectionConfig;
use crate::protocol::{
    FileBody, FileSource, Message, PayloadItem, PayloadSize, Response, ResponseBody, ResponseHead, SendError,
};

type ResponseMessage = Message<(ResponseHead, PayloadSize), Bytes>;

/// Writes [`Response`]s to the transport.
///
/// In-memory bodies and file slices up to the stream threshold go out in one write. Larger
/// file slices are read and written one unit at a time, waiting for the transport to accept
/// each unit before reading the next, so memory use stays bounded by the unit size.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    framed_write: FramedWrite<W, ResponseEncoder>,
    config: Arc<ConnectionConfig>,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn new(writer: W, config: Arc<ConnectionConfig>) -> Self {
        let encoder = ResponseEncoder::new(&config.server_name);
        Self { framed_write: FramedWrite::new(writer, encoder), config }
    }

    pub fn get_ref(&self) -> &W {
        self.framed_write.get_ref()
    }

    /// Sends the response, freezing it.
    ///
    /// The response is marked ended even if writing fails; a response can only be sent once.
    pub async fn send(&mut self, response: &mut Response) -> Result<(), SendError> {
        let (head, body) = response.commit()?;
        let result = self.write_response(head, body).await;
        response.end();
        result
    }

    /// Flushes and shuts down the transport, giving up after the idle timeout.
    pub async fn close(&mut self) -> Result<(), SendError> {
        let idle_timeout = self.config.idle_timeout;
        with_idle_timeout(idle_timeout, SinkExt::<ResponseMessage>::close(&mut self.framed_write)).await
    }

    /// Queues one message; guarded because the sink flushes once its buffer fills up.
    async fn feed(&mut self, message: ResponseMessage) -> Result<(), SendError> {
        let idle_timeout = self.config.idle_timeout;
        with_idle_timeout(idle_timeout, self.framed_write.feed(message)).await
    }

    async fn write_response(&mut self, head: ResponseHead, body: ResponseBody) -> Result<(), SendError> {
        let idle_timeout = self.config.idle_timeout;
        if self.config.dump_response_head {
            debug!(version = %head.version, status = head.status, reason = %head.reason, headers = ?head.headers, "response head");
        }

        let payload_size = PayloadSize::of(body.len());
        self.feed(ResponseMessage::Header((head, payload_size))).await?;

        match body {
            ResponseBody::Empty => {}
            ResponseBody::Buffer(bytes) => {
                self.feed(ResponseMessage::Payload(PayloadItem::Chunk(bytes.freeze()))).await?;
            }
            ResponseBody::File(mut file) => self.write_file(&mut file).await?,
        }

        self.feed(ResponseMessage::Payload(PayloadItem::Eof)).await?;
        with_idle_timeout(idle_timeout, SinkExt::<ResponseMessage>::flush(&mut self.framed_write)).await
    }

    async fn write_file(&mut self, file: &mut FileBody) -> Result<(), SendError> {
        let idle_timeout = self.config.idle_timeout;
        let slice = *file.slice();
        let source = file.source_mut();

        if slice.len() <= self.config.stream_threshold {
            let data = read_fully(source, slice.start(), slice.len()).await?;
            return self.feed(ResponseMessage::Payload(PayloadItem::Chunk(data))).await;
        }

        let unit = self.config.stream_unit.max(1) as u64;
        let mut offset = slice.start();
        let mut remaining = slice.len();
        trace!(size = remaining, unit, "streaming file slice");

        while remaining > 0 {
            let data = read_fully(source, offset, remaining.min(unit)).await?;
            let size = data.len() as u64;

            let message = ResponseMessage::Payload(PayloadItem::Chunk(data));
            with_idle_timeout(idle_timeout, self.framed_write.send(message)).await?;

            offset += size;
            remaining -= size;
        }
        Ok(())
    }
}

/// Reads exactly `len` bytes at `offset`, failing if the source ends early.
async fn read_fully(source: &mut dyn FileSource, offset: u64, len: u64) -> Result<Bytes, SendError> {
    let len = usize::try_from(len).map_err(|_| SendError::invalid_body(format!("slice of {len} bytes is too large")))?;
    let mut buf = BytesMut::with_capacity(len);

    while buf.len() < len {
        let chunk = source.read_chunk(offset + buf.len() as u64, len - buf.len()).await?;
        if chunk.is_empty() {
            return Err(SendError::invalid_body(format!("resource ended {} bytes early", len - buf.len())));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

async fn with_idle_timeout<F>(timeout: Duration, future: F) -> Result<(), SendError>
where
    F: Future<Output = Result<(), SendError>>,
{
    tokio::time::timeout(timeout, future).await.map_err(|_| SendError::IdleTimeout { timeout })?
}
