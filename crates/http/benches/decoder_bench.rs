use bytes::{Bytes, BytesMut};
use criterion::{Criterion, criterion_group, criterion_main};
use httpd_core::codec::{RequestDecoder, ResponseEncoder};
use httpd_core::connection::{ConnectionConfig, HttpConnection};
use httpd_core::handler::{Incoming, Reply, make_handler};
use httpd_core::protocol::{HttpHeaders, HttpVersion, Message, PayloadSize, RangedSlice, Response, ResponseHead, ServerIdentity};
use std::hint::black_box;
use std::{
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::codec::{Decoder, Encoder};

const REQUEST: &[u8] = b"GET /static/index.html?v=1 HTTP/1.1\r\n\
Host: localhost:8080\r\n\
User-Agent: bench\r\n\
Accept: text/html\r\n\
Accept: application/xhtml+xml\r\n\
Accept-Encoding: gzip, deflate\r\n\
Connection: close\r\n\r\n";

// Mock IO for testing
#[derive(Clone)]
struct MockIO {
    read_data: Vec<u8>,
    write_data: Vec<u8>,
    read_pos: usize,
}

impl MockIO {
    fn new(read_data: Vec<u8>) -> Self {
        Self { read_data, write_data: Vec::new(), read_pos: 0 }
    }
}

impl AsyncRead for MockIO {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let remaining = &self.read_data[self.read_pos..];
        let amt = std::cmp::min(remaining.len(), buf.remaining());
        buf.put_slice(&remaining[..amt]);
        self.read_pos += amt;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockIO {
    fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize, io::Error>> {
        self.write_data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }
}

fn identity() -> Arc<ServerIdentity> {
    let identity = Arc::new(ServerIdentity::new());
    identity.initialize("localhost", 8080).unwrap();
    identity
}

async fn hello_world(_incoming: Incoming) -> Reply {
    let mut response = Response::new();
    response.write("Hello World!").unwrap();
    Reply::Respond(response)
}

fn bench_request_decoder(c: &mut Criterion) {
    let identity = identity();

    c.bench_function("decode_request_whole", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new(identity.clone());
            let mut bytes = BytesMut::from(REQUEST);
            black_box(decoder.decode(&mut bytes).unwrap());
        });
    });

    c.bench_function("decode_request_in_16_byte_chunks", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new(identity.clone());
            let mut result = None;
            for chunk in REQUEST.chunks(16) {
                let mut bytes = BytesMut::from(chunk);
                result = decoder.decode(&mut bytes).unwrap();
            }
            black_box(result.unwrap());
        });
    });
}

fn bench_response_encoder(c: &mut Criterion) {
    let mut headers = HttpHeaders::new();
    headers.set_header("Content-Type", "text/html", false).unwrap();
    headers.set_header("Last-Modified", "Sun, 06 Nov 1994 08:49:37 GMT", false).unwrap();
    let head = ResponseHead { version: HttpVersion::HTTP_11, status: 200, reason: "OK".into(), headers };

    c.bench_function("encode_response_head", |b| {
        b.iter(|| {
            let mut encoder = ResponseEncoder::new("bench");
            let mut bytes = BytesMut::new();
            let message = Message::<_, Bytes>::Header((head.clone(), PayloadSize::Length(12)));
            black_box(encoder.encode(message, &mut bytes).unwrap());
        });
    });
}

fn bench_range(c: &mut Criterion) {
    c.bench_function("resolve_range", |b| {
        b.iter(|| black_box(RangedSlice::resolve(Some(black_box("bytes=100-2000")), 1_000_000).unwrap()));
    });
}

fn bench_http_connection(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let identity = identity();
    let config = Arc::new(ConnectionConfig::default());
    let handler = Arc::new(make_handler(hello_world));

    c.bench_function("process_request", |b| {
        b.to_async(&runtime).iter(|| {
            let (identity, config, handler) = (identity.clone(), config.clone(), handler.clone());
            async move {
                let mock_io = MockIO::new(REQUEST.to_vec());
                let (reader, writer) = (mock_io.clone(), mock_io);
                let connection = HttpConnection::new(reader, writer, identity, config);
                black_box(connection.process(handler).await.unwrap());
            }
        });
    });
}

criterion_group!(benches, bench_request_decoder, bench_response_encoder, bench_range, bench_http_connection);
criterion_main!(benches);
