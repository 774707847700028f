//! HTTP request decoder module
//!
//! This module decodes requests incrementally: bytes may arrive in chunks of any size, split
//! anywhere, and the decoder resumes exactly where the previous chunk left it.
//!
//! # State Machine
//!
//! - `RequestLine`: skipping blank lines, then parsing `METHOD SP target SP HTTP/x.y`
//! - `Headers`: collecting header lines, including folded continuation lines
//! - `Body`: collecting exactly `Content-Length` bytes
//! - `Finished`: a request was produced, or decoding failed; nothing more is accepted
//!
//! Once the whole request is read it is validated against the [`ServerIdentity`]: the scheme,
//! host and port it targets are resolved and must be a location the server answers for.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bytes::BytesMut;
//! use httpd_core::codec::RequestDecoder;
//! use httpd_core::protocol::ServerIdentity;
//! use tokio_util::codec::Decoder;
//!
//! let identity = Arc::new(ServerIdentity::new());
//! identity.initialize("localhost", 4444).unwrap();
//!
//! let mut decoder = RequestDecoder::new(identity);
//! let mut buffer = BytesMut::from(&b"GET /index.html HTTP/1.1\r\nHost: localhost:4444\r\n\r\n"[..]);
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.path(), "/index.html");
//! ```

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::{Method, Uri};
use memchr::memchr;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::codec::Decoder;
use tracing::{trace, warn};

use crate::codec::LineBuffer;
use crate::ensure;
use crate::protocol::{HttpVersion, ParseError, Request, Scheme, ServerIdentity, is_valid_host};
use crate::utils::latin1;

/// Default upper bound of the request line plus headers, in bytes.
pub const DEFAULT_MAX_HEAD_SIZE: usize = 64 * 1024;

/// Default upper bound of a request body, in bytes.
pub const DEFAULT_MAX_BODY_SIZE: u64 = 16 * 1024 * 1024;

static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^HTTP/(\d+)\.(\d+)$").expect("version regex is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    RequestLine,
    Headers,
    Body { remaining: u64 },
    Finished,
}

/// A header whose value may still grow through continuation lines.
#[derive(Debug)]
struct PendingHeader {
    name: Bytes,
    value: BytesMut,
}

/// A decoder producing one [`Request`] from a byte stream.
///
/// After a request or an error was produced the decoder is finished; any further bytes are
/// reported as [`ParseError::UnexpectedData`].
#[derive(Debug)]
pub struct RequestDecoder {
    identity: Arc<ServerIdentity>,
    lines: LineBuffer,
    state: State,
    request: Request,
    pending: Option<PendingHeader>,
    body: BytesMut,
    head_size: usize,
    max_head_size: usize,
    max_body_size: u64,
    trailing: usize,
}

impl RequestDecoder {
    pub fn new(identity: Arc<ServerIdentity>) -> Self {
        Self {
            identity,
            lines: LineBuffer::new(),
            state: State::RequestLine,
            request: Request::default(),
            pending: None,
            body: BytesMut::new(),
            head_size: 0,
            max_head_size: DEFAULT_MAX_HEAD_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            trailing: 0,
        }
    }

    #[must_use]
    pub fn with_max_head_size(mut self, max_head_size: usize) -> Self {
        self.max_head_size = max_head_size;
        self
    }

    #[must_use]
    pub fn with_max_body_size(mut self, max_body_size: u64) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// The request as far as it was parsed. Useful for answering a failed request.
    pub fn partial_request(&self) -> &Request {
        &self.request
    }

    /// Takes the partially parsed request out of the decoder.
    pub fn take_partial(&mut self) -> Request {
        std::mem::take(&mut self.request)
    }

    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Number of bytes received past the end of the request.
    pub fn trailing_bytes(&self) -> usize {
        self.trailing + self.lines.len()
    }

    fn advance(&mut self) -> Result<Option<Request>, ParseError> {
        loop {
            match self.state {
                State::RequestLine => {
                    if !self.process_request_line()? {
                        return Ok(None);
                    }
                }
                State::Headers => {
                    if !self.process_headers()? {
                        return Ok(None);
                    }
                }
                State::Body { .. } => {
                    let rest = self.lines.purge();
                    return self.process_body(&rest);
                }
                State::Finished => return Ok(None),
            }
        }
    }

    /// Reads the next line of the head, enforcing the head size limit.
    fn read_head_line(&mut self) -> Result<Option<Bytes>, ParseError> {
        match self.lines.read_line() {
            Some(line) => {
                self.head_size += line.len() + 2;
                ensure!(self.head_size <= self.max_head_size, ParseError::too_large_header(self.head_size, self.max_head_size));
                Ok(Some(line))
            }
            None => {
                let current_size = self.head_size + self.lines.len();
                ensure!(current_size <= self.max_head_size, ParseError::too_large_header(current_size, self.max_head_size));
                Ok(None)
            }
        }
    }

    fn process_request_line(&mut self) -> Result<bool, ParseError> {
        let line = loop {
            match self.read_head_line()? {
                None => return Ok(false),
                Some(line) if line.is_empty() => trace!("skipping blank line before request line"),
                Some(line) => break line,
            }
        };

        self.parse_request_line(&line)?;
        self.state = State::Headers;
        Ok(true)
    }

    fn parse_request_line(&mut self, line: &[u8]) -> Result<(), ParseError> {
        let is_blank = |b: &u8| *b == b' ' || *b == b'\t';
        ensure!(
            !line.first().is_some_and(is_blank) && !line.last().is_some_and(is_blank),
            ParseError::invalid_request_line(latin1(line))
        );

        let fields: Vec<&[u8]> = line.split(is_blank).filter(|field| !field.is_empty()).collect();
        let &[method, target, version] = fields.as_slice() else {
            return Err(ParseError::invalid_request_line(latin1(line)));
        };

        self.request.method = Method::from_bytes(method).map_err(|_| ParseError::invalid_request_line(latin1(line)))?;
        self.request.version = parse_version(&latin1(version))?;
        self.parse_target(latin1(target))
    }

    fn parse_target(&mut self, target: String) -> Result<(), ParseError> {
        let request = &mut self.request;

        if target.starts_with('/') {
            let (path, query) = target.split_once('?').unwrap_or((target.as_str(), ""));
            let path = urlencoding::decode(path).map_err(|e| ParseError::invalid_target(e))?;
            request.path = path.into_owned();
            request.query = query.to_string();
        } else {
            ensure!(
                request.version.at_least(HttpVersion::HTTP_11),
                ParseError::invalid_target(format!("absolute target {target} needs HTTP/1.1"))
            );

            let uri: Uri = target.parse().map_err(|e| ParseError::invalid_target(e))?;
            let scheme = match uri.scheme_str() {
                Some(scheme) => scheme.parse::<Scheme>().map_err(|e| ParseError::invalid_target(e))?,
                None => return Err(ParseError::invalid_target(format!("missing scheme in {target}"))),
            };
            let Some(host) = uri.host().filter(|host| is_valid_host(host)) else {
                return Err(ParseError::invalid_target(format!("missing or invalid host in {target}")));
            };
            let path = urlencoding::decode(uri.path()).map_err(|e| ParseError::invalid_target(e))?;

            request.scheme = Some(scheme);
            request.host = Some(host.to_ascii_lowercase());
            request.port = Some(uri.port_u16().unwrap_or_else(|| scheme.default_port()));
            request.path = path.into_owned();
            request.query = uri.query().unwrap_or_default().to_string();
        }

        request.target = target;
        Ok(())
    }

    fn process_headers(&mut self) -> Result<bool, ParseError> {
        loop {
            let Some(line) = self.read_head_line()? else {
                return Ok(false);
            };

            if line.is_empty() {
                self.commit_pending()?;
                self.enter_body()?;
                return Ok(true);
            }

            if matches!(line[0], b' ' | b'\t') {
                let Some(pending) = self.pending.as_mut() else {
                    return Err(ParseError::invalid_header("continuation line before any header"));
                };
                pending.value.extend_from_slice(&line);
                continue;
            }

            self.commit_pending()?;
            match memchr(b':', &line) {
                Some(colon) if colon > 0 => {
                    self.pending = Some(PendingHeader { name: line.slice(..colon), value: BytesMut::from(&line[colon + 1..]) });
                }
                _ => return Err(ParseError::invalid_header(format!("malformed header line {:?}", latin1(&line)))),
            }
        }
    }

    fn commit_pending(&mut self) -> Result<(), ParseError> {
        if let Some(PendingHeader { name, value }) = self.pending.take() {
            self.request.headers.set_header(&name, &value, true).map_err(|e| ParseError::invalid_header(e))?;
        }
        Ok(())
    }

    fn enter_body(&mut self) -> Result<(), ParseError> {
        let headers = &self.request.headers;

        if let Some(value) = headers.get(TRANSFER_ENCODING) {
            ensure!(
                value.as_bytes().eq_ignore_ascii_case(b"identity"),
                ParseError::UnsupportedTransferEncoding { value: latin1(value.as_bytes()) }
            );
        }

        let length = match headers.get(CONTENT_LENGTH) {
            None => 0,
            Some(value) => {
                let value = latin1(value.as_bytes());
                value.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(value))?
            }
        };
        ensure!(length <= self.max_body_size, ParseError::TooLargeBody { size: length, max_size: self.max_body_size });

        self.state = State::Body { remaining: length };
        Ok(())
    }

    fn process_body(&mut self, data: &[u8]) -> Result<Option<Request>, ParseError> {
        let State::Body { remaining } = &mut self.state else {
            return Ok(None);
        };

        let count = usize::try_from(*remaining).unwrap_or(usize::MAX).min(data.len());
        self.body.extend_from_slice(&data[..count]);
        *remaining -= count as u64;
        self.trailing += data.len() - count;

        if *remaining > 0 {
            return Ok(None);
        }

        self.validate()?;
        self.state = State::Finished;

        let mut request = std::mem::take(&mut self.request);
        request.body = self.body.split().freeze();
        Ok(Some(request))
    }

    /// Resolves and checks the location the request targets.
    fn validate(&mut self) -> Result<(), ParseError> {
        let request = &mut self.request;

        if !request.version.at_least(HttpVersion::HTTP_11) {
            // HTTP/1.0 clients may not name a host at all
            if request.host.is_none() {
                let primary = self.identity.primary().ok_or_else(|| ParseError::unknown_host("<no primary location>"))?;
                request.scheme = Some(primary.scheme);
                request.host = Some(primary.host);
                request.port = Some(primary.port);
            }
            return Ok(());
        }

        let host_header = request.headers.get(HOST).ok_or(ParseError::MissingHost)?;
        let host_header = latin1(host_header.as_bytes());

        match (request.scheme, request.host.as_deref(), request.port) {
            (Some(scheme), Some(host), Some(port)) => {
                let known = self.identity.has(scheme, host, port).unwrap_or(false);
                ensure!(known, ParseError::unknown_host(format!("{scheme}://{host}:{port}")));
            }
            _ => {
                let (host, port) = split_host_port(&host_header)?;
                let scheme = self
                    .identity
                    .get_scheme(&host, port)
                    .ok()
                    .flatten()
                    .or_else(|| self.identity.get_scheme("localhost", port).ok().flatten())
                    .ok_or_else(|| ParseError::unknown_host(&host_header))?;

                request.scheme = Some(scheme);
                request.host = Some(host);
                request.port = Some(port);
            }
        }
        Ok(())
    }

    fn fail(&mut self) {
        self.state = State::Finished;
        self.pending = None;
        self.lines.purge();
    }
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    /// Feeds the buffered bytes into the decoder.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(_))`: the request is complete and valid
    /// - `Ok(None)`: need more data to proceed
    /// - `Err(_)`: the request is malformed; the partial request stays available through
    ///   [`RequestDecoder::take_partial`]
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let result = match self.state {
            State::Finished => {
                if src.is_empty() {
                    return Ok(None);
                }
                warn!(size = src.len(), "received data after the request was complete");
                self.trailing += src.len();
                src.clear();
                Err(ParseError::UnexpectedData)
            }
            State::Body { .. } => {
                let data = src.split();
                self.process_body(&data)
            }
            State::RequestLine | State::Headers => {
                if !src.is_empty() {
                    self.lines.append(src.split());
                }
                self.advance()
            }
        };

        if result.is_err() {
            self.fail();
        }
        result
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let request = self.decode(src)?;
        if request.is_none() && self.state != State::Finished {
            trace!(state = ?self.state, "peer closed the connection before the request was complete");
        }
        Ok(request)
    }
}

fn parse_version(version: &str) -> Result<HttpVersion, ParseError> {
    let Some(captures) = VERSION_REGEX.captures(version) else {
        return Err(ParseError::invalid_version(version));
    };

    let major = captures[1].parse::<u32>().map_err(|_| ParseError::invalid_version(version))?;
    let minor = captures[2].parse::<u32>().map_err(|_| ParseError::invalid_version(version))?;
    let version = HttpVersion::new(major, minor);

    ensure!(version.at_least(HttpVersion::HTTP_10), ParseError::VersionTooOld { version });
    ensure!(major < 2, ParseError::VersionNotSupported { version });
    Ok(version)
}

/// Splits a `Host` header into host and port, the port defaulting to 80.
fn split_host_port(value: &str) -> Result<(String, u16), ParseError> {
    let (host, port) = value.split_once(':').unwrap_or((value, ""));
    ensure!(is_valid_host(host), ParseError::unknown_host(value));
    ensure!(port.bytes().all(|b| b.is_ascii_digit()), ParseError::unknown_host(value));

    let port = match port.parse::<u16>() {
        Ok(0) => 80,
        Ok(port) => port,
        Err(_) if port.is_empty() => 80,
        Err(_) => return Err(ParseError::unknown_host(value)),
    };
    Ok((host.to_ascii_lowercase(), port))
}
