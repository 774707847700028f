use bytes::{BufMut, BytesMut};
use http::StatusCode;

use crate::protocol::{FileBody, HeaderError, HttpHeaders, HttpVersion, ResponseError, SendError};
use crate::utils::{ensure, is_ctl};

/// The status line and headers of a response, detached for serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub version: HttpVersion,
    pub status: u16,
    pub reason: String,
    pub headers: HttpHeaders,
}

#[derive(Debug, Default)]
pub enum ResponseBody {
    #[default]
    Empty,
    /// Bytes accumulated through [`Response::write`].
    Buffer(BytesMut),
    /// A slice of a resource, streamed when the response is sent.
    File(FileBody),
}

impl ResponseBody {
    pub fn len(&self) -> u64 {
        match self {
            ResponseBody::Empty => 0,
            ResponseBody::Buffer(bytes) => bytes.len() as u64,
            ResponseBody::File(file) => file.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Committed,
    Ended,
}

/// A response under construction.
///
/// Handlers fill in the status line, headers and body; the connection sends it. Once the
/// headers went out the response is frozen and every mutation fails with
/// [`ResponseError::Frozen`].
#[derive(Debug)]
pub struct Response {
    version: HttpVersion,
    status: u16,
    reason: String,
    headers: HttpHeaders,
    body: ResponseBody,
    state: State,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// A `HTTP/1.1 200 OK` response with no headers and no body.
    pub fn new() -> Self {
        Self {
            version: HttpVersion::HTTP_11,
            status: 200,
            reason: "OK".to_string(),
            headers: HttpHeaders::new(),
            body: ResponseBody::Empty,
            state: State::Open,
        }
    }

    /// Sets the whole status line.
    ///
    /// `status` may be any three digit code; `reason` must not contain control characters
    /// other than horizontal tab.
    pub fn set_status_line<R: Into<String>>(
        &mut self,
        version: HttpVersion,
        status: u16,
        reason: R,
    ) -> Result<(), ResponseError> {
        self.ensure_open()?;
        ensure!(status <= 999, ResponseError::InvalidStatus { code: status });

        let reason = reason.into();
        ensure!(
            !reason.bytes().any(|b| b != b'\t' && is_ctl(b)),
            ResponseError::InvalidReason { reason }
        );

        self.version = version;
        self.status = status;
        self.reason = reason;
        Ok(())
    }

    /// Sets the status code keeping the version, with the canonical reason phrase.
    pub fn set_status(&mut self, status: StatusCode) -> Result<(), ResponseError> {
        let reason = status.canonical_reason().unwrap_or_default();
        self.set_status_line(self.version, status.as_u16(), reason)
    }

    pub fn set_header<N, V>(&mut self, name: N, value: V, merge: bool) -> Result<(), ResponseError>
    where
        N: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.ensure_open()?;
        self.headers.set_header(name, value, merge)?;
        Ok(())
    }

    pub fn get_header<N: AsRef<[u8]>>(&self, name: N) -> Result<String, HeaderError> {
        self.headers.get_header(name)
    }

    /// Appends bytes to the in-memory body.
    pub fn write<D: AsRef<[u8]>>(&mut self, data: D) -> Result<(), ResponseError> {
        self.ensure_open()?;
        match &mut self.body {
            ResponseBody::File(_) => return Err(ResponseError::BodyConflict),
            ResponseBody::Buffer(buf) => buf.put_slice(data.as_ref()),
            body @ ResponseBody::Empty => *body = ResponseBody::Buffer(BytesMut::from(data.as_ref())),
        }
        Ok(())
    }

    /// Queues a file slice as the body, replacing anything written before.
    pub fn send_file(&mut self, file: FileBody) -> Result<(), ResponseError> {
        self.ensure_open()?;
        self.body = ResponseBody::File(file);
        Ok(())
    }

    #[inline]
    pub fn version(&self) -> HttpVersion {
        self.version
    }

    #[inline]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    #[inline]
    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    #[inline]
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// True once the headers were handed to the transport.
    pub fn is_committed(&self) -> bool {
        self.state != State::Open
    }

    /// True once the whole response was handed to the transport, or it was dropped.
    pub fn is_ended(&self) -> bool {
        self.state == State::Ended
    }

    fn ensure_open(&self) -> Result<(), ResponseError> {
        ensure!(self.state == State::Open, ResponseError::Frozen);
        Ok(())
    }

    /// Freezes the response and detaches what needs to be written.
    pub(crate) fn commit(&mut self) -> Result<(ResponseHead, ResponseBody), SendError> {
        match self.state {
            State::Open => {}
            State::Committed => return Err(SendError::AlreadyCommitted),
            State::Ended => return Err(SendError::AlreadyEnded),
        }
        self.state = State::Committed;

        let head = ResponseHead {
            version: self.version,
            status: self.status,
            reason: self.reason.clone(),
            headers: std::mem::take(&mut self.headers),
        };
        Ok((head, std::mem::take(&mut self.body)))
    }

    pub(crate) fn end(&mut self) {
        self.state = State::Ended;
    }
}
