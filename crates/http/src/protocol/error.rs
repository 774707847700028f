use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::io;
use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

use crate::protocol::{HttpVersion, Response};

/// Top-level error of a single connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

/// Errors raised while decoding a request.
///
/// Every variant maps to the status code the client should see, see [`ParseError::status`].
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("body size {size} exceeds the limit {max_size}")]
    TooLargeBody { size: u64, max_size: u64 },

    #[error("malformed request line: {reason}")]
    InvalidRequestLine { reason: String },

    #[error("invalid http version: {version}")]
    InvalidVersion { version: String },

    #[error("http version {version} is too old")]
    VersionTooOld { version: HttpVersion },

    #[error("http version {version} is not supported")]
    VersionNotSupported { version: HttpVersion },

    #[error("invalid request target: {reason}")]
    InvalidTarget { reason: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("unsupported transfer-encoding: {value}")]
    UnsupportedTransferEncoding { value: String },

    #[error("missing host header")]
    MissingHost,

    #[error("unrecognized host: {host}")]
    UnknownHost { host: String },

    #[error("unexpected data after the request was complete")]
    UnexpectedData,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn invalid_request_line<S: ToString>(str: S) -> Self {
        Self::InvalidRequestLine { reason: str.to_string() }
    }

    pub fn invalid_version<S: ToString>(str: S) -> Self {
        Self::InvalidVersion { version: str.to_string() }
    }

    pub fn invalid_target<S: ToString>(str: S) -> Self {
        Self::InvalidTarget { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn unknown_host<S: ToString>(str: S) -> Self {
        Self::UnknownHost { host: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// The status code the client should receive for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            ParseError::VersionTooOld { .. } | ParseError::UnsupportedTransferEncoding { .. } => {
                StatusCode::NOT_IMPLEMENTED
            }
            ParseError::VersionNotSupported { .. } => StatusCode::HTTP_VERSION_NOT_SUPPORTED,
            ParseError::TooLargeBody { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ParseError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Fatal failures are not the client's fault; the server should stop once they are answered.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ParseError::Io { .. })
    }
}

/// Errors raised while writing a response to the transport.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("response headers were already sent")]
    AlreadyCommitted,

    #[error("response was already sent")]
    AlreadyEnded,

    #[error("client did not accept data within {timeout:?}")]
    IdleTimeout { timeout: Duration },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Misuse of a [`Response`] by handler code.
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("response is frozen, headers were already sent")]
    Frozen,

    #[error("invalid status code {code}, must be within 0..=999")]
    InvalidStatus { code: u16 },

    #[error("invalid reason phrase: {reason:?}")]
    InvalidReason { reason: String },

    #[error("body already holds a file, can not write bytes into it")]
    BodyConflict,

    #[error(transparent)]
    Header(#[from] HeaderError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("invalid header name: {name:?}")]
    InvalidName { name: String },

    #[error("invalid header value: {reason}")]
    InvalidValue { reason: String },

    #[error("header not found: {name}")]
    NotFound { name: String },
}

impl HeaderError {
    pub fn invalid_name<S: ToString>(str: S) -> Self {
        Self::InvalidName { name: str.to_string() }
    }

    pub fn invalid_value<S: ToString>(str: S) -> Self {
        Self::InvalidValue { reason: str.to_string() }
    }

    pub fn not_found<S: ToString>(str: S) -> Self {
        Self::NotFound { name: str.to_string() }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("unknown scheme: {scheme}")]
    InvalidScheme { scheme: String },

    #[error("invalid host: {host}")]
    InvalidHost { host: String },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    #[error("requested range not satisfiable for a resource of {size} bytes")]
    Unsatisfiable { size: u64 },
}

/// Customizes the error response before an error handler sees it.
pub type ErrorHook = Box<dyn FnOnce(&mut Response) -> Result<(), ResponseError> + Send + Sync>;

/// A request failure that carries the status code to answer with.
///
/// The optional hook runs against the response given to the first error handler tried, which is
/// how a handler passes along extra headers such as `Content-Range` for a 416.
pub struct HttpError {
    status: StatusCode,
    hook: Option<ErrorHook>,
}

impl HttpError {
    pub fn new(status: StatusCode) -> Self {
        Self { status, hook: None }
    }

    #[must_use]
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&mut Response) -> Result<(), ResponseError> + Send + Sync + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn take_hook(&mut self) -> Option<ErrorHook> {
        self.hook.take()
    }

    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    pub fn range_not_satisfiable() -> Self {
        Self::new(StatusCode::RANGE_NOT_SATISFIABLE)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn not_implemented() -> Self {
        Self::new(StatusCode::NOT_IMPLEMENTED)
    }
}

impl Debug for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpError").field("status", &self.status).field("hook", &self.hook.is_some()).finish()
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)
    }
}

impl Error for HttpError {}

impl From<StatusCode> for HttpError {
    fn from(status: StatusCode) -> Self {
        Self::new(status)
    }
}

/// The outcome of a failed request handler.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// An expected failure answered with an error response.
    #[error("http error: {0}")]
    Http(#[from] HttpError),

    /// Anything else. The request is answered with a 500 and the server shuts down afterwards.
    #[error("fatal error: {0}")]
    Fatal(Box<dyn Error + Send + Sync>),
}

impl HandlerError {
    pub fn fatal<E: Into<Box<dyn Error + Send + Sync>>>(e: E) -> Self {
        Self::Fatal(e.into())
    }
}

impl From<StatusCode> for HandlerError {
    fn from(status: StatusCode) -> Self {
        Self::Http(HttpError::new(status))
    }
}

impl From<ResponseError> for HandlerError {
    fn from(e: ResponseError) -> Self {
        Self::Fatal(Box::new(e))
    }
}

impl From<HeaderError> for HandlerError {
    fn from(e: HeaderError) -> Self {
        Self::Fatal(Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_status() {
        assert_eq!(ParseError::invalid_header("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ParseError::MissingHost.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ParseError::VersionTooOld { version: HttpVersion::new(0, 9) }.status(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            ParseError::VersionNotSupported { version: HttpVersion::new(2, 0) }.status(),
            StatusCode::HTTP_VERSION_NOT_SUPPORTED
        );
        assert_eq!(
            ParseError::UnsupportedTransferEncoding { value: "chunked".into() }.status(),
            StatusCode::NOT_IMPLEMENTED
        );

        let io = ParseError::io(io::Error::from(io::ErrorKind::BrokenPipe));
        assert_eq!(io.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(io.is_fatal());
        assert!(!ParseError::UnexpectedData.is_fatal());
    }

    #[test]
    fn http_error_hook_is_taken_once() {
        let mut error = HttpError::range_not_satisfiable().with_hook(|_| Ok(()));
        assert_eq!(error.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert!(error.take_hook().is_some());
        assert!(error.take_hook().is_none());
    }

    #[test]
    fn handler_error_conversions() {
        let error: HandlerError = StatusCode::NOT_FOUND.into();
        assert!(matches!(error, HandlerError::Http(ref e) if e.status() == StatusCode::NOT_FOUND));

        let error: HandlerError = ResponseError::Frozen.into();
        assert!(matches!(error, HandlerError::Fatal(_)));
    }
}
