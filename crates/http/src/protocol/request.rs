use bytes::Bytes;
use http::Method;

use crate::protocol::{HeaderError, HttpHeaders, HttpVersion, Scheme};

/// A fully read HTTP request.
///
/// Requests are produced by [`RequestDecoder`](crate::codec::RequestDecoder). Once dispatched,
/// the scheme, host and port are always known: they come from an absolute request target, the
/// `Host` header, or the server's primary location for HTTP/1.0 clients. A request handed out
/// alongside a parse failure may be missing any of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) target: String,
    pub(crate) path: String,
    pub(crate) query: String,
    pub(crate) version: HttpVersion,
    pub(crate) scheme: Option<Scheme>,
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) headers: HttpHeaders,
    pub(crate) body: Bytes,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: Method::GET,
            target: String::new(),
            path: String::new(),
            query: String::new(),
            version: HttpVersion::HTTP_11,
            scheme: None,
            host: None,
            port: None,
            headers: HttpHeaders::new(),
            body: Bytes::new(),
        }
    }
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request target exactly as it appeared on the request line.
    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The percent-decoded path, without the query.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string without the leading `?`; empty when absent.
    #[inline]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[inline]
    pub fn version(&self) -> HttpVersion {
        self.version
    }

    #[inline]
    pub fn scheme(&self) -> Option<Scheme> {
        self.scheme
    }

    #[inline]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    #[inline]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    #[inline]
    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn get_header<N: AsRef<[u8]>>(&self, name: N) -> Result<String, HeaderError> {
        self.headers.get_header(name)
    }

    pub fn has_header<N: AsRef<[u8]>>(&self, name: N) -> Result<bool, HeaderError> {
        self.headers.has_header(name)
    }

    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// Builds a [`Request`] by hand, for handlers invoked outside of a connection.
///
/// Errors from header setters are deferred until [`RequestBuilder::build`].
#[derive(Debug, Default)]
pub struct RequestBuilder {
    request: Request,
    error: Option<HeaderError>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.request.method = method;
        self
    }

    /// Sets the origin-form target. The path is taken verbatim, without percent-decoding.
    #[must_use]
    pub fn target(mut self, target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        self.request.target = target.to_string();
        self.request.path = path.to_string();
        self.request.query = query.to_string();
        self
    }

    #[must_use]
    pub fn version(mut self, version: HttpVersion) -> Self {
        self.request.version = version;
        self
    }

    #[must_use]
    pub fn location(mut self, scheme: Scheme, host: &str, port: u16) -> Self {
        self.request.scheme = Some(scheme);
        self.request.host = Some(host.to_string());
        self.request.port = Some(port);
        self
    }

    #[must_use]
    pub fn header<N: AsRef<[u8]>, V: AsRef<[u8]>>(mut self, name: N, value: V) -> Self {
        if self.error.is_none()
            && let Err(e) = self.request.headers.set_header(name, value, true)
        {
            self.error = Some(e);
        }
        self
    }

    #[must_use]
    pub fn body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.request.body = body.into();
        self
    }

    pub fn build(self) -> Result<Request, HeaderError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.request),
        }
    }
}
