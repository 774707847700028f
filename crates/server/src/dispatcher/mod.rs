//! Routes requests to the registered [`RequestHandler`]s.
//!
//! A request goes to the handler registered for its exact path, or else to the handler of the
//! longest registered prefix of its path. Requests nothing is registered for are refused with a
//! 403. Failures, whether the request could not be parsed or its handler raised an error, are
//! answered with an error page, see [`DispatcherBuilder::error`].

mod defaults;
mod fallback;

use std::collections::HashMap;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use httpd_core::handler::{Handler, Incoming, Reply};
use httpd_core::protocol::{HandlerError, HttpError, Request, Response};
use thiserror::Error;
use tracing::{error, info};

use crate::dispatcher::fallback::ErrorPages;
use crate::file::{DirectoryHandler, FileResolver, FsResolver};
use crate::handler::RequestHandler;
use crate::shutdown::ShutdownSignal;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("path must start with '/': {path}")]
    InvalidPath { path: String },

    #[error("prefix must start and end with '/': {prefix}")]
    InvalidPrefix { prefix: String },

    #[error("error code must be within 0..=999: {code}")]
    InvalidErrorCode { code: u16 },
}

pub struct Dispatcher {
    paths: HashMap<String, Arc<dyn RequestHandler>>,
    /// Longest prefix first.
    prefixes: Vec<(String, Arc<dyn RequestHandler>)>,
    errors: ErrorPages,
    shutdown: ShutdownSignal,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Raised when a failure means the server should stop after the current response.
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    fn route(&self, path: &str) -> Option<&Arc<dyn RequestHandler>> {
        self.paths.get(path).or_else(|| {
            self.prefixes.iter().find(|(prefix, _)| path.starts_with(prefix.as_str())).map(|(_, handler)| handler)
        })
    }

    async fn dispatch(&self, request: Arc<Request>) -> Reply {
        let result = match self.route(request.path()) {
            Some(handler) => handler.handle(Arc::clone(&request), Response::new()).await,
            None => {
                info!(path = request.path(), "no handler registered, refusing request");
                Err(HttpError::forbidden().into())
            }
        };

        match result {
            Ok(response) => Reply::Respond(response),
            Err(HandlerError::Http(mut e)) => {
                let hook = e.take_hook();
                self.errors.respond(e.status().as_u16(), request, hook).await
            }
            Err(HandlerError::Fatal(e)) => {
                error!(cause = %e, path = request.path(), "request handler failed, the server stops after this response");
                self.shutdown.request();
                self.errors.respond(500, request, None).await
            }
        }
    }
}

impl Debug for Dispatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("paths", &self.paths.keys().collect::<Vec<_>>())
            .field("prefixes", &self.prefixes.iter().map(|(prefix, _)| prefix).collect::<Vec<_>>())
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Handler for Dispatcher {
    async fn call(&self, incoming: Incoming) -> Reply {
        match incoming {
            Incoming::Request(request) => self.dispatch(Arc::new(request)).await,
            Incoming::Failed(failure) => {
                if failure.is_fatal() {
                    self.shutdown.request();
                }
                let code = failure.status().as_u16();
                self.errors.respond(code, Arc::new(failure.into_request()), None).await
            }
        }
    }
}

/// Collects handler registrations for a [`Dispatcher`].
///
/// Registering the same path, prefix or error code twice keeps the later handler. Invalid
/// registrations are reported by [`DispatcherBuilder::build`].
#[derive(Default)]
pub struct DispatcherBuilder {
    paths: HashMap<String, Arc<dyn RequestHandler>>,
    prefixes: HashMap<String, Arc<dyn RequestHandler>>,
    errors: HashMap<u16, Arc<dyn RequestHandler>>,
    error: Option<RegistrationError>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles requests for exactly `path`.
    #[must_use]
    pub fn path<H: RequestHandler + 'static>(mut self, path: impl Into<String>, handler: H) -> Self {
        let path = path.into();
        if path.starts_with('/') {
            self.paths.insert(path, Arc::new(handler));
        } else {
            self.fail(RegistrationError::InvalidPath { path });
        }
        self
    }

    /// Handles requests whose path starts with `prefix`, unless a longer prefix matches too.
    #[must_use]
    pub fn prefix<H: RequestHandler + 'static>(mut self, prefix: impl Into<String>, handler: H) -> Self {
        let prefix = prefix.into();
        if prefix.starts_with('/') && prefix.ends_with('/') {
            self.prefixes.insert(prefix, Arc::new(handler));
        } else {
            self.fail(RegistrationError::InvalidPrefix { prefix });
        }
        self
    }

    /// Answers failures with status `code` instead of the built-in page.
    ///
    /// The handler gets the failed request, which may be incomplete, and a response that may
    /// already carry headers from the failing handler.
    #[must_use]
    pub fn error<H: RequestHandler + 'static>(mut self, code: u16, handler: H) -> Self {
        if code <= 999 {
            self.errors.insert(code, Arc::new(handler));
        } else {
            self.fail(RegistrationError::InvalidErrorCode { code });
        }
        self
    }

    /// Serves the files below `root` under `prefix`.
    #[must_use]
    pub fn directory(self, prefix: impl Into<String>, root: impl AsRef<Path>) -> Self {
        let resolver = FsResolver::new(root.as_ref());
        self.files(prefix, resolver)
    }

    /// Serves the files of `resolver` under `prefix`.
    #[must_use]
    pub fn files<R: FileResolver + 'static>(self, prefix: impl Into<String>, resolver: R) -> Self {
        let prefix = prefix.into();
        let handler = DirectoryHandler::new(prefix.clone(), resolver);
        self.prefix(prefix, handler)
    }

    pub fn build(self) -> Result<Dispatcher, RegistrationError> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let mut prefixes = self.prefixes.into_iter().collect::<Vec<_>>();
        prefixes.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        Ok(Dispatcher {
            paths: self.paths,
            prefixes,
            errors: ErrorPages::new(self.errors),
            shutdown: ShutdownSignal::new(),
        })
    }

    fn fail(&mut self, error: RegistrationError) {
        self.error.get_or_insert(error);
    }
}

impl Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("paths", &self.paths.keys().collect::<Vec<_>>())
            .field("prefixes", &self.prefixes.keys().collect::<Vec<_>>())
            .field("errors", &self.errors.keys().collect::<Vec<_>>())
            .field("error", &self.error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use httpd_core::protocol::{ParseError, ResponseBody};
    use httpd_core::handler::RequestFailure;
    use http::StatusCode;

    fn text(body: &'static str) -> impl RequestHandler {
        handler_fn(move |_request: Arc<Request>, mut response: Response| async move {
            response.write(body)?;
            Ok::<_, HandlerError>(response)
        })
    }

    fn request(path: &str) -> Incoming {
        Incoming::Request(Request::builder().target(path).build().unwrap())
    }

    fn body_of(reply: Reply) -> (u16, String) {
        let Reply::Respond(response) = reply else { panic!("expected a response") };
        let body = match response.body() {
            ResponseBody::Buffer(buf) => String::from_utf8(buf.to_vec()).unwrap(),
            _ => String::new(),
        };
        (response.status(), body)
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::builder()
            .path("/exact", text("exact"))
            .prefix("/", text("root"))
            .prefix("/static/", text("static"))
            .prefix("/static/deep/", text("deep"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn exact_path_wins_over_prefixes() {
        let dispatcher = dispatcher();
        assert_eq!(body_of(dispatcher.call(request("/exact")).await), (200, "exact".to_string()));
        assert_eq!(body_of(dispatcher.call(request("/exact/more")).await), (200, "root".to_string()));
    }

    #[tokio::test]
    async fn longest_prefix_wins() {
        let dispatcher = dispatcher();
        assert_eq!(body_of(dispatcher.call(request("/static/a.css")).await).1, "static");
        assert_eq!(body_of(dispatcher.call(request("/static/deep/a.css")).await).1, "deep");
        assert_eq!(body_of(dispatcher.call(request("/static")).await).1, "root");
    }

    #[tokio::test]
    async fn unmatched_path_is_forbidden() {
        let dispatcher = Dispatcher::builder().path("/only", text("only")).build().unwrap();
        let (status, body) = body_of(dispatcher.call(request("/other")).await);
        assert_eq!(status, 403);
        assert!(body.contains("403 Forbidden"));
    }

    #[tokio::test]
    async fn http_errors_use_error_pages() {
        let missing = handler_fn(|_request: Arc<Request>, _response: Response| async {
            Err::<Response, _>(HandlerError::from(StatusCode::NOT_FOUND))
        });
        let custom_404 = handler_fn(|request: Arc<Request>, mut response: Response| async move {
            response.set_status(StatusCode::NOT_FOUND)?;
            response.write(format!("no {}", request.path()))?;
            Ok::<_, HandlerError>(response)
        });

        let dispatcher = Dispatcher::builder().prefix("/", missing).build().unwrap();
        let (status, body) = body_of(dispatcher.call(request("/gone")).await);
        assert_eq!(status, 404);
        assert!(body.contains("was not found"));
        assert!(!dispatcher.shutdown_signal().is_requested());

        let missing = handler_fn(|_request: Arc<Request>, _response: Response| async {
            Err::<Response, _>(HandlerError::from(StatusCode::NOT_FOUND))
        });
        let dispatcher = Dispatcher::builder().prefix("/", missing).error(404, custom_404).build().unwrap();
        assert_eq!(body_of(dispatcher.call(request("/gone")).await), (404, "no /gone".to_string()));
    }

    #[tokio::test]
    async fn fatal_errors_request_shutdown() {
        let broken = handler_fn(|_request: Arc<Request>, _response: Response| async {
            Err::<Response, _>(HandlerError::fatal("disk on fire"))
        });
        let dispatcher = Dispatcher::builder().path("/", broken).build().unwrap();

        let (status, _) = body_of(dispatcher.call(request("/")).await);
        assert_eq!(status, 500);
        assert!(dispatcher.shutdown_signal().is_requested());
    }

    #[tokio::test]
    async fn parse_failures_use_error_pages() {
        let dispatcher = dispatcher();
        let partial = Request::builder().target("/half").build().unwrap();
        let failure = RequestFailure::new(ParseError::MissingHost, partial);

        let (status, body) = body_of(dispatcher.call(Incoming::Failed(failure)).await);
        assert_eq!(status, 400);
        assert_eq!(body, "Bad request\n");
        assert!(!dispatcher.shutdown_signal().is_requested());

        let io = ParseError::io(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        let failure = RequestFailure::new(io, Request::default());
        let (status, _) = body_of(dispatcher.call(Incoming::Failed(failure)).await);
        assert_eq!(status, 500);
        assert!(dispatcher.shutdown_signal().is_requested());
    }

    #[test]
    fn invalid_registrations_are_reported() {
        let result = Dispatcher::builder().path("relative", text("x")).build();
        assert_eq!(result.unwrap_err(), RegistrationError::InvalidPath { path: "relative".into() });

        let result = Dispatcher::builder().prefix("/no-slash", text("x")).build();
        assert_eq!(result.unwrap_err(), RegistrationError::InvalidPrefix { prefix: "/no-slash".into() });

        let result = Dispatcher::builder().error(1000, text("x")).build();
        assert_eq!(result.unwrap_err(), RegistrationError::InvalidErrorCode { code: 1000 });

        // the first problem is the one reported
        let result = Dispatcher::builder().error(1000, text("x")).path("relative", text("x")).build();
        assert_eq!(result.unwrap_err(), RegistrationError::InvalidErrorCode { code: 1000 });
    }
}
