//! The error page cascade.
//!
//! An error code is answered by its registered handler or, without one, its built-in page. If
//! that fails, or neither exists, the code's hundred class (`404` → `400`) is tried the same way
//! with a fresh response. After that comes `500`, and if even that fails the connection is
//! closed without a response.

use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use httpd_core::handler::Reply;
use httpd_core::protocol::{ErrorHook, HandlerError, Request, Response, ResponseError};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::dispatcher::defaults::builtin_page;
use crate::handler::RequestHandler;

const INTERNAL_ERROR: u16 = 500;

#[derive(Debug, Error)]
enum PageError {
    #[error("no error page for {code}")]
    Missing { code: u16 },

    #[error("error handler failed: {0}")]
    Handler(#[from] HandlerError),

    #[error("built-in error page failed: {0}")]
    Builtin(#[from] ResponseError),
}

pub(crate) struct ErrorPages {
    handlers: HashMap<u16, Arc<dyn RequestHandler>>,
}

impl ErrorPages {
    pub(crate) fn new(handlers: HashMap<u16, Arc<dyn RequestHandler>>) -> Self {
        Self { handlers }
    }

    /// Produces the error response for `code`, falling back as described in the module docs.
    pub(crate) async fn respond(&self, code: u16, request: Arc<Request>, hook: Option<ErrorHook>) -> Reply {
        if StatusCode::from_u16(code).is_err() {
            warn!(code, "requested error page for an invalid status code");
        }

        let mut response = Response::new();
        if let Some(hook) = hook
            && let Err(e) = hook(&mut response)
        {
            warn!(code, cause = %e, "failed to customize error response");
        }

        let mut internal_override_tried = false;
        let class = code - code % 100;

        let mut attempts = vec![(code, response)];
        if class != code {
            attempts.push((class, Response::new()));
        }

        for (attempt, response) in attempts {
            internal_override_tried |= attempt == INTERNAL_ERROR && self.handlers.contains_key(&INTERNAL_ERROR);
            match self.render(attempt, Arc::clone(&request), response).await {
                Ok(response) => return Reply::Respond(response),
                Err(e) => debug!(code = attempt, cause = %e, "error page unavailable, falling back"),
            }
        }

        let result = if internal_override_tried {
            Self::render_builtin(INTERNAL_ERROR, &request, Response::new())
        } else {
            self.render(INTERNAL_ERROR, Arc::clone(&request), Response::new()).await
        };

        match result {
            Ok(response) => Reply::Respond(response),
            Err(e) => {
                error!(code, cause = %e, "every error page failed, aborting the connection");
                Reply::Abort
            }
        }
    }

    async fn render(&self, code: u16, request: Arc<Request>, response: Response) -> Result<Response, PageError> {
        match self.handlers.get(&code) {
            Some(handler) => Ok(handler.handle(request, response).await?),
            None => Self::render_builtin(code, &request, response),
        }
    }

    fn render_builtin(code: u16, request: &Request, mut response: Response) -> Result<Response, PageError> {
        let page = builtin_page(code).ok_or(PageError::Missing { code })?;
        page(request, &mut response)?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request() -> Arc<Request> {
        Arc::new(Request::builder().target("/broken").build().unwrap())
    }

    fn failing() -> Arc<dyn RequestHandler> {
        Arc::new(handler_fn(|_request: Arc<Request>, _response: Response| async {
            Err::<Response, _>(HandlerError::fatal("error page is broken"))
        }))
    }

    fn page(status: u16, body: &'static str) -> Arc<dyn RequestHandler> {
        Arc::new(handler_fn(move |_request: Arc<Request>, mut response: Response| async move {
            response.set_status_line(response.version(), status, "Custom")?;
            response.write(body)?;
            Ok::<_, HandlerError>(response)
        }))
    }

    fn error_pages(entries: Vec<(u16, Arc<dyn RequestHandler>)>) -> ErrorPages {
        ErrorPages::new(entries.into_iter().collect())
    }

    fn status_of(reply: Reply) -> u16 {
        match reply {
            Reply::Respond(response) => response.status(),
            Reply::Abort => panic!("unexpected abort"),
        }
    }

    #[tokio::test]
    async fn exact_override_wins() {
        let pages = error_pages(vec![(404, page(404, "custom"))]);
        let reply = pages.respond(404, request(), None).await;
        let Reply::Respond(response) = reply else { panic!("expected a response") };
        assert_eq!(response.reason(), "Custom");
    }

    #[tokio::test]
    async fn builtin_is_used_without_override() {
        let pages = error_pages(vec![]);
        assert_eq!(status_of(pages.respond(416, request(), None).await), 416);
        assert_eq!(status_of(pages.respond(505, request(), None).await), 505);
    }

    #[tokio::test]
    async fn falls_back_to_class() {
        let pages = error_pages(vec![(404, failing())]);
        assert_eq!(status_of(pages.respond(404, request(), None).await), 400);

        // no page for 418, so its class answers
        let pages = error_pages(vec![]);
        assert_eq!(status_of(pages.respond(418, request(), None).await), 400);
    }

    #[tokio::test]
    async fn falls_back_to_internal_error() {
        let pages = error_pages(vec![(404, failing()), (400, failing())]);
        assert_eq!(status_of(pages.respond(404, request(), None).await), 500);

        // neither 302 nor 300 have pages
        let pages = error_pages(vec![]);
        assert_eq!(status_of(pages.respond(302, request(), None).await), 500);
    }

    #[tokio::test]
    async fn failing_internal_override_uses_builtin() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler: Arc<dyn RequestHandler> = Arc::new(handler_fn(move |_request: Arc<Request>, _response: Response| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<Response, _>(HandlerError::fatal("still broken")) }
        }));

        let pages = error_pages(vec![(500, handler)]);
        assert_eq!(status_of(pages.respond(500, request(), None).await), 500);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn internal_override_serves_other_failures() {
        let pages = error_pages(vec![(500, page(500, "custom 500")), (400, failing())]);
        let reply = pages.respond(400, request(), None).await;
        let Reply::Respond(response) = reply else { panic!("expected a response") };
        assert_eq!(response.status(), 500);
        assert_eq!(response.reason(), "Custom");
    }

    #[tokio::test]
    async fn hook_customizes_first_attempt_only() {
        let pages = error_pages(vec![]);
        let hook: ErrorHook = Box::new(|response: &mut Response| response.set_header("Content-Range", "bytes */10", false));
        let reply = pages.respond(416, request(), Some(hook)).await;
        let Reply::Respond(response) = reply else { panic!("expected a response") };
        assert_eq!(response.get_header("content-range").unwrap(), "bytes */10");

        let pages = error_pages(vec![(404, failing())]);
        let hook: ErrorHook = Box::new(|response: &mut Response| response.set_header("X-Hooked", "yes", false));
        let reply = pages.respond(404, request(), Some(hook)).await;
        let Reply::Respond(response) = reply else { panic!("expected a response") };
        assert_eq!(response.status(), 400);
        assert!(response.get_header("x-hooked").is_err());
    }
}
