use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use httpd_core::protocol::{HandlerError, Request, Response};

/// Produces the response for a request.
///
/// A handler receives the request and a fresh [`Response`] and hands the response back once it
/// is filled in. Returning an error discards that response; the dispatcher builds a new one
/// and answers with an error page instead, see [`HandlerError`].
///
/// Error page handlers registered with [`crate::DispatcherBuilder::error`] implement the same
/// trait. They may receive a request that was only partially parsed.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: Arc<Request>, response: Response) -> Result<Response, HandlerError>;
}

#[async_trait]
impl<H: RequestHandler + ?Sized> RequestHandler for Arc<H> {
    async fn handle(&self, request: Arc<Request>, response: Response) -> Result<Response, HandlerError> {
        (**self).handle(request, response).await
    }
}

/// a [`RequestHandler`] backed by an async fn or closure
#[derive(Debug)]
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(Arc<Request>, Response) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, HandlerError>> + Send,
{
    async fn handle(&self, request: Arc<Request>, response: Response) -> Result<Response, HandlerError> {
        (self.f)(request, response).await
    }
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Arc<Request>, Response) -> Fut,
    Fut: Future<Output = Result<Response, HandlerError>>,
{
    FnHandler { f }
}
