//! The seam between a connection and the code producing responses.
//!
//! A connection hands its [`Handler`] exactly one [`Incoming`] value: the request, or the
//! reason it could not be read together with whatever part of it was parsed. The handler
//! answers with a [`Reply`].

use std::future::Future;

use async_trait::async_trait;
use http::StatusCode;

use crate::protocol::{ParseError, Request, Response};

#[derive(Debug)]
pub enum Incoming {
    Request(Request),
    Failed(RequestFailure),
}

/// A request that could not be read.
#[derive(Debug)]
pub struct RequestFailure {
    error: ParseError,
    request: Request,
}

impl RequestFailure {
    pub fn new(error: ParseError, request: Request) -> Self {
        Self { error, request }
    }

    pub fn error(&self) -> &ParseError {
        &self.error
    }

    /// The request as far as it was parsed.
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn into_request(self) -> Request {
        self.request
    }

    pub fn status(&self) -> StatusCode {
        self.error.status()
    }

    pub fn is_fatal(&self) -> bool {
        self.error.is_fatal()
    }
}

#[derive(Debug)]
pub enum Reply {
    Respond(Response),
    /// Close the connection without writing anything.
    Abort,
}

#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, incoming: Incoming) -> Reply;
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Incoming) -> Fut + Send + Sync,
    Fut: Future<Output = Reply> + Send,
{
    async fn call(&self, incoming: Incoming) -> Reply {
        (self.f)(incoming).await
    }
}

pub fn make_handler<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Incoming) -> Fut,
    Fut: Future<Output = Reply>,
{
    HandlerFn { f }
}
