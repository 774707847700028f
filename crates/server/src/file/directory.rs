use std::sync::Arc;

use async_trait::async_trait;
use httpd_core::protocol::{HandlerError, Request, Response};

use crate::file::{FileResolver, write_file_response};
use crate::handler::RequestHandler;

const INDEX_FILE: &str = "index.html";

/// Serves the files of a [`FileResolver`] under a path prefix.
///
/// The prefix is stripped from the request path before the lookup, and paths naming a
/// directory (empty or ending with `/`) are served their `index.html`.
#[derive(Debug)]
pub struct DirectoryHandler<R> {
    prefix: String,
    resolver: R,
}

impl<R: FileResolver> DirectoryHandler<R> {
    pub fn new(prefix: impl Into<String>, resolver: R) -> Self {
        Self { prefix: prefix.into(), resolver }
    }

    fn local_path(&self, path: &str) -> String {
        let relative = path.strip_prefix(self.prefix.as_str()).unwrap_or(path);
        if relative.is_empty() || relative.ends_with('/') {
            format!("{relative}{INDEX_FILE}")
        } else {
            relative.to_string()
        }
    }
}

#[async_trait]
impl<R: FileResolver> RequestHandler for DirectoryHandler<R> {
    async fn handle(&self, request: Arc<Request>, response: Response) -> Result<Response, HandlerError> {
        let local_path = self.local_path(request.path());
        write_file_response(&request, response, &self.resolver, &local_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{MockFileResolver, ResolveError};
    use http::StatusCode;

    fn directory(expected: &'static str) -> DirectoryHandler<MockFileResolver> {
        let mut resolver = MockFileResolver::new();
        resolver
            .expect_resolve()
            .withf(move |path| path == expected)
            .times(1)
            .returning(|path| Err(ResolveError::not_found(path)));
        DirectoryHandler::new("/static/", resolver)
    }

    async fn call(handler: &DirectoryHandler<MockFileResolver>, path: &str) -> Result<Response, HandlerError> {
        let request = Arc::new(Request::builder().target(path).build().unwrap());
        handler.handle(request, Response::new()).await
    }

    #[tokio::test]
    async fn strips_prefix() {
        let handler = directory("css/site.css");
        let result = call(&handler, "/static/css/site.css").await;
        assert!(matches!(result, Err(HandlerError::Http(e)) if e.status() == StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn directories_serve_their_index() {
        let handler = directory("index.html");
        assert!(matches!(call(&handler, "/static/").await, Err(HandlerError::Http(_))));

        let handler = directory("docs/index.html");
        assert!(matches!(call(&handler, "/static/docs/").await, Err(HandlerError::Http(_))));
    }
}
