//! Tower layer running each request through the context middleware.

use std::task::{Context, Poll};

use http::Request;
use reqctx_core::Scoped;
use reqctx_middleware::ContextMiddleware;
use tower::{Layer, Service};
use tracing::instrument::Instrumented;

#[derive(Debug, Clone)]
pub struct ContextLayer {
    middleware: ContextMiddleware,
}

impl ContextLayer {
    pub fn new(middleware: ContextMiddleware) -> Self {
        Self { middleware }
    }
}

impl<S> Layer<S> for ContextLayer {
    type Service = ContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ContextService {
            inner,
            middleware: self.middleware.clone(),
        }
    }
}

/// Service produced by [`ContextLayer`].
///
/// The inner service is called inside the request's store binding, and its
/// response future is driven inside the same binding.
#[derive(Debug, Clone)]
pub struct ContextService<S> {
    inner: S,
    middleware: ContextMiddleware,
}

impl<S, B> Service<Request<B>> for ContextService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Instrumented<Scoped<S::Future>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let store = self.middleware.build_store(&request);
        let inner = &mut self.inner;
        self.middleware.enter(store, move || inner.call(request))
    }
}
