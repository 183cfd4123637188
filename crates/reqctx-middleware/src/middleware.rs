//! Request entry hook.
//!
//! Registration is two-staged: [`async_local_storage_middleware`] is called
//! once with the process's [`ContextStorage`], and the returned factory is
//! configured per mount point.

use std::future::Future;
use std::sync::Arc;

use reqctx_core::{ContextStorage, Scoped, Store};
use tracing::instrument::Instrumented;
use tracing::{Instrument, debug, info_span, warn};

use crate::config::MiddlewareConfig;
use crate::error::ConfigError;
use crate::headers::HeaderSource;

/// Stage one: bind the middleware to the process's storage.
pub fn async_local_storage_middleware(storage: ContextStorage) -> MiddlewareFactory {
    MiddlewareFactory { storage }
}

/// Produces configured entry hooks.
#[derive(Debug, Clone)]
pub struct MiddlewareFactory {
    storage: ContextStorage,
}

impl MiddlewareFactory {
    /// Stage two: build the entry hook for one mount point.
    ///
    /// A header name that is not a legal HTTP field name can never match, so
    /// its key is always synthesized. That is logged, not rejected; use
    /// [`try_configure`](Self::try_configure) to reject it instead.
    pub fn configure(&self, config: MiddlewareConfig) -> ContextMiddleware {
        if let Err(e) = config.validate() {
            warn!("{e}; every request will get a synthesized value for this key");
        }
        debug!(
            use_headers = config.use_headers,
            keys = ?config.header_names.keys().collect::<Vec<_>>(),
            "Configured context middleware"
        );
        ContextMiddleware {
            storage: self.storage.clone(),
            config: Arc::new(config),
        }
    }

    /// Like [`configure`](Self::configure), but fails on an invalid header name.
    pub fn try_configure(
        &self,
        config: MiddlewareConfig,
    ) -> Result<ContextMiddleware, ConfigError> {
        config.validate()?;
        Ok(self.configure(config))
    }
}

/// The per-request entry hook.
#[derive(Debug, Clone)]
pub struct ContextMiddleware {
    storage: ContextStorage,
    config: Arc<MiddlewareConfig>,
}

impl ContextMiddleware {
    pub fn config(&self) -> &MiddlewareConfig {
        &self.config
    }

    /// Build the initial store for `request`.
    ///
    /// Empty unless `use_headers` is set. Otherwise every configured key is
    /// filled from its header, or from the id factory when the header is
    /// missing or empty.
    pub fn build_store(&self, request: &dyn HeaderSource) -> Store {
        let mut store = Store::new();
        if !self.config.use_headers {
            return store;
        }

        for (key, header) in &self.config.header_names {
            let value = match request.header(header) {
                Some(value) if !value.is_empty() => value.into_owned(),
                _ => {
                    debug!(key = %key, header = %header, "Header absent, synthesizing id");
                    (self.config.request_id_factory)(request)
                }
            };
            store.insert(key.clone(), value);
        }
        store
    }

    /// Handle one request: build its store and run `proceed` inside it.
    pub fn handle<P, Fut>(
        &self,
        request: &dyn HeaderSource,
        proceed: P,
    ) -> Instrumented<Scoped<Fut>>
    where
        P: FnOnce() -> Fut,
        Fut: Future,
    {
        let store = self.build_store(request);
        self.enter(store, proceed)
    }

    /// Bind `store` and hand control to the next stage.
    ///
    /// `proceed` is called exactly once, synchronously, with the store
    /// already bound, and the future it returns is driven inside the same
    /// binding. The store is bound as given; an empty store stays empty.
    pub fn enter<P, Fut>(&self, store: Store, proceed: P) -> Instrumented<Scoped<Fut>>
    where
        P: FnOnce() -> Fut,
        Fut: Future,
    {
        let span = info_span!(
            "request",
            request_id = store.request_id(),
            session_id = store.session_id()
        );
        let next = {
            let _entered = span.enter();
            self.storage.sync_scope(store.clone(), proceed)
        };
        self.storage.scope(store, next).instrument(span)
    }
}
