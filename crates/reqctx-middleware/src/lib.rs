//! reqctx middleware — the per-request entry hook.
//!
//! [`async_local_storage_middleware`] returns a [`MiddlewareFactory`];
//! configuring it yields a [`ContextMiddleware`], which builds a store for
//! each inbound request (from its headers, if asked to) and runs the rest of
//! the pipeline with that store bound.

pub mod config;
pub mod error;
pub mod headers;
pub mod middleware;

pub use config::{MiddlewareConfig, RequestIdFactory};
pub use error::ConfigError;
pub use headers::HeaderSource;
pub use middleware::{ContextMiddleware, MiddlewareFactory, async_local_storage_middleware};
