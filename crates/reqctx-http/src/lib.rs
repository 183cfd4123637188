//! reqctx HTTP integration
//!
//! Mounts the context middleware on a tower/axum stack:
//! - [`ContextLayer`] wraps any `http::Request` service with the entry hook
//! - [`ContextServer`] is a small axum server with the layer mounted,
//!   exposing the ambient store of each request for inspection
//!
//! The server lifecycle (start on a possibly OS-assigned port, graceful stop)
//! follows the usual transport-server shape.

pub mod error;
pub mod layer;
pub mod server;

pub use error::ServerError;
pub use layer::{ContextLayer, ContextService};
pub use server::{ContextServer, ServerConfig};
