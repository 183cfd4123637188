//! reqctx core — the request-scoped store and its propagation.
//!
//! A [`Store`] is a small string map bound to one unit of work (typically an
//! inbound request). [`ContextStorage`] binds a store for the dynamic extent
//! of a future or closure so that any code running inside it can read the
//! store without having it passed as a parameter.
//!
//! Bindings survive `.await` suspension points. Tokio does not carry
//! task-locals into newly spawned tasks, so tasks that should inherit the
//! ambient store are started through [`ContextStorage::spawn`],
//! [`ContextStorage::spawn_blocking`] or wrapped with [`ContextStorage::bind`].

pub mod ids;
pub mod storage;
pub mod store;

pub use ids::IdGenerator;
pub use storage::{ContextStorage, Scoped};
pub use store::{REQUEST_ID_KEY, SESSION_ID_KEY, Store};
