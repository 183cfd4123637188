//! Context storage — binds a [`Store`] to the dynamic extent of a unit of work.
//!
//! The binding lives in a tokio task-local slot. A future wrapped by one of
//! the binding operations re-enters the slot every time it is polled, so the
//! store stays visible across every `.await` inside it, and two wrapped
//! futures interleaved on the same worker thread each see only their own
//! store. Outside any binding the slot is unset and reads yield `None`.

use std::fmt;
use std::future::Future;

use tokio::task::JoinHandle;
use tokio::task::futures::TaskLocalFuture;
use tracing::trace;

use crate::ids::{self, IdGenerator};
use crate::store::{REQUEST_ID_KEY, SESSION_ID_KEY, Store};

tokio::task_local! {
    static CURRENT: Option<Store>;
}

/// A future running with a store binding in place.
pub type Scoped<F> = TaskLocalFuture<Option<Store>, F>;

/// Process-wide propagation authority for request stores.
///
/// Create one at startup and hand clones of it to whatever needs to bind or
/// read the ambient store. It owns no resources, so there is nothing to shut
/// down.
#[derive(Clone)]
pub struct ContextStorage {
    id_generator: IdGenerator,
}

impl ContextStorage {
    /// Storage whose default-store policy fills in UUID v4 identifiers.
    pub fn create() -> Self {
        Self {
            id_generator: ids::default_generator(),
        }
    }

    /// Storage with a custom identifier source for the default-store policy.
    pub fn with_id_generator<G>(generator: G) -> Self
    where
        G: Fn() -> String + Send + Sync + 'static,
    {
        Self {
            id_generator: std::sync::Arc::new(generator),
        }
    }

    pub fn generate_id(&self) -> String {
        (self.id_generator)()
    }

    /// Run `fut` with `store` as the ambient store.
    ///
    /// An empty `store` is first given fresh `sessionId` and `requestId`
    /// entries. Use [`scope`](Self::scope) to bind a store exactly as given.
    pub fn run_with_store<F: Future>(&self, store: Store, fut: F) -> Scoped<F> {
        self.scope(self.with_default_ids(store), fut)
    }

    /// Synchronous counterpart of [`run_with_store`](Self::run_with_store).
    pub fn sync_run_with_store<R>(&self, store: Store, f: impl FnOnce() -> R) -> R {
        self.sync_scope(self.with_default_ids(store), f)
    }

    /// The store bound to the innermost enclosing scope, if any.
    pub fn get_store(&self) -> Option<Store> {
        CURRENT.try_with(Option::clone).ok().flatten()
    }

    /// Run `fut` with the ambient store extended by `{key: value}`.
    ///
    /// The ambient store is read when this is called, not when `fut` is first
    /// polled. Outside any scope the merge starts from an empty store. The
    /// store seen by the caller is left untouched.
    pub fn update_and_run_store<F: Future>(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        fut: F,
    ) -> Scoped<F> {
        self.scope(self.merged(key.into(), value.into()), fut)
    }

    /// Synchronous counterpart of [`update_and_run_store`](Self::update_and_run_store).
    pub fn sync_update_and_run_store<R>(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        f: impl FnOnce() -> R,
    ) -> R {
        self.sync_scope(self.merged(key.into(), value.into()), f)
    }

    /// Bind `store` for `fut` as-is.
    pub fn scope<F: Future>(&self, store: Store, fut: F) -> Scoped<F> {
        trace!(keys = store.len(), "binding store");
        CURRENT.scope(Some(store), fut)
    }

    /// Bind `store` for the duration of `f` as-is.
    pub fn sync_scope<R>(&self, store: Store, f: impl FnOnce() -> R) -> R {
        CURRENT.sync_scope(Some(store), f)
    }

    /// Carry the current binding (or its absence) into `fut`.
    ///
    /// Needed for any future that will be polled outside the current task.
    pub fn bind<F: Future>(&self, fut: F) -> Scoped<F> {
        CURRENT.scope(self.get_store(), fut)
    }

    /// `tokio::spawn` that inherits the ambient store.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(self.bind(fut))
    }

    /// `tokio::task::spawn_blocking` that inherits the ambient store.
    pub fn spawn_blocking<F, R>(&self, f: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let store = self.get_store();
        tokio::task::spawn_blocking(move || CURRENT.sync_scope(store, f))
    }

    fn with_default_ids(&self, mut store: Store) -> Store {
        if store.is_empty() {
            store.insert(SESSION_ID_KEY, self.generate_id());
            store.insert(REQUEST_ID_KEY, self.generate_id());
            trace!(
                session_id = store.session_id(),
                request_id = store.request_id(),
                "populated default store"
            );
        }
        store
    }

    fn merged(&self, key: String, value: String) -> Store {
        self.get_store().unwrap_or_default().with(key, value)
    }
}

impl Default for ContextStorage {
    fn default() -> Self {
        Self::create()
    }
}

impl fmt::Debug for ContextStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextStorage").finish_non_exhaustive()
    }
}
