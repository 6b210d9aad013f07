//! Session cache: the current visitor's identity, fetched once per generation.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every render asks the cache for a `SessionState`; the auth gate turns it
//! into a decision. The login controller is the only writer, and it writes
//! by invalidating.
//!
//! DESIGN
//! ======
//! The cache owns a generation counter. Each fetch is tagged with the
//! generation that started it, and a result is committed only if that
//! generation is still current and the cache has not been disposed. Every
//! other result is logged and dropped.
//!
//! The in-flight fetch is a `Shared` future: all readers during one
//! generation await the same request, so one generation costs one network
//! call no matter how many consumers ask.
//!
//! ERROR HANDLING
//! ==============
//! A failed lookup of any kind settles as "no identity". Nothing in here
//! returns an error to the caller.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::net::api::AuthApi;
use crate::net::types::Identity;

type FetchOutcome = Result<Arc<Identity>, FetchError>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchStatus {
    Pending,
    Settled,
}

/// Snapshot of the cache as seen by a consumer.
///
/// `Pending` always comes with no identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    pub identity: Option<Arc<Identity>>,
    pub fetch_status: FetchStatus,
    /// Cache epoch when the snapshot was taken.
    pub generation: u64,
}

impl SessionState {
    fn pending(generation: u64) -> Self {
        Self { identity: None, fetch_status: FetchStatus::Pending, generation }
    }

    fn settled(generation: u64, identity: Option<Arc<Identity>>) -> Self {
        Self { identity, fetch_status: FetchStatus::Settled, generation }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

enum Slot {
    /// Nothing requested for this generation yet.
    Empty,
    Pending(SharedFetch),
    Settled(Option<Arc<Identity>>),
    /// Background refetch; `current` stays visible until it lands.
    Revalidating { current: Option<Arc<Identity>>, fetch: SharedFetch },
}

struct Inner {
    generation: u64,
    slot: Slot,
    disposed: bool,
}

impl Inner {
    fn snapshot(&self) -> SessionState {
        match &self.slot {
            Slot::Empty | Slot::Pending(_) => SessionState::pending(self.generation),
            Slot::Settled(identity) | Slot::Revalidating { current: identity, .. } => {
                SessionState::settled(self.generation, identity.clone())
            }
        }
    }

    fn in_flight(&self) -> Option<SharedFetch> {
        match &self.slot {
            Slot::Pending(fetch) | Slot::Revalidating { fetch, .. } => Some(fetch.clone()),
            Slot::Empty | Slot::Settled(_) => None,
        }
    }
}

struct CacheShared {
    api: Arc<dyn AuthApi>,
    inner: Mutex<Inner>,
    changes: watch::Sender<SessionState>,
}

/// Shared handle to the session cache. Clones point at the same cache.
#[derive(Clone)]
pub struct SessionCache {
    shared: Arc<CacheShared>,
}

impl SessionCache {
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        let inner = Inner { generation: 0, slot: Slot::Empty, disposed: false };
        let (changes, _) = watch::channel(inner.snapshot());
        Self { shared: Arc::new(CacheShared { api, inner: Mutex::new(inner), changes }) }
    }

    /// Current state. Starts the lookup if this generation has none yet.
    ///
    /// Never blocks; a started lookup completes on the ambient tokio runtime
    /// and is announced through [`SessionCache::subscribe`].
    pub fn get(&self) -> SessionState {
        let mut inner = self.lock();
        if matches!(inner.slot, Slot::Empty) && !inner.disposed {
            let fetch = self.spawn_fetch(inner.generation);
            inner.slot = Slot::Pending(fetch);
        }
        inner.snapshot()
    }

    /// Current state without starting a lookup.
    #[must_use]
    pub fn peek(&self) -> SessionState {
        self.lock().snapshot()
    }

    /// Wait until the newest generation has settled and return that state.
    ///
    /// Joins the in-flight lookup instead of issuing a new one. If the cache is
    /// invalidated while waiting, waits for the newer generation instead.
    pub async fn resolve(&self) -> SessionState {
        loop {
            let (generation, fetch) = {
                let mut inner = self.lock();
                if inner.disposed {
                    return inner.snapshot();
                }
                if matches!(inner.slot, Slot::Settled(_)) {
                    return inner.snapshot();
                }
                let fetch = if let Some(fetch) = inner.in_flight() {
                    fetch
                } else {
                    let fetch = self.spawn_fetch(inner.generation);
                    inner.slot = Slot::Pending(fetch.clone());
                    fetch
                };
                (inner.generation, fetch)
            };
            let outcome = fetch.await;
            self.settle(generation, outcome);
        }
    }

    /// Drop the cached identity and refetch under a new generation.
    ///
    /// Consumers see `Pending` until the new lookup settles; results from
    /// older generations are discarded.
    pub fn invalidate(&self) {
        let state = {
            let mut inner = self.lock();
            if inner.disposed {
                return;
            }
            inner.generation += 1;
            info!(generation = inner.generation, "session invalidated");
            let fetch = self.spawn_fetch(inner.generation);
            inner.slot = Slot::Pending(fetch);
            inner.snapshot()
        };
        self.shared.changes.send_replace(state);
    }

    /// Refetch in the background, keeping the current identity visible.
    ///
    /// Used for refocus and reconnect. A lookup already in flight is left to
    /// finish instead.
    pub fn revalidate(&self) {
        let mut inner = self.lock();
        if inner.disposed {
            return;
        }
        let current = match &inner.slot {
            Slot::Settled(identity) => Some(identity.clone()),
            Slot::Pending(_) | Slot::Revalidating { .. } => return,
            Slot::Empty => None,
        };
        let Some(current) = current else {
            let fetch = self.spawn_fetch(inner.generation);
            inner.slot = Slot::Pending(fetch);
            return;
        };
        inner.generation += 1;
        debug!(generation = inner.generation, "session revalidating");
        let fetch = self.spawn_fetch(inner.generation);
        inner.slot = Slot::Revalidating { current, fetch };
    }

    /// Stop accepting results. Lookups that settle afterwards are dropped.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        if !inner.disposed {
            inner.disposed = true;
            debug!(generation = inner.generation, "session cache disposed");
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Receive every visible state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.changes.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Build the shared lookup for `generation` and drive it on the runtime.
    fn spawn_fetch(&self, generation: u64) -> SharedFetch {
        let api = Arc::clone(&self.shared.api);
        let fetch = async move { api.fetch_me().await.map(Arc::new) }
            .boxed()
            .shared();
        debug!(generation, "session fetch started");

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let cache: Weak<CacheShared> = Arc::downgrade(&self.shared);
                let driver = fetch.clone();
                handle.spawn(async move {
                    let outcome = driver.await;
                    if let Some(shared) = cache.upgrade() {
                        Self { shared }.settle(generation, outcome);
                    }
                });
            }
            Err(_) => warn!(generation, "no async runtime; session fetch waits for resolve()"),
        }
        fetch
    }

    fn settle(&self, generation: u64, outcome: FetchOutcome) {
        let state = {
            let mut inner = self.lock();
            if inner.disposed {
                debug!(generation, "session cache disposed; discarding fetch result");
                return;
            }
            if inner.generation != generation {
                debug!(generation, current = inner.generation, "discarding stale session fetch");
                return;
            }
            if matches!(inner.slot, Slot::Settled(_)) {
                return;
            }
            let identity = match outcome {
                Ok(identity) => Some(identity),
                Err(error) => {
                    debug!(generation, %error, "session lookup returned no identity");
                    None
                }
            };
            debug!(generation, authenticated = identity.is_some(), "session fetch settled");
            inner.slot = Slot::Settled(identity);
            inner.snapshot()
        };
        self.shared.changes.send_replace(state);
    }
}
