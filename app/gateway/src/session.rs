//! Session routing.
//!
//! The router maps session ids to long-lived protocol handlers. A request
//! without a known id gets a brand new handler that is not yet in the
//! table. The handler decides its own id on first contact through its
//! [`SessionInit`], which registers it with a single atomic
//! insert-if-absent. The router never pre-assigns ids, so two concurrent
//! first contacts can never end up sharing one.

use dashmap::{DashMap, mapref::entry::Entry};
use parking_lot::Mutex;
use std::{
    sync::{Arc, Weak},
    time::Duration,
};
use thiserror::Error;
use tokio::time::Instant;

/// Attempts made to find an unused id before giving up.
const MAX_ID_ATTEMPTS: usize = 8;

/// Produces session ids.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random UUID v4 ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// A session could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no unused session id after {0} attempts")]
    Exhausted(usize),
    #[error("session router has shut down")]
    Closed,
}

struct Slot<H> {
    handler: Arc<H>,
    last_seen: Mutex<Instant>,
}

impl<H> Slot<H> {
    fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            last_seen: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }
}

type Table<H> = DashMap<String, Slot<H>>;

/// Registration hook handed to every new handler.
///
/// The handler calls [`SessionInit::finalize`] when it first handles a
/// request. That picks the id and registers the handler exactly once.
pub struct SessionInit<H> {
    handler: Weak<H>,
    table: Weak<Table<H>>,
    ids: Arc<dyn IdGenerator>,
    id: Mutex<Option<String>>,
}

impl<H> SessionInit<H> {
    /// The finalized id, if any.
    pub fn id(&self) -> Option<String> {
        self.id.lock().clone()
    }

    /// Pick an id and register the handler under it. Later calls return
    /// the same id without touching the table.
    pub fn finalize(&self) -> Result<String, SessionError> {
        let mut slot = self.id.lock();
        if let Some(id) = slot.as_ref() {
            return Ok(id.clone());
        }

        let table = self.table.upgrade().ok_or(SessionError::Closed)?;
        let handler = self.handler.upgrade().ok_or(SessionError::Closed)?;
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.generate();
            match table.entry(id.clone()) {
                Entry::Vacant(vacant) => {
                    vacant.insert(Slot::new(handler));
                    tracing::info!("registered session {id}");
                    *slot = Some(id.clone());
                    return Ok(id);
                }
                Entry::Occupied(_) => {
                    tracing::warn!("session id {id} already taken, generating another");
                }
            }
        }
        Err(SessionError::Exhausted(MAX_ID_ATTEMPTS))
    }
}

/// A handler picked for one request.
pub struct Routed<H> {
    pub handler: Arc<H>,
    /// Whether the handler was created for this request.
    pub created: bool,
}

/// Process-wide session table.
pub struct SessionRouter<H> {
    table: Arc<Table<H>>,
    ids: Arc<dyn IdGenerator>,
    idle_timeout: Option<Duration>,
}

impl<H: Send + Sync + 'static> SessionRouter<H> {
    pub fn new(ids: Arc<dyn IdGenerator>, idle_timeout: Option<Duration>) -> Self {
        Self {
            table: Arc::new(DashMap::new()),
            ids,
            idle_timeout,
        }
    }

    /// The handler registered under `session_id`, or a new unregistered
    /// one built by `create` when the id is absent or unknown.
    pub fn route_for(
        &self,
        session_id: Option<&str>,
        create: impl FnOnce(SessionInit<H>) -> H,
    ) -> Routed<H> {
        if let Some(id) = session_id
            && let Some(handler) = self.get(id)
        {
            return Routed {
                handler,
                created: false,
            };
        }

        if let Some(id) = session_id {
            tracing::debug!("unknown session {id}, starting a new one");
        }
        let handler = Arc::new_cyclic(|weak| {
            create(SessionInit {
                handler: weak.clone(),
                table: Arc::downgrade(&self.table),
                ids: Arc::clone(&self.ids),
                id: Mutex::new(None),
            })
        });
        Routed {
            handler,
            created: true,
        }
    }

    /// Look up a registered handler and mark it as seen.
    pub fn get(&self, session_id: &str) -> Option<Arc<H>> {
        let slot = self.table.get(session_id)?;
        slot.touch();
        Some(Arc::clone(&slot.handler))
    }

    /// Unregister a session, returning its handler.
    pub fn remove(&self, session_id: &str) -> Option<Arc<H>> {
        self.table
            .remove(session_id)
            .map(|(_, slot)| slot.handler)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.table.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Drop every session.
    pub fn clear(&self) {
        self.table.clear();
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    /// Remove sessions idle for longer than the configured timeout.
    /// Returns how many were removed.
    pub fn evict_idle(&self) -> usize {
        let Some(timeout) = self.idle_timeout else {
            return 0;
        };

        let now = Instant::now();
        let mut evicted = 0;
        self.table.retain(|id, slot| {
            let keep = now.saturating_duration_since(*slot.last_seen.lock()) < timeout;
            if !keep {
                tracing::info!("evicting idle session {id}");
                evicted += 1;
            }
            keep
        });
        evicted
    }
}

impl<H: Send + Sync + 'static> Default for SessionRouter<H> {
    fn default() -> Self {
        Self::new(Arc::new(UuidGenerator), None)
    }
}
