//! In-process connection pool.
//!
//! Behaves like a small bounded pool of real connections: each slot keeps its
//! own session parameters across checkouts, so a value that is not cleared
//! before release is visible to the next borrower. Used by tests and by the
//! in-memory document store.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::SECURITY_TARGET;
use crate::error::SessionError;
use crate::pool::{ConnectionPool, SessionConnection};

/// Failure modes that can be armed on a `MemoryPool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFault {
    /// Next checkout fails.
    FailCheckout,
    /// Next `set_session_value` returns an error.
    FailSet,
    /// Next `set_session_value` reports success without storing anything.
    IgnoreSet,
    /// Next `clear_session_value` returns an error.
    FailClear,
    /// Next `session_value` returns an error.
    FailRead,
}

/// Counters kept by `MemoryPool`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryPoolStats {
    pub opened: u64,
    pub checkouts: u64,
    pub released: u64,
    pub discarded: u64,
    /// Releases of a connection that still carried session values.
    pub leaked_releases: u64,
}

#[derive(Debug)]
struct Slot {
    id: u64,
    session: HashMap<String, String>,
}

struct Shared {
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<Slot>>,
    faults: Mutex<Vec<SessionFault>>,
    stats: Mutex<MemoryPoolStats>,
    next_id: AtomicU64,
}

impl Shared {
    fn take_fault(&self, fault: SessionFault) -> bool {
        let mut faults = self.faults.lock();
        if let Some(pos) = faults.iter().position(|f| *f == fault) {
            faults.remove(pos);
            true
        } else {
            false
        }
    }
}

/// Bounded pool of in-memory connections.
#[derive(Clone)]
pub struct MemoryPool {
    shared: Arc<Shared>,
}

impl MemoryPool {
    #[must_use]
    pub fn new(max_connections: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                permits: Arc::new(Semaphore::new(max_connections.max(1))),
                idle: Mutex::new(VecDeque::new()),
                faults: Mutex::new(Vec::new()),
                stats: Mutex::new(MemoryPoolStats::default()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Arm a one-shot fault. Faults of the same kind queue up.
    pub fn inject(&self, fault: SessionFault) {
        self.shared.faults.lock().push(fault);
    }

    #[must_use]
    pub fn stats(&self) -> MemoryPoolStats {
        *self.shared.stats.lock()
    }

    /// Number of connections currently idle in the pool.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.shared.idle.lock().len()
    }

    /// Session values currently held by idle connections, by connection id.
    #[must_use]
    pub fn idle_sessions(&self) -> Vec<(u64, HashMap<String, String>)> {
        self.shared
            .idle
            .lock()
            .iter()
            .map(|slot| (slot.id, slot.session.clone()))
            .collect()
    }
}

/// A connection checked out of a `MemoryPool`.
pub struct MemoryConnection {
    slot: Slot,
    _permit: OwnedSemaphorePermit,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnection")
            .field("id", &self.slot.id)
            .field("session", &self.slot.session)
            .finish_non_exhaustive()
    }
}

impl MemoryConnection {
    /// Stable identity of the underlying slot, shared across checkouts.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.slot.id
    }

    /// Synchronous view of a session value, for stores built on this pool.
    #[must_use]
    pub fn current_value(&self, key: &str) -> Option<&str> {
        self.slot
            .session
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[async_trait]
impl SessionConnection for MemoryConnection {
    async fn set_session_value(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        if self.shared.take_fault(SessionFault::FailSet) {
            return Err(SessionError::bind(key, "injected failure"));
        }
        if self.shared.take_fault(SessionFault::IgnoreSet) {
            return Ok(());
        }
        self.slot.session.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn clear_session_value(&mut self, key: &str) -> Result<(), SessionError> {
        if self.shared.take_fault(SessionFault::FailClear) {
            return Err(SessionError::clear(key, "injected failure"));
        }
        self.slot.session.remove(key);
        Ok(())
    }

    async fn session_value(&mut self, key: &str) -> Result<Option<String>, SessionError> {
        if self.shared.take_fault(SessionFault::FailRead) {
            return Err(SessionError::read(key, "injected failure"));
        }
        Ok(self.current_value(key).map(str::to_owned))
    }
}

#[async_trait]
impl ConnectionPool for MemoryPool {
    type Connection = MemoryConnection;

    async fn checkout(&self) -> Result<MemoryConnection, SessionError> {
        if self.shared.take_fault(SessionFault::FailCheckout) {
            return Err(SessionError::Checkout("injected failure".to_owned()));
        }

        let permit = Arc::clone(&self.shared.permits)
            .acquire_owned()
            .await
            .map_err(|e| SessionError::Checkout(e.to_string()))?;

        let reused = self.shared.idle.lock().pop_front();
        let slot = if let Some(slot) = reused {
            slot
        } else {
            self.shared.stats.lock().opened += 1;
            Slot {
                id: self.shared.next_id.fetch_add(1, Ordering::Relaxed),
                session: HashMap::new(),
            }
        };
        self.shared.stats.lock().checkouts += 1;

        Ok(MemoryConnection {
            slot,
            _permit: permit,
            shared: Arc::clone(&self.shared),
        })
    }

    fn release(&self, conn: MemoryConnection) {
        let MemoryConnection { slot, _permit, .. } = conn;
        {
            let mut stats = self.shared.stats.lock();
            stats.released += 1;
            if slot.session.values().any(|v| !v.is_empty()) {
                stats.leaked_releases += 1;
                tracing::error!(
                    target: SECURITY_TARGET,
                    connection_id = slot.id,
                    "connection released while still carrying session values"
                );
            }
        }
        self.shared.idle.lock().push_back(slot);
    }

    fn discard(&self, conn: MemoryConnection) {
        tracing::debug!(connection_id = conn.slot.id, "discarding connection");
        self.shared.stats.lock().discarded += 1;
        drop(conn);
    }
}
