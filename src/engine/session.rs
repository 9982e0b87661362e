//! Per-session query storage
//!
//! Each session id maps to one slot holding at most one
//! [`ProgressiveQuery`]. A slot's async mutex is held for the whole of a
//! `start` or `refine`, including the block fetch, so calls against the
//! same session run one at a time and never interleave a merge. Different
//! sessions proceed independently.
//!
//! The map lock is only taken briefly and never across an await. Slots
//! are handed out as leases; a leased slot is never evicted, so a request
//! that looked its slot up cannot lose it before taking the slot lock.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::errors::{EngineError, EngineResult};
use super::estimate::Estimate;
use super::query::{ProgressiveQuery, QueryEngine};
use crate::observability::{log_event_with_fields, Event};

/// Session used when the caller does not name one
pub const DEFAULT_SESSION: &str = "default";

const MAX_SESSION_ID_LEN: usize = 64;

/// Session capacity and expiry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound on live sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Sessions untouched for this long are dropped
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
}

fn default_max_sessions() -> usize {
    64
}

fn default_idle_ttl_secs() -> u64 {
    1800
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            idle_ttl_secs: default_idle_ttl_secs(),
        }
    }
}

struct SessionSlot {
    query: Mutex<Option<ProgressiveQuery>>,
    last_used_ms: AtomicI64,
    leases: AtomicUsize,
}

impl SessionSlot {
    fn new() -> Self {
        Self {
            query: Mutex::new(None),
            last_used_ms: AtomicI64::new(Utc::now().timestamp_millis()),
            leases: AtomicUsize::new(0),
        }
    }

    fn touch(&self) {
        self.last_used_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn last_used(&self) -> i64 {
        self.last_used_ms.load(Ordering::Relaxed)
    }

    /// Idle means no request holds a lease on the slot
    fn is_idle(&self) -> bool {
        self.leases.load(Ordering::SeqCst) == 0 && self.query.try_lock().is_ok()
    }
}

/// A slot checked out of the map. Taken while the map lock is held.
struct SlotLease(Arc<SessionSlot>);

impl SlotLease {
    fn new(slot: &Arc<SessionSlot>) -> Self {
        slot.leases.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(slot))
    }
}

impl Deref for SlotLease {
    type Target = SessionSlot;

    fn deref(&self) -> &SessionSlot {
        &self.0
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.0.leases.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Keyed store of progressive queries
pub struct SessionRegistry {
    engine: QueryEngine,
    config: SessionConfig,
    sessions: RwLock<HashMap<String, Arc<SessionSlot>>>,
}

impl SessionRegistry {
    pub fn new(engine: QueryEngine, config: SessionConfig) -> Self {
        Self {
            engine,
            config: SessionConfig {
                max_sessions: config.max_sessions.max(1),
                ..config
            },
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocate a fresh session id with an empty slot
    pub fn create_session(&self) -> EngineResult<String> {
        let id = Uuid::new_v4().to_string();
        self.slot_or_insert(&id)?;
        log_event_with_fields(Event::SessionCreated, &[("session", id.as_str())]);
        Ok(id)
    }

    /// Start a query in `session`, replacing whatever ran there before.
    ///
    /// Only an invalid aggregate or column keeps the previous query. If the
    /// first fetch fails the session holds the new query at offset 0.
    pub async fn start(
        &self,
        session: &str,
        aggregate: &str,
        column: Option<&str>,
    ) -> EngineResult<Estimate> {
        let slot = self.slot_or_insert(session)?;
        let mut guard = slot.query.lock().await;
        slot.touch();
        self.engine.start_in(&mut guard, aggregate, column).await
    }

    /// Advance the query running in `session` by one block
    pub async fn refine(&self, session: &str) -> EngineResult<Estimate> {
        let slot = self.existing_slot(session)?;
        let mut guard = slot.query.lock().await;
        let query = guard.as_mut().ok_or(EngineError::NotStarted)?;
        slot.touch();
        self.engine.refine(query).await
    }

    /// Last estimate without fetching anything
    pub async fn estimate(&self, session: &str) -> EngineResult<Estimate> {
        self.with_query(session, |q| q.estimate().clone()).await
    }

    /// Convergence trace of the query in `session`
    pub async fn history(&self, session: &str) -> EngineResult<Vec<Estimate>> {
        self.with_query(session, |q| q.history().to_vec()).await
    }

    /// Drop a session. Returns false if it did not exist.
    pub fn close(&self, session: &str) -> EngineResult<bool> {
        validate_session_id(session)?;
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session)
            .is_some();
        if removed {
            log_event_with_fields(Event::SessionClosed, &[("session", session)]);
        }
        Ok(removed)
    }

    /// Remove idle sessions older than the TTL. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        let ttl_ms = i64::try_from(self.config.idle_ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp_millis().saturating_sub(ttl_ms);

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, slot)| slot.last_used() < cutoff && slot.is_idle())
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            sessions.remove(id);
            self.engine.metrics().increment_sessions_evicted();
            log_event_with_fields(Event::SessionEvicted, &[("session", id.as_str()), ("reason", "idle")]);
        }
        expired.len()
    }

    async fn with_query<T>(&self, session: &str, f: impl FnOnce(&ProgressiveQuery) -> T) -> EngineResult<T> {
        let slot = self.existing_slot(session)?;
        let guard = slot.query.lock().await;
        guard.as_ref().map(f).ok_or(EngineError::NotStarted)
    }

    fn existing_slot(&self, session: &str) -> EngineResult<SlotLease> {
        validate_session_id(session)?;
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session)
            .map(SlotLease::new)
            .ok_or(EngineError::NotStarted)
    }

    fn slot_or_insert(&self, session: &str) -> EngineResult<SlotLease> {
        validate_session_id(session)?;

        if let Some(slot) = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session)
        {
            return Ok(SlotLease::new(slot));
        }

        if self.len() >= self.config.max_sessions {
            self.purge_expired();
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = sessions.get(session) {
            return Ok(SlotLease::new(slot));
        }

        if sessions.len() >= self.config.max_sessions {
            let victim = sessions
                .iter()
                .filter(|(_, slot)| slot.is_idle())
                .min_by_key(|(_, slot)| slot.last_used())
                .map(|(id, _)| id.clone())
                .ok_or(EngineError::TooManySessions(sessions.len()))?;

            sessions.remove(&victim);
            self.engine.metrics().increment_sessions_evicted();
            log_event_with_fields(
                Event::SessionEvicted,
                &[("session", victim.as_str()), ("reason", "capacity")],
            );
        }

        let slot = Arc::new(SessionSlot::new());
        let lease = SlotLease::new(&slot);
        sessions.insert(session.to_string(), slot);
        Ok(lease)
    }
}

fn validate_session_id(id: &str) -> EngineResult<()> {
    let valid = !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(EngineError::InvalidSession(id.to_string()))
    }
}
