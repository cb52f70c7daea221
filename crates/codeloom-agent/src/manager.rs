//! Session lifecycle: the in-process cache over the store, with
//! runtime-only cancellation handles and event buses.

use crate::bus::EventBus;
use codeloom_core::{SessionId, SessionStatus};
use codeloom_store::{SessionStore, StoreError};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session is busy: {0}")]
    Busy(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A cached session. The persisted row in the store is authoritative for
/// status, title and token totals; the handle owns what only exists at
/// runtime: the cancellation token, the event bus, the loaded-tool set.
pub struct SessionHandle {
    pub id: SessionId,
    working_dir: RwLock<PathBuf>,
    cancel: Mutex<CancellationToken>,
    bus: Mutex<Arc<EventBus>>,
    loaded_tools: Mutex<HashSet<String>>,
}

impl SessionHandle {
    fn new(id: SessionId, working_dir: PathBuf) -> Self {
        Self {
            id,
            working_dir: RwLock::new(working_dir),
            cancel: Mutex::new(CancellationToken::new()),
            bus: Mutex::new(Arc::new(EventBus::new())),
            loaded_tools: Mutex::new(HashSet::new()),
        }
    }

    pub fn working_dir(&self) -> PathBuf {
        self.working_dir.read().clone()
    }

    pub fn set_working_dir(&self, dir: PathBuf) {
        *self.working_dir.write() = dir;
    }

    pub fn bus(&self) -> Arc<EventBus> {
        self.bus.lock().clone()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.lock().clone()
    }

    pub fn trigger_cancel(&self) {
        self.cancel.lock().cancel();
    }

    pub fn loaded_tools(&self) -> HashSet<String> {
        self.loaded_tools.lock().clone()
    }

    pub fn set_loaded_tools(&self, tools: HashSet<String>) {
        *self.loaded_tools.lock() = tools;
    }

    /// Fresh cancellation token and event bus for the next turn. The
    /// previous bus is closed so stale subscribers terminate.
    fn refresh_runtime(&self) {
        let old_bus = {
            let mut bus = self.bus.lock();
            std::mem::replace(&mut *bus, Arc::new(EventBus::new()))
        };
        old_bus.close();
        *self.cancel.lock() = CancellationToken::new();
    }
}

pub struct SessionManager {
    store: Arc<SessionStore>,
    cache: DashMap<String, Arc<SessionHandle>>,
}

impl SessionManager {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            cache: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Allocate a fresh session, persisted as `idle`.
    pub fn create_session(
        &self,
        working_dir: Option<PathBuf>,
        default_root: &Path,
    ) -> Result<Arc<SessionHandle>, SessionError> {
        let id = uuid::Uuid::new_v4().to_string();
        let working_dir = working_dir.unwrap_or_else(|| default_root.to_path_buf());

        self.store.create_session(
            &id,
            &working_dir.to_string_lossy(),
            SessionStatus::Idle,
        )?;

        let handle = Arc::new(SessionHandle::new(SessionId::new(&id), working_dir));
        self.cache.insert(id.clone(), handle.clone());
        info!(session = %id, "session created");
        Ok(handle)
    }

    /// Cache lookup; on miss, rehydrate from the store with fresh
    /// runtime-only fields. Concurrent rehydrations resolve last-writer-wins
    /// on the cache slot.
    pub fn get_session(&self, id: &str) -> Result<Option<Arc<SessionHandle>>, SessionError> {
        if let Some(handle) = self.cache.get(id) {
            return Ok(Some(handle.clone()));
        }
        let record = match self.store.get_session(id)? {
            Some(r) => r,
            None => return Ok(None),
        };
        debug!(session = %id, "rehydrating session from store");
        let handle = Arc::new(SessionHandle::new(
            SessionId::new(&record.id),
            PathBuf::from(record.working_dir),
        ));
        self.cache.insert(id.to_string(), handle.clone());
        Ok(Some(handle))
    }

    /// Get a session ready for another turn: fails while a turn is running,
    /// otherwise replaces the cancellation handle and event bus.
    pub fn prepare_for_continuation(&self, id: &str) -> Result<Arc<SessionHandle>, SessionError> {
        let handle = self
            .get_session(id)?
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        let record = self
            .store
            .get_session(id)?
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        if record.status == SessionStatus::Running {
            return Err(SessionError::Busy(id.to_string()));
        }
        handle.refresh_runtime();
        Ok(handle)
    }

    /// Signal the running turn to stop. Returns false when the session is
    /// unknown or has no turn in flight.
    pub fn cancel(&self, id: &str) -> bool {
        let running = matches!(
            self.store.get_session(id),
            Ok(Some(record)) if record.status == SessionStatus::Running
        );
        if !running {
            return false;
        }
        match self.cache.get(id) {
            Some(handle) => {
                info!(session = %id, "cancelling turn");
                handle.trigger_cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel if running, close the bus, evict and delete from the store.
    pub fn delete_session(&self, id: &str) -> Result<bool, SessionError> {
        if let Some((_, handle)) = self.cache.remove(id) {
            handle.trigger_cancel();
            handle.bus().close();
        }
        Ok(self.store.delete_session(id)?)
    }

    /// Evict a session from the cache without touching the store. Used by
    /// tests to exercise rehydration.
    pub fn evict(&self, id: &str) {
        self.cache.remove(id);
    }
}
