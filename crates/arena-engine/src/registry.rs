//! Maps match ids to live sessions. The registry is the only component
//! that constructs or destroys a `MatchSession`, and the map lock
//! serializes construction so concurrent first-accesses cannot spawn two
//! sessions for one match.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arena_types::models::{LobbyMatch, MatchState};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::session::MatchSession;
use crate::store::Store;

pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, Arc<MatchSession>>>,
    store: Arc<dyn Store>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { sessions: Mutex::new(HashMap::new()), store }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Create a fresh waiting 2-capacity match, persist it and make its
    /// session resident.
    pub fn create_match(&self, title: &str) -> Result<MatchState> {
        let state = MatchState::new(Uuid::new_v4(), title.to_string());
        self.store.save_match(&state)?;

        let session = Arc::new(MatchSession::new(state.clone(), self.store.clone()));
        self.sessions
            .lock()
            .expect("registry lock poisoned")
            .insert(state.id, session);

        info!(match_id = %state.id, title, "match created");
        Ok(state)
    }

    /// Return the live session for a match, constructing it from persisted
    /// state if not already resident. A finished or abandoned match loads
    /// too, but every gameplay mutation on it is rejected, so callers get
    /// a read-only terminal snapshot rather than revived gameplay.
    pub fn get_or_create(&self, match_id: Uuid) -> Result<Arc<MatchSession>> {
        let mut sessions = self.sessions.lock().expect("registry lock poisoned");
        if let Some(session) = sessions.get(&match_id) {
            return Ok(session.clone());
        }

        let state = self
            .store
            .load_match(match_id)?
            .ok_or(Error::NotFound("match"))?;
        let session = Arc::new(MatchSession::new(state, self.store.clone()));
        sessions.insert(match_id, session.clone());
        debug!(%match_id, "session loaded from store");
        Ok(session)
    }

    /// Drop the resident session once it reached a terminal state. The
    /// final state was already flushed by the terminal transition, so a
    /// later `get_or_create` re-loads the terminal snapshot.
    pub fn retire(&self, match_id: Uuid) {
        let mut sessions = self.sessions.lock().expect("registry lock poisoned");
        let terminal = sessions
            .get(&match_id)
            .map(|s| s.snapshot().status.is_terminal())
            .unwrap_or(false);
        if terminal {
            sessions.remove(&match_id);
            debug!(%match_id, "session retired");
        }
    }

    /// Lobby summaries of all matches, newest first.
    pub fn list_lobby(&self) -> Result<Vec<LobbyMatch>> {
        self.store.list_matches()
    }
}
