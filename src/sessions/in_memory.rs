//! In-memory session store implementation.
//!
//! Backs the orchestrator tests; behaves like the filesystem store minus
//! durability.

use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::traits::{sanitize_name, Session, SessionStore};

pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    last_used: Mutex<Option<String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            last_used: Mutex::new(None),
        }
    }

    /// Snapshot of a stored session, for assertions.
    pub fn stored(&self, name: &str) -> Option<Session> {
        self.sessions.lock().get(name).cloned()
    }

    /// Number of stored sessions, for assertions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load_or_create(&self, name: &str) -> Result<Session> {
        let name = sanitize_name(name)?;
        let sessions = self.sessions.lock();
        Ok(sessions
            .get(&name)
            .cloned()
            .unwrap_or_else(|| Session::new(name)))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let name = sanitize_name(&session.name)?;
        let mut sessions = self.sessions.lock();
        sessions.insert(name, session.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.sessions.lock().keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let name = sanitize_name(name)?;
        if self.sessions.lock().remove(&name).is_none() {
            return Err(Error::SessionNotFound(name));
        }

        let mut last_used = self.last_used.lock();
        if last_used.as_deref() == Some(name.as_str()) {
            *last_used = None;
        }
        Ok(())
    }

    async fn rename(&self, old: &str, new: &str) -> Result<()> {
        let old = sanitize_name(old)?;
        let new = sanitize_name(new)?;

        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&new) {
            return Err(Error::SessionExists(new));
        }
        let Some(mut session) = sessions.remove(&old) else {
            return Err(Error::SessionNotFound(old));
        };
        session.name = new.clone();
        sessions.insert(new.clone(), session);
        drop(sessions);

        let mut last_used = self.last_used.lock();
        if last_used.as_deref() == Some(old.as_str()) {
            *last_used = Some(new);
        }
        Ok(())
    }

    async fn last_used(&self) -> Result<Option<String>> {
        Ok(self.last_used.lock().clone())
    }

    async fn set_last_used(&self, name: &str) -> Result<()> {
        *self.last_used.lock() = Some(name.to_string());
        Ok(())
    }

    async fn clear_last_used(&self) -> Result<()> {
        *self.last_used.lock() = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}
