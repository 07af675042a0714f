use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use tracing::warn;

use crate::context::SessionHandle;

/// Owns the nickname → session mapping. Nothing else holds the map; every
/// access goes through one mutex and no lock is held across an await.
#[derive(Debug, Default)]
pub struct NicknameRegistry {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl NicknameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `session` under `requested`, or under the first of
    /// `requested1`, `requested2`, ... that is free. Returns the name used.
    pub fn register(&self, requested: &str, mut session: SessionHandle) -> String {
        let mut sessions = self.sessions();

        let mut nick = requested.to_string();
        let mut suffix = 1u32;
        while sessions.contains_key(&nick) {
            nick = format!("{}{}", requested, suffix);
            suffix += 1;
        }

        session.nickname = nick.clone();
        sessions.insert(nick.clone(), session);
        nick
    }

    pub fn unregister(&self, nick: &str) -> Option<SessionHandle> {
        self.sessions().remove(nick)
    }

    pub fn lookup(&self, nick: &str) -> Option<SessionHandle> {
        self.sessions().get(nick).cloned()
    }

    /// Point-in-time copy of every registered session.
    pub fn snapshot_all(&self) -> Vec<SessionHandle> {
        self.sessions().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, SessionHandle>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // the map itself is never left half-updated by a panicking holder
                warn!("Nickname registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
