use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::info;
use yrs::Doc;

use super::awareness::AwarenessStates;

/// One shared collaboration document: the CRDT state (owned exclusively by
/// the session and mutated only through accepted update messages), the set of
/// attached connection ids, and the per-client awareness table.
///
/// All mutation happens behind a single per-session lock so updates are
/// applied and broadcast in receipt order. Independent sessions never contend.
pub struct DocumentSession {
    name: String,
    inner: Mutex<SessionInner>,
}

pub(crate) struct SessionInner {
    pub(crate) doc: Doc,
    pub(crate) conns: HashSet<String>,
    pub(crate) awareness: AwarenessStates,
}

impl DocumentSession {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inner: Mutex::new(SessionInner {
                doc: Doc::new(),
                conns: HashSet::new(),
                awareness: AwarenessStates::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // Recover the guard when a prior panic poisoned the lock.
    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the currently attached connection ids, used for fan-out.
    pub fn connections(&self) -> Vec<String> {
        self.lock().conns.iter().cloned().collect()
    }

    pub fn connection_count(&self) -> usize {
        self.lock().conns.len()
    }

    pub fn awareness_count(&self) -> usize {
        self.lock().awareness.len()
    }
}

/// Registry of active document sessions, keyed by session name. Sessions are
/// created lazily on first reference and live for the process lifetime.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<DocumentSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_or_create(&self, name: &str) -> Arc<DocumentSession> {
        {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            if let Some(session) = sessions.get(name) {
                return session.clone();
            }
        }
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(name.to_string())
            .or_insert_with(|| {
                info!("Creating document session: {}", name);
                Arc::new(DocumentSession::new(name))
            })
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<DocumentSession>> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(name).cloned()
    }

    pub fn all(&self) -> Vec<Arc<DocumentSession>> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent() {
        let registry = SessionRegistry::new();
        let a = registry.get_or_create("design-review");
        let b = registry.get_or_create("design-review");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn sessions_are_independent() {
        let registry = SessionRegistry::new();
        let a = registry.get_or_create("alpha");
        let b = registry.get_or_create("beta");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }
}
