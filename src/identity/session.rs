use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use parking_lot::RwLock;

use crate::config::gen_secret;

/// Per-actor session key/value store the guard reads and writes through.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn forget(&self, key: &str) -> Result<()>;
}

static LOCAL_IDS: AtomicU64 = AtomicU64::new(1);

// The id only labels trace lines, so a local sequence is an acceptable stand-in.
fn session_label() -> String {
    gen_secret().unwrap_or_else(|e| {
        tracing::warn!(target: "warden::session", "random session id unavailable: {e:#}");
        format!("local-{}", LOCAL_IDS.fetch_add(1, Ordering::Relaxed))
    })
}

/// In-process session with interior mutability so the host can share it with the guard.
#[derive(Debug)]
pub struct MemorySessionStore {
    session_id: String,
    values: RwLock<HashMap<String, String>>,
}

impl Default for MemorySessionStore {
    fn default() -> Self { Self { session_id: session_label(), values: RwLock::new(HashMap::new()) } }
}

impl MemorySessionStore {
    pub fn new() -> Self { Self::default() }

    pub fn id(&self) -> &str { &self.session_id }

    pub fn len(&self) -> usize { self.values.read().len() }

    pub fn is_empty(&self) -> bool { self.values.read().is_empty() }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        tracing::trace!(target: "warden::session", "session.put sid={} key={}", self.session_id, key);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<()> {
        let removed = self.values.write().remove(key).is_some();
        tracing::trace!(target: "warden::session", "session.forget sid={} key={} removed={}", self.session_id, key, removed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_forget() {
        let s = MemorySessionStore::new();
        assert_eq!(s.get("k").unwrap(), None);
        s.put("k", "v").unwrap();
        assert_eq!(s.get("k").unwrap().as_deref(), Some("v"));
        s.forget("k").unwrap();
        assert!(s.is_empty());
        // forgetting an absent key is not an error
        s.forget("k").unwrap();
    }

    #[test]
    fn session_ids_are_random() {
        let a = MemorySessionStore::new();
        let b = MemorySessionStore::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id().len(), 43);
    }
}
