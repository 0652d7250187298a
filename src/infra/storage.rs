//! Storage port shared by the gate, session and profile stores.
//!
//! Business logic only sees [`KeyValueStore`]; the SQLite adapter lives in
//! `infra::db` and [`MemoryKeyValueStore`] backs tests and hosts without
//! durable storage.

use anyhow::Result;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Persisted key names.
pub mod keys {
    pub const GATE_RESOLVED: &str = "gate.resolved";
    pub const GATE_USE_WEB_SESSION: &str = "gate.use_web_session";
    pub const GATE_SAVED_DESTINATION: &str = "gate.saved_destination";
    pub const ONBOARDING_COMPLETED: &str = "native.onboarding_completed";
    pub const USER_PROFILE: &str = "native.user_profile";
    pub const FAVORITE_RECIPES: &str = "native.favorite_recipes";
    pub const FAVORITE_RESTAURANTS: &str = "native.favorite_restaurants";
    pub const SESSION_COOKIES: &str = "session.cookies";

    /// Keys owned by the gate state store.
    pub const GATE: &[&str] = &[GATE_RESOLVED, GATE_USE_WEB_SESSION, GATE_SAVED_DESTINATION];

    /// Keys owned by the native profile store.
    pub const NATIVE: &[&str] = &[
        ONBOARDING_COMPLETED,
        USER_PROFILE,
        FAVORITE_RECIPES,
        FAVORITE_RESTAURANTS,
    ];
}

/// String key-value persistence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }

    /// Writes `entries` and removes `removals` as one unit where the backend
    /// supports it.
    fn set_many(&self, entries: &[(&str, &str)], removals: &[&str]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        self.remove_all(removals)
    }

    fn get_bool(&self, key: &str) -> Result<bool> {
        Ok(matches!(self.get(key)?.as_deref(), Some("true")))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set(key, if value { "true" } else { "false" })
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        (**self).remove_all(keys)
    }

    fn set_many(&self, entries: &[(&str, &str)], removals: &[&str]) -> Result<()> {
        (**self).set_many(entries, removals)
    }
}

/// Process-local store. Contents vanish with the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, &str)], removals: &[&str]) -> Result<()> {
        let mut map = self.entries.lock();
        for (key, value) in entries {
            map.insert(key.to_string(), value.to_string());
        }
        for key in removals {
            map.remove(*key);
        }
        Ok(())
    }
}
