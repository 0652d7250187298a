//! Durable gate state on top of the storage port.

use super::parser::is_web_destination;
use crate::domain::{BLANK_PAGE, GateDecision, GateState};
use crate::infra::storage::{KeyValueStore, keys};
use anyhow::Result;
use std::sync::Arc;

/// Sole owner of the persisted gate keys.
#[derive(Clone)]
pub struct GateStateStore {
    store: Arc<dyn KeyValueStore>,
}

impl GateStateStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<GateState> {
        Ok(GateState {
            resolved: self.store.get_bool(keys::GATE_RESOLVED)?,
            use_web_session: self.store.get_bool(keys::GATE_USE_WEB_SESSION)?,
            saved_destination_url: self
                .store
                .get(keys::GATE_SAVED_DESTINATION)?
                .filter(|url| !url.is_empty()),
        })
    }

    /// Persists a terminal decision as one batch. Repeating the same call is harmless.
    pub fn save(&self, decision: &GateDecision) -> Result<()> {
        match decision {
            GateDecision::WebSession { destination_url } => self.store.set_many(
                &[
                    (keys::GATE_SAVED_DESTINATION, destination_url.as_str()),
                    (keys::GATE_USE_WEB_SESSION, "true"),
                    (keys::GATE_RESOLVED, "true"),
                ],
                &[],
            )?,
            GateDecision::NativeApp => self.store.set_many(
                &[
                    (keys::GATE_USE_WEB_SESSION, "false"),
                    (keys::GATE_RESOLVED, "true"),
                ],
                &[keys::GATE_SAVED_DESTINATION],
            )?,
        }
        log::info!(target: "gate", "persisted gate decision: {}", decision);
        Ok(())
    }

    /// Saved destination, only if it can actually be loaded.
    pub fn usable_destination(&self) -> Result<Option<String>> {
        Ok(self
            .load()?
            .saved_destination_url
            .filter(|url| is_usable_destination(url)))
    }

    /// Replaces the saved destination with the page the session last settled on.
    ///
    /// Blank pages are ignored.
    pub fn record_navigation(&self, url: &str) -> Result<bool> {
        if !is_usable_destination(url) {
            return Ok(false);
        }
        self.store.set(keys::GATE_SAVED_DESTINATION, url)?;
        log::debug!(target: "gate", "saved destination updated to {}", url);
        Ok(true)
    }

    /// Removes gate state together with the native profile keys.
    pub fn clear(&self) -> Result<()> {
        let all: Vec<&str> = keys::GATE.iter().chain(keys::NATIVE).copied().collect();
        self.store.remove_all(&all)?;
        log::info!(target: "gate", "cleared persisted gate and profile state");
        Ok(())
    }
}

/// Not the blank page and an absolute `http`/`https` URL with a host.
pub fn is_usable_destination(url: &str) -> bool {
    url != BLANK_PAGE && is_web_destination(url)
}
