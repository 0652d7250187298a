//! Persisted native-experience data: profile, onboarding flag, favorites.

use crate::domain::{RecipeId, RestaurantId, UserProfile};
use crate::infra::storage::{KeyValueStore, keys};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored profile. A blob that no longer decodes is treated as absent.
    pub fn load_profile(&self) -> Result<Option<UserProfile>> {
        let Some(raw) = self.store.get(keys::USER_PROFILE)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(err) => {
                log::warn!(target: "storage", "discarding unreadable profile: {}", err);
                Ok(None)
            }
        }
    }

    /// Saves the profile and marks onboarding as completed.
    pub fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        let raw = serde_json::to_string(profile).context("encode profile")?;
        self.store.set(keys::USER_PROFILE, &raw)?;
        self.store.set_bool(keys::ONBOARDING_COMPLETED, true)
    }

    pub fn is_onboarding_completed(&self) -> Result<bool> {
        self.store.get_bool(keys::ONBOARDING_COMPLETED)
    }

    pub fn favorite_recipe_ids(&self) -> Result<BTreeSet<RecipeId>> {
        self.load_ids(keys::FAVORITE_RECIPES)
    }

    pub fn favorite_restaurant_ids(&self) -> Result<BTreeSet<RestaurantId>> {
        self.load_ids(keys::FAVORITE_RESTAURANTS)
    }

    pub fn add_favorite_recipe(&self, id: RecipeId) -> Result<()> {
        self.update_favorites(keys::FAVORITE_RECIPES, |set| {
            set.insert(id);
        })?;
        self.update_profile(|p| {
            p.favorite_recipe_ids.insert(id);
        })
    }

    pub fn remove_favorite_recipe(&self, id: RecipeId) -> Result<()> {
        self.update_favorites(keys::FAVORITE_RECIPES, |set| {
            set.remove(&id);
        })?;
        self.update_profile(|p| {
            p.favorite_recipe_ids.remove(&id);
        })
    }

    pub fn add_favorite_restaurant(&self, id: RestaurantId) -> Result<()> {
        self.update_favorites(keys::FAVORITE_RESTAURANTS, |set| {
            set.insert(id);
        })?;
        self.update_profile(|p| {
            p.favorite_restaurant_ids.insert(id);
        })
    }

    pub fn remove_favorite_restaurant(&self, id: RestaurantId) -> Result<()> {
        self.update_favorites(keys::FAVORITE_RESTAURANTS, |set| {
            set.remove(&id);
        })?;
        self.update_profile(|p| {
            p.favorite_restaurant_ids.remove(&id);
        })
    }

    fn load_ids(&self, key: &str) -> Result<BTreeSet<Uuid>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(BTreeSet::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|err| {
            log::warn!(target: "storage", "discarding unreadable {}: {}", key, err);
            BTreeSet::new()
        }))
    }

    fn update_favorites(&self, key: &str, change: impl FnOnce(&mut BTreeSet<Uuid>)) -> Result<()> {
        let mut ids = self.load_ids(key)?;
        change(&mut ids);
        let raw = serde_json::to_string(&ids).context("encode favorites")?;
        self.store.set(key, &raw)
    }

    fn update_profile(&self, change: impl FnOnce(&mut UserProfile)) -> Result<()> {
        let Some(mut profile) = self.load_profile()? else {
            return Ok(());
        };
        change(&mut profile);
        profile.last_active_at = chrono::Utc::now();
        self.save_profile(&profile)
    }
}
