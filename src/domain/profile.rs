use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a recipe
pub type RecipeId = Uuid;

/// Unique identifier for a restaurant
pub type RestaurantId = Uuid;

/// Cooking skill declared during onboarding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
            Self::Expert => write!(f, "expert"),
        }
    }
}

impl FromStr for SkillLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            "expert" => Ok(Self::Expert),
            _ => Err(format!("Unknown skill level: {s}")),
        }
    }
}

/// Profile captured by onboarding and edited in settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub dietary_preferences: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub cuisine_preferences: Vec<String>,
    #[serde(default)]
    pub skill_level: SkillLevel,
    #[serde(default)]
    pub favorite_recipe_ids: BTreeSet<RecipeId>,
    #[serde(default)]
    pub favorite_restaurant_ids: BTreeSet<RestaurantId>,
    #[serde(default)]
    pub dark_mode_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            dietary_preferences: Vec::new(),
            allergies: Vec::new(),
            cuisine_preferences: Vec::new(),
            skill_level: SkillLevel::default(),
            favorite_recipe_ids: BTreeSet::new(),
            favorite_restaurant_ids: BTreeSet::new(),
            dark_mode_enabled: false,
            created_at: now,
            last_active_at: now,
        }
    }
}
