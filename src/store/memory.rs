use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::{MealStore, ProfileStore, WeightHistoryStore};
use crate::error::ComputeError;
use crate::history::WeightHistory;
use crate::types::{MealEntry, Profile, WeightSample};

/// In-memory store implementing every persistence contract
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    profiles: HashMap<String, Profile>,
    #[serde(default)]
    meals: Vec<MealEntry>,
    #[serde(default)]
    weights: HashMap<String, WeightHistory>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn meal_count(&self) -> usize {
        self.meals.len()
    }

    /// Load store state from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize store state to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl ProfileStore for MemoryStore {
    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, ComputeError> {
        Ok(self.profiles.get(user_id).cloned())
    }

    fn upsert_profile(&mut self, user_id: &str, profile: Profile) -> Result<(), ComputeError> {
        self.profiles.insert(user_id.to_string(), profile);
        Ok(())
    }
}

impl MealStore for MemoryStore {
    fn meals_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MealEntry>, ComputeError> {
        let mut meals: Vec<MealEntry> = self
            .meals
            .iter()
            .filter(|m| m.user_id == user_id && m.created_at >= start && m.created_at <= end)
            .cloned()
            .collect();
        meals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(meals)
    }

    fn insert_meal(&mut self, entry: MealEntry) -> Result<(), ComputeError> {
        entry.validate()?;
        if self.meals.iter().any(|m| m.id == entry.id) {
            return Err(ComputeError::Store(format!("meal {} already exists", entry.id)));
        }
        self.meals.push(entry);
        Ok(())
    }

    fn delete_meal(&mut self, id: Uuid, user_id: &str) -> Result<bool, ComputeError> {
        let before = self.meals.len();
        self.meals.retain(|m| !(m.id == id && m.user_id == user_id));
        Ok(self.meals.len() != before)
    }
}

impl WeightHistoryStore for MemoryStore {
    fn upsert_weight(&mut self, user_id: &str, sample: WeightSample) -> Result<(), ComputeError> {
        self.weights
            .entry(user_id.to_string())
            .or_default()
            .upsert(sample)?;
        Ok(())
    }

    fn weight_history(&self, user_id: &str) -> Result<Vec<WeightSample>, ComputeError> {
        Ok(self
            .weights
            .get(user_id)
            .map(WeightHistory::samples)
            .unwrap_or_default())
    }
}
