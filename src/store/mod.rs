//! Persistence contracts
//!
//! The hosted backend owns profiles, meals and weight history. These traits
//! describe what the core needs from it; [`MemoryStore`] is an in-process
//! implementation used by the CLI and tests.

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ComputeError;
use crate::types::{MealEntry, Profile, WeightSample};

/// Profile persistence, keyed by user id
pub trait ProfileStore {
    /// Fetch a profile; `None` when the user has not saved one yet
    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, ComputeError>;

    /// Insert or replace the user's profile
    fn upsert_profile(&mut self, user_id: &str, profile: Profile) -> Result<(), ComputeError>;
}

/// Meal persistence
pub trait MealStore {
    /// Meals with `start <= created_at <= end`, newest first
    fn meals_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MealEntry>, ComputeError>;

    fn insert_meal(&mut self, entry: MealEntry) -> Result<(), ComputeError>;

    /// Delete a meal owned by `user_id`; returns whether anything was removed
    fn delete_meal(&mut self, id: Uuid, user_id: &str) -> Result<bool, ComputeError>;
}

/// Weight history persistence, one sample per user per day
pub trait WeightHistoryStore {
    fn upsert_weight(&mut self, user_id: &str, sample: WeightSample) -> Result<(), ComputeError>;

    /// All samples for the user, oldest first
    fn weight_history(&self, user_id: &str) -> Result<Vec<WeightSample>, ComputeError>;
}
