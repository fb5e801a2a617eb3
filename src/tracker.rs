//! Tracker orchestration
//!
//! This module provides the stateful API used by the dashboard. It wires the
//! target calculator and the daily aggregator to a store:
//!
//! 1. `save_profile` - compute the target, cache it on the profile, record today's weight
//! 2. `day_summary` - fetch one day of meals and measure them against the cached target
//! 3. `log_meal` / `delete_meal` - keep the meal log in sync
//! 4. `weight_trend` - chart series for weight versus goal

use chrono::{Duration, NaiveDate};
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregator::{day_bounds, DailyAggregator};
use crate::config::TrackerConfig;
use crate::error::ComputeError;
use crate::history::WeightHistory;
use crate::store::{MealStore, ProfileStore, WeightHistoryStore};
use crate::target::TargetCalculator;
use crate::types::{DaySummary, EnergyTarget, MealEntry, Profile, WeightSample, WeightTrend};

/// Stateful tracker over a backing store
pub struct Tracker<S> {
    store: S,
    calculator: TargetCalculator,
    config: TrackerConfig,
}

impl<S> Tracker<S>
where
    S: ProfileStore + MealStore + WeightHistoryStore,
{
    /// Create a tracker with default configuration
    pub fn new(store: S) -> Self {
        Self::with_config(store, TrackerConfig::default())
    }

    pub fn with_config(store: S, config: TrackerConfig) -> Self {
        Self {
            store,
            calculator: TargetCalculator::new(config.calculator.clone()),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn calculator(&self) -> &TargetCalculator {
        &self.calculator
    }

    /// Compute and cache the daily goal, persist the profile, and record
    /// today's weight sample.
    ///
    /// # Errors
    ///
    /// `InvalidProfile` under a strict fallback policy, or `InvalidWeight` when
    /// a fallback target was used but the weight cannot be recorded. Nothing is
    /// written in either case.
    pub fn save_profile(
        &mut self,
        user_id: &str,
        mut profile: Profile,
        today: NaiveDate,
    ) -> Result<EnergyTarget, ComputeError> {
        let target = self.calculator.calculate(&profile, today)?;
        profile.daily_goal_kcal = Some(target.target_kcal);

        let sample = match profile.weight_kg {
            Some(weight_kg) if self.config.record_weight_on_save => {
                if !weight_kg.is_finite() || weight_kg <= 0.0 {
                    return Err(ComputeError::InvalidWeight(weight_kg));
                }
                Some(WeightSample {
                    weight_kg,
                    recorded_at: today,
                })
            }
            _ => None,
        };

        self.store.upsert_profile(user_id, profile)?;
        if let Some(sample) = sample {
            self.store.upsert_weight(user_id, sample)?;
        }

        info!(
            user_id,
            target_kcal = target.target_kcal,
            branch = ?target.branch,
            "profile saved"
        );
        Ok(target)
    }

    /// Daily target for the user: the cached goal, else the fallback constant, else 0
    pub fn target_for(&self, user_id: &str) -> Result<i64, ComputeError> {
        let cached = self
            .store
            .get_profile(user_id)?
            .and_then(|p| p.daily_goal_kcal)
            .filter(|kcal| *kcal > 0);

        Ok(cached
            .or_else(|| self.config.calculator.fallback.constant_kcal())
            .unwrap_or(0))
    }

    /// Meals, totals and progress for one UTC day
    pub fn day_summary(&self, user_id: &str, date: NaiveDate) -> Result<DaySummary, ComputeError> {
        // widened to the next midnight so sub-millisecond stamps are fetched;
        // summarize drops anything from the next day
        let (start, _) = day_bounds(date);
        let meals = self
            .store
            .meals_in_range(user_id, start, start + Duration::days(1))?;
        let target_kcal = self.target_for(user_id)?;

        debug!(user_id, %date, meals = meals.len(), target_kcal, "building day summary");
        Ok(DailyAggregator::summarize(&meals, date, target_kcal))
    }

    /// Append a meal to the log
    pub fn log_meal(&mut self, entry: MealEntry) -> Result<Uuid, ComputeError> {
        entry.validate()?;
        let id = entry.id;
        info!(user_id = %entry.user_id, meal_id = %id, calories = entry.calories, "meal logged");
        self.store.insert_meal(entry)?;
        Ok(id)
    }

    /// Remove a meal owned by `user_id`; returns whether it existed
    pub fn delete_meal(&mut self, user_id: &str, meal_id: Uuid) -> Result<bool, ComputeError> {
        let removed = self.store.delete_meal(meal_id, user_id)?;
        info!(user_id, meal_id = %meal_id, removed, "meal delete");
        Ok(removed)
    }

    /// Record a weight for `date`, replacing any earlier one that day
    pub fn record_weight(&mut self, user_id: &str, sample: WeightSample) -> Result<(), ComputeError> {
        self.store.upsert_weight(user_id, sample)
    }

    /// Weight chart series; falls back to the profile weight on `today`
    pub fn weight_trend(&self, user_id: &str, today: NaiveDate) -> Result<WeightTrend, ComputeError> {
        let history = WeightHistory::from_samples(self.store.weight_history(user_id)?)?;
        let profile = self.store.get_profile(user_id)?.unwrap_or_default();

        Ok(history.trend(profile.weight_kg, today, profile.target_weight_kg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FallbackPolicy;
    use crate::store::MemoryStore;
    use crate::types::{ActivityLevel, Sex, TargetBranch};
    use chrono::{DateTime, TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn profile() -> Profile {
        Profile::new(Sex::Male, 80.0, 180.0, 30, ActivityLevel::Sedentary)
    }

    fn meal(user: &str, calories: u32, hour: u32) -> MealEntry {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, hour, 0, 0).unwrap();
        MealEntry::new(user, "meal", calories, 20.0, 10.0, 50.0, at)
    }

    #[test]
    fn test_save_profile_caches_goal_and_weight() {
        let mut tracker = Tracker::new(MemoryStore::new());
        let target = tracker.save_profile("u1", profile(), today()).unwrap();
        assert_eq!(target.target_kcal, 1636);

        let stored = tracker.store().get_profile("u1").unwrap().unwrap();
        assert_eq!(stored.daily_goal_kcal, Some(1636));

        let weights = tracker.store().weight_history("u1").unwrap();
        assert_eq!(
            weights,
            vec![WeightSample {
                weight_kg: 80.0,
                recorded_at: today()
            }]
        );
    }

    #[test]
    fn test_save_invalid_profile_writes_nothing() {
        let mut tracker = Tracker::new(MemoryStore::new());
        let result = tracker.save_profile("u1", Profile::default(), today());

        assert!(result.unwrap_err().is_invalid_profile());
        assert!(tracker.store().get_profile("u1").unwrap().is_none());
    }

    #[test]
    fn test_save_with_legacy_fallback() {
        let mut config = TrackerConfig::default();
        config.calculator.fallback = FallbackPolicy::legacy();
        let mut tracker = Tracker::with_config(MemoryStore::new(), config);

        let target = tracker.save_profile("u1", Profile::default(), today()).unwrap();
        assert_eq!(target.branch, TargetBranch::Fallback);
        assert_eq!(tracker.target_for("u1").unwrap(), 2000);
        // no weight known, so nothing recorded
        assert!(tracker.store().weight_history("u1").unwrap().is_empty());
    }

    #[test]
    fn test_fallback_with_bad_weight_writes_nothing() {
        let mut config = TrackerConfig::default();
        config.calculator.fallback = FallbackPolicy::legacy();
        let mut tracker = Tracker::with_config(MemoryStore::new(), config);

        let mut bad = profile();
        bad.weight_kg = Some(-5.0);
        let result = tracker.save_profile("u1", bad, today());

        assert!(matches!(result, Err(ComputeError::InvalidWeight(w)) if w == -5.0));
        assert!(tracker.store().get_profile("u1").unwrap().is_none());
        assert!(tracker.store().weight_history("u1").unwrap().is_empty());
        assert_eq!(tracker.target_for("u1").unwrap(), 2000);
    }

    #[test]
    fn test_day_summary_without_profile() {
        let mut tracker = Tracker::new(MemoryStore::new());
        tracker.log_meal(meal("u1", 400, 9)).unwrap();

        let summary = tracker.day_summary("u1", today()).unwrap();
        assert_eq!(summary.target_kcal, 0);
        assert_eq!(summary.totals.calories, 400);
        assert_eq!(summary.progress.percent, 0.0);
    }

    #[test]
    fn test_day_summary_and_delete() {
        let mut tracker = Tracker::new(MemoryStore::new());
        tracker.save_profile("u1", profile(), today()).unwrap();

        tracker.log_meal(meal("u1", 300, 8)).unwrap();
        let lunch = tracker.log_meal(meal("u1", 250, 13)).unwrap();
        tracker.log_meal(meal("u1", 450, 19)).unwrap();
        tracker.log_meal(meal("u2", 999, 12)).unwrap();

        let summary = tracker.day_summary("u1", today()).unwrap();
        assert_eq!(summary.totals.calories, 1000);
        assert_eq!(summary.target_kcal, 1636);
        assert_eq!(summary.progress.remaining_kcal, 636);

        assert!(!tracker.delete_meal("u2", lunch).unwrap());
        assert!(tracker.delete_meal("u1", lunch).unwrap());

        let summary = tracker.day_summary("u1", today()).unwrap();
        assert_eq!(summary.totals.calories, 750);
        assert_eq!(summary.meals.len(), 2);
    }

    #[test]
    fn test_day_summary_counts_end_of_day_meals() {
        let mut tracker = Tracker::new(MemoryStore::new());
        let late: DateTime<Utc> = "2024-01-15T23:59:59.999500Z".parse().unwrap();
        let midnight: DateTime<Utc> = "2024-01-16T00:00:00Z".parse().unwrap();
        tracker
            .log_meal(MealEntry::new("u1", "late snack", 120, 0.0, 0.0, 0.0, late))
            .unwrap();
        tracker
            .log_meal(MealEntry::new("u1", "breakfast", 500, 0.0, 0.0, 0.0, midnight))
            .unwrap();

        let summary = tracker.day_summary("u1", today()).unwrap();
        assert_eq!(summary.totals.calories, 120);
        assert_eq!(summary.meals.len(), 1);
    }

    #[test]
    fn test_weight_trend() {
        let mut tracker = Tracker::new(MemoryStore::new());
        let trend = tracker.weight_trend("u1", today()).unwrap();
        assert!(trend.points.is_empty());

        let goal_date = today() + Duration::days(60);
        tracker
            .save_profile("u1", profile().with_goal(75.0, goal_date), today())
            .unwrap();

        let mut later = profile().with_goal(75.0, goal_date);
        later.weight_kg = Some(79.0);
        tracker.save_profile("u1", later, today() + Duration::days(7)).unwrap();

        let trend = tracker.weight_trend("u1", today() + Duration::days(7)).unwrap();
        let weights: Vec<f64> = trend.points.iter().map(|p| p.weight_kg).collect();
        assert_eq!(weights, vec![80.0, 79.0]);
        assert_eq!(trend.target_weight_kg, Some(75.0));
    }
}
