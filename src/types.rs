//! Core types for FitAI Core
//!
//! This module defines the data structures that flow between the calculator,
//! the aggregator and the stores: the user profile, logged meals, weight
//! samples, and the computed targets and daily summaries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::ComputeError;

/// Biological sex, selects the Mifflin-St Jeor constant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[default]
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

/// Activity levels offered when editing a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Desk job, no training
    Sedentary,
    /// 1-2 sessions per week
    Light,
    /// 3-4 sessions per week
    Moderate,
    /// Daily training
    Active,
    /// Hard daily training or physical job
    VeryActive,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 5] = [
        ActivityLevel::Sedentary,
        ActivityLevel::Light,
        ActivityLevel::Moderate,
        ActivityLevel::Active,
        ActivityLevel::VeryActive,
    ];

    /// Multiplier applied to resting energy
    pub fn factor(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }

    /// Map a stored multiplier back to its level, if it is one of the presets
    pub fn from_factor(factor: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| (level.factor() - factor).abs() < 1e-9)
    }
}

/// Body metrics and goal for a single user.
///
/// Required calculator inputs are optional here because stored profiles may be
/// partially filled in during onboarding. The calculator validates them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub sex: Sex,
    /// Current body weight (kg)
    #[serde(default)]
    pub weight_kg: Option<f64>,
    /// Height (cm)
    #[serde(default)]
    pub height_cm: Option<f64>,
    /// Age (years)
    #[serde(default)]
    pub age_years: Option<u32>,
    /// Activity multiplier, see [`ActivityLevel`]
    #[serde(default)]
    pub activity_factor: Option<f64>,
    /// Goal weight (kg); stored zero means no goal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_weight_kg: Option<f64>,
    /// Date by which the goal weight should be reached
    #[serde(
        default,
        deserialize_with = "deserialize_optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_date: Option<NaiveDate>,
    /// Cached calculator output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_goal_kcal: Option<i64>,
}

impl Profile {
    pub fn new(sex: Sex, weight_kg: f64, height_cm: f64, age_years: u32, activity: ActivityLevel) -> Self {
        Self {
            sex,
            weight_kg: Some(weight_kg),
            height_cm: Some(height_cm),
            age_years: Some(age_years),
            activity_factor: Some(activity.factor()),
            ..Default::default()
        }
    }

    /// Set a goal weight and date
    pub fn with_goal(mut self, target_weight_kg: f64, target_date: NaiveDate) -> Self {
        self.target_weight_kg = Some(target_weight_kg);
        self.target_date = Some(target_date);
        self
    }

    /// Goal weight and date, only when both are present and the weight is positive
    pub fn goal(&self) -> Option<(f64, NaiveDate)> {
        match (self.target_weight_kg, self.target_date) {
            (Some(weight), Some(date)) if weight > 0.0 && weight.is_finite() => Some((weight, date)),
            _ => None,
        }
    }
}

/// Stored dates come back as `""` when the goal date was cleared.
fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// A logged meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub id: Uuid,
    /// Owner lookup key
    pub user_id: String,
    pub name: String,
    /// Energy (kcal)
    pub calories: u32,
    /// Protein (g)
    #[serde(default)]
    pub protein: f64,
    /// Fat (g)
    #[serde(default)]
    pub fat: f64,
    /// Carbohydrates (g)
    #[serde(default)]
    pub carbs: f64,
    pub created_at: DateTime<Utc>,
}

impl MealEntry {
    /// Create a meal entry with a fresh id
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        calories: u32,
        protein: f64,
        fat: f64,
        carbs: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            name: name.into(),
            calories,
            protein,
            fat,
            carbs,
            created_at,
        }
    }

    /// Reject entries a store should never accept
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.user_id.trim().is_empty() {
            return Err(ComputeError::InvalidMeal("user_id is empty".to_string()));
        }
        for (field, value) in [("protein", self.protein), ("fat", self.fat), ("carbs", self.carbs)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ComputeError::InvalidMeal(format!(
                    "{field} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Body weight recorded for one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightSample {
    pub weight_kg: f64,
    pub recorded_at: NaiveDate,
}

/// Which rule produced the calorie target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetBranch {
    /// No usable goal: fixed deficit below maintenance
    FlatDeficit,
    /// Goal date in the past or today: fixed deficit below maintenance
    GoalElapsed,
    /// Linear deficit or surplus spread over the days left
    GoalPaced,
    /// Profile incomplete, constant supplied by the fallback policy
    Fallback,
}

/// Calculator output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyTarget {
    /// Energy to hold current weight (kcal/day)
    pub maintenance_kcal: i64,
    /// Daily intake target after goal adjustment and floor (kcal/day)
    pub target_kcal: i64,
    pub branch: TargetBranch,
    /// Days until the goal date, when a goal was considered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
    /// True when the safety floor raised the target
    pub floor_applied: bool,
}

impl EnergyTarget {
    pub fn is_fallback(&self) -> bool {
        self.branch == TargetBranch::Fallback
    }
}

/// Share of daily energy per macronutrient, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroSplit {
    pub protein_pct: f64,
    pub fat_pct: f64,
    pub carbs_pct: f64,
}

impl Default for MacroSplit {
    fn default() -> Self {
        Self {
            protein_pct: 25.0,
            fat_pct: 30.0,
            carbs_pct: 45.0,
        }
    }
}

/// Daily macronutrient targets (g)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub protein_g: i64,
    pub fat_g: i64,
    pub carbs_g: i64,
}

/// Energy target plus macro breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionPlan {
    pub energy: EnergyTarget,
    pub macros: MacroTargets,
    pub split: MacroSplit,
}

/// Raw totals for a set of meals; macro sums stay unrounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyTotals {
    pub calories: i64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub meal_count: usize,
}

/// Totals rounded to whole units for display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTotals {
    pub calories: i64,
    pub protein: i64,
    pub fat: i64,
    pub carbs: i64,
}

impl DailyTotals {
    pub fn display(&self) -> DisplayTotals {
        DisplayTotals {
            calories: self.calories,
            protein: self.protein.round() as i64,
            fat: self.fat.round() as i64,
            carbs: self.carbs.round() as i64,
        }
    }
}

/// Intake measured against the daily target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Target minus eaten; negative means over target
    pub remaining_kcal: i64,
    /// 0-100
    pub percent: f64,
    pub over_target: bool,
}

/// Everything the dashboard header and meal list need for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub target_kcal: i64,
    pub totals: DailyTotals,
    pub display: DisplayTotals,
    pub progress: Progress,
    /// Meals for the day, newest first
    pub meals: Vec<MealEntry>,
}

/// One point of the weight chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub weight_kg: f64,
}

/// Weight series plus the goal line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTrend {
    pub points: Vec<TrendPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_weight_kg: Option<f64>,
}
