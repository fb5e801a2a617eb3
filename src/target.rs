//! Daily energy target calculation
//!
//! Resting energy uses the Mifflin-St Jeor equation, scaled by the activity
//! factor to get maintenance. A goal weight with a future goal date spreads the
//! required energy change evenly over the remaining days; otherwise a fixed
//! deficit applies. The result never drops below a sex-specific floor.
//!
//! "Today" is always passed in so the same inputs give the same target.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::config::{CalculatorConfig, FallbackPolicy};
use crate::error::ComputeError;
use crate::types::{
    EnergyTarget, MacroSplit, MacroTargets, NutritionPlan, Profile, Sex, TargetBranch,
};

/// kcal per gram of protein
pub const PROTEIN_KCAL_PER_G: f64 = 4.0;
/// kcal per gram of fat
pub const FAT_KCAL_PER_G: f64 = 9.0;
/// kcal per gram of carbohydrate
pub const CARBS_KCAL_PER_G: f64 = 4.0;

/// Validated calculator inputs
#[derive(Debug, Clone, Copy, PartialEq)]
struct BodyMetrics {
    sex: Sex,
    weight_kg: f64,
    height_cm: f64,
    age_years: u32,
    activity_factor: f64,
}

impl BodyMetrics {
    fn from_profile(profile: &Profile) -> Result<Self, ComputeError> {
        let weight_kg = require_positive("weight_kg", profile.weight_kg)?;
        let height_cm = require_positive("height_cm", profile.height_cm)?;
        let age_years = match profile.age_years {
            None => return Err(ComputeError::invalid_profile("age_years", "is missing")),
            Some(0) => return Err(ComputeError::invalid_profile("age_years", "must be positive")),
            Some(age) => age,
        };
        let activity_factor = match profile.activity_factor {
            None => return Err(ComputeError::invalid_profile("activity_factor", "is missing")),
            Some(f) if !f.is_finite() || f <= 1.0 => {
                return Err(ComputeError::invalid_profile(
                    "activity_factor",
                    format!("must be greater than 1.0, got {f}"),
                ))
            }
            Some(f) => f,
        };

        Ok(Self {
            sex: profile.sex,
            weight_kg,
            height_cm,
            age_years,
            activity_factor,
        })
    }
}

fn require_positive(field: &'static str, value: Option<f64>) -> Result<f64, ComputeError> {
    match value {
        None => Err(ComputeError::invalid_profile(field, "is missing")),
        Some(v) if !v.is_finite() || v <= 0.0 => Err(ComputeError::invalid_profile(
            field,
            format!("must be positive, got {v}"),
        )),
        Some(v) => Ok(v),
    }
}

/// Resting energy expenditure (kcal/day), Mifflin-St Jeor
pub fn resting_energy(sex: Sex, weight_kg: f64, height_cm: f64, age_years: u32) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age_years);
    match sex {
        Sex::Male => base + 5.0,
        Sex::Female => base - 161.0,
    }
}

/// Maintenance energy (kcal/day), rounded to whole kcal
pub fn maintenance_kcal(
    sex: Sex,
    weight_kg: f64,
    height_cm: f64,
    age_years: u32,
    activity_factor: f64,
) -> i64 {
    (resting_energy(sex, weight_kg, height_cm, age_years) * activity_factor).round() as i64
}

/// Split a daily energy target into macro grams
pub fn macro_targets(target_kcal: i64, split: &MacroSplit) -> Result<MacroTargets, ComputeError> {
    validate_split(split)?;

    let kcal = target_kcal.max(0) as f64;
    let grams = |pct: f64, density: f64| (kcal * pct / 100.0 / density).round() as i64;

    Ok(MacroTargets {
        protein_g: grams(split.protein_pct, PROTEIN_KCAL_PER_G),
        fat_g: grams(split.fat_pct, FAT_KCAL_PER_G),
        carbs_g: grams(split.carbs_pct, CARBS_KCAL_PER_G),
    })
}

fn validate_split(split: &MacroSplit) -> Result<(), ComputeError> {
    let parts = [split.protein_pct, split.fat_pct, split.carbs_pct];
    if parts.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(ComputeError::InvalidMacroSplit(format!(
            "percentages must be non-negative, got {parts:?}"
        )));
    }
    let total: f64 = parts.iter().sum();
    if (total - 100.0).abs() > 0.01 {
        return Err(ComputeError::InvalidMacroSplit(format!(
            "percentages must sum to 100, got {total}"
        )));
    }
    Ok(())
}

/// Calorie target calculator
#[derive(Debug, Clone, Default)]
pub struct TargetCalculator {
    config: CalculatorConfig,
}

impl TargetCalculator {
    pub fn new(config: CalculatorConfig) -> Self {
        Self { config }
    }

    /// Default constants with a specific fallback policy
    pub fn with_fallback(fallback: FallbackPolicy) -> Self {
        Self {
            config: CalculatorConfig {
                fallback,
                ..CalculatorConfig::default()
            },
        }
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    /// Compute maintenance and target energy for `profile` as of `today`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidProfile` when a required field is missing or out of
    /// range and the fallback policy is `Strict`.
    pub fn calculate(&self, profile: &Profile, today: NaiveDate) -> Result<EnergyTarget, ComputeError> {
        let metrics = match BodyMetrics::from_profile(profile) {
            Ok(metrics) => metrics,
            Err(err) => return self.apply_fallback(err),
        };

        let maintenance = maintenance_kcal(
            metrics.sex,
            metrics.weight_kg,
            metrics.height_cm,
            metrics.age_years,
            metrics.activity_factor,
        );

        let (raw_target, branch, days_remaining) = match profile.goal() {
            None => (self.flat_target(maintenance), TargetBranch::FlatDeficit, None),
            Some((target_weight, target_date)) => {
                let days = (target_date - today).num_days();
                if days <= 0 {
                    (self.flat_target(maintenance), TargetBranch::GoalElapsed, Some(days))
                } else {
                    let total_energy = (metrics.weight_kg - target_weight) * self.config.kcal_per_kg;
                    let daily_delta = total_energy / days as f64;
                    let target = (maintenance as f64 - daily_delta).round() as i64;
                    (target, TargetBranch::GoalPaced, Some(days))
                }
            }
        };

        let floor = self.floor_for(metrics.sex);
        let target_kcal = raw_target.max(floor);
        let floor_applied = target_kcal != raw_target;

        debug!(
            ?branch,
            maintenance,
            raw_target,
            target_kcal,
            floor_applied,
            "computed energy target"
        );

        Ok(EnergyTarget {
            maintenance_kcal: maintenance,
            target_kcal,
            branch,
            days_remaining,
            floor_applied,
        })
    }

    /// Energy target plus macro grams using the configured split
    pub fn plan(&self, profile: &Profile, today: NaiveDate) -> Result<NutritionPlan, ComputeError> {
        let energy = self.calculate(profile, today)?;
        let split = self.config.macro_split;
        let macros = macro_targets(energy.target_kcal, &split)?;
        Ok(NutritionPlan {
            energy,
            macros,
            split,
        })
    }

    /// Minimum daily target for `sex`
    pub fn floor_for(&self, sex: Sex) -> i64 {
        match sex {
            Sex::Female => self.config.female_floor_kcal,
            Sex::Male => self.config.male_floor_kcal,
        }
    }

    fn flat_target(&self, maintenance: i64) -> i64 {
        (maintenance as f64 - self.config.deficit_kcal).round() as i64
    }

    fn apply_fallback(&self, err: ComputeError) -> Result<EnergyTarget, ComputeError> {
        match self.config.fallback {
            FallbackPolicy::Strict => Err(err),
            FallbackPolicy::Constant { kcal } => {
                warn!(error = %err, kcal, "profile incomplete, using fallback target");
                Ok(EnergyTarget {
                    maintenance_kcal: kcal,
                    target_kcal: kcal,
                    branch: TargetBranch::Fallback,
                    days_remaining: None,
                    floor_applied: false,
                })
            }
        }
    }
}
