//! Configuration
//!
//! Calculator constants and the fallback policy. Defaults follow the
//! published Mifflin-St Jeor setup; a JSON file or `FITAI_*` environment
//! variables may override them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ComputeError;
use crate::types::MacroSplit;

/// Fixed daily deficit used when no goal applies (kcal)
pub const DEFAULT_DEFICIT_KCAL: f64 = 500.0;

/// Energy stored in one kilogram of body mass (kcal)
pub const KCAL_PER_KG: f64 = 7700.0;

/// Lowest target ever emitted for women (kcal)
pub const FEMALE_FLOOR_KCAL: i64 = 1200;

/// Lowest target ever emitted for men (kcal)
pub const MALE_FLOOR_KCAL: i64 = 1500;

/// Constant used by the legacy dashboard when a profile was incomplete
pub const LEGACY_FALLBACK_KCAL: i64 = 2000;

/// What to do when a profile is missing required fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Report `InvalidProfile` to the caller
    #[default]
    Strict,
    /// Substitute a constant daily target
    Constant { kcal: i64 },
}

impl FallbackPolicy {
    /// The dashboard's historical behaviour
    pub fn legacy() -> Self {
        FallbackPolicy::Constant {
            kcal: LEGACY_FALLBACK_KCAL,
        }
    }

    pub fn constant_kcal(&self) -> Option<i64> {
        match self {
            FallbackPolicy::Strict => None,
            FallbackPolicy::Constant { kcal } => Some(*kcal),
        }
    }
}

/// Constants for the target calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    pub deficit_kcal: f64,
    pub kcal_per_kg: f64,
    pub female_floor_kcal: i64,
    pub male_floor_kcal: i64,
    pub fallback: FallbackPolicy,
    pub macro_split: MacroSplit,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            deficit_kcal: DEFAULT_DEFICIT_KCAL,
            kcal_per_kg: KCAL_PER_KG,
            female_floor_kcal: FEMALE_FLOOR_KCAL,
            male_floor_kcal: MALE_FLOOR_KCAL,
            fallback: FallbackPolicy::Strict,
            macro_split: MacroSplit::default(),
        }
    }
}

/// Top-level configuration for a [`crate::tracker::Tracker`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub calculator: CalculatorConfig,
    /// Record a weight sample for today whenever the profile is saved
    pub record_weight_on_save: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackerConfig {
    pub fn new() -> Self {
        Self {
            calculator: CalculatorConfig::default(),
            record_weight_on_save: true,
        }
    }

    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ComputeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ComputeError::ConfigError(format!("{}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    /// Apply `FITAI_*` environment overrides
    pub fn with_env_overrides(self) -> Result<Self, ComputeError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ComputeError> {
        if let Some(raw) = lookup("FITAI_FALLBACK_KCAL") {
            self.calculator.fallback = match raw.trim() {
                "" | "strict" => FallbackPolicy::Strict,
                value => FallbackPolicy::Constant {
                    kcal: parse_env("FITAI_FALLBACK_KCAL", value)?,
                },
            };
        }
        if let Some(raw) = lookup("FITAI_DEFICIT_KCAL") {
            self.calculator.deficit_kcal = parse_env("FITAI_DEFICIT_KCAL", raw.trim())?;
        }
        if let Some(raw) = lookup("FITAI_RECORD_WEIGHT") {
            self.record_weight_on_save = parse_env("FITAI_RECORD_WEIGHT", raw.trim())?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        let calc = &self.calculator;
        if !calc.deficit_kcal.is_finite() || calc.deficit_kcal < 0.0 {
            return Err(ComputeError::ConfigError(format!(
                "deficit_kcal must be non-negative, got {}",
                calc.deficit_kcal
            )));
        }
        if !calc.kcal_per_kg.is_finite() || calc.kcal_per_kg <= 0.0 {
            return Err(ComputeError::ConfigError(format!(
                "kcal_per_kg must be positive, got {}",
                calc.kcal_per_kg
            )));
        }
        if let Some(kcal) = calc.fallback.constant_kcal() {
            if kcal <= 0 {
                return Err(ComputeError::ConfigError(format!(
                    "fallback kcal must be positive, got {kcal}"
                )));
            }
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ComputeError> {
    value
        .parse()
        .map_err(|_| ComputeError::ConfigError(format!("{key}: cannot parse '{value}'")))
}
