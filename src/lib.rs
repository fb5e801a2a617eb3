//! FitAI Core - Deterministic calorie target and daily intake engine
//!
//! The core behind the FitAI nutrition tracker: a pure calculator that turns
//! body metrics and a weight goal into a daily calorie and macro target, and a
//! stateless aggregator that totals a day of logged meals against it.
//!
//! ## Modules
//!
//! - **Target**: Mifflin-St Jeor maintenance, goal pacing, safety floor, macros
//! - **Aggregator**: per-day meal filtering, totals and progress
//! - **Tracker**: profile save / day summary / meal log over a [`store`] backend

pub mod aggregator;
pub mod config;
pub mod error;
pub mod estimate;
pub mod history;
pub mod store;
pub mod target;
pub mod tracker;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use aggregator::{aggregate, filter_by_day, progress, DailyAggregator};
pub use config::{CalculatorConfig, FallbackPolicy, TrackerConfig};
pub use error::ComputeError;
pub use estimate::NutritionEstimate;
pub use history::WeightHistory;
pub use store::{MealStore, MemoryStore, ProfileStore, WeightHistoryStore};
pub use target::TargetCalculator;
pub use tracker::Tracker;

/// Crate version reported by the CLI and FFI
pub const FITAI_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name used in CLI reports
pub const PRODUCER_NAME: &str = "fitai-core";
