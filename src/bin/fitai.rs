//! FitAI CLI - Command-line interface for FitAI Core
//!
//! Commands:
//! - target: Compute the daily calorie and macro plan for a profile
//! - summary: Total a day of meals against a target
//! - trend: Build the weight chart series
//! - estimate: Turn a model reply into a meal entry
//! - profile / log / delete / day: Tracker operations over a JSON state file
//! - doctor: Diagnose configuration and state files
//! - schema: Print example input documents

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use fitai_core::history::WeightHistory;
use fitai_core::types::{ActivityLevel, MealEntry, Profile, Sex, WeightSample};
use fitai_core::{
    ComputeError, DailyAggregator, MemoryStore, NutritionEstimate, TargetCalculator, Tracker,
    TrackerConfig, FITAI_VERSION, PRODUCER_NAME,
};

/// FitAI - calorie targets and daily intake from the command line
#[derive(Parser)]
#[command(name = "fitai")]
#[command(author = "FitAI Contributors")]
#[command(version = FITAI_VERSION)]
#[command(about = "Compute calorie targets and daily intake summaries", long_about = None)]
struct Cli {
    /// Configuration file (JSON); FITAI_* environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "json-pretty")]
    output_format: OutputFormat,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the daily calorie and macro plan for a profile
    Target {
        /// Profile JSON file (use - for stdin)
        #[arg(short, long)]
        profile: PathBuf,

        /// Reference date (YYYY-MM-DD), defaults to today in UTC
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Total a day of meals against a calorie target
    Summary {
        /// Meal entries file (use - for stdin)
        #[arg(short, long)]
        meals: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Day to summarize (YYYY-MM-DD, UTC)
        #[arg(long)]
        date: NaiveDate,

        /// Daily calorie target (kcal)
        #[arg(long, default_value = "0")]
        target: i64,
    },

    /// Build the weight chart series from samples
    Trend {
        /// Weight samples file (use - for stdin)
        #[arg(short, long)]
        samples: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Weight to plot when there are no samples
        #[arg(long)]
        fallback_weight: Option<f64>,

        /// Date for the fallback point, defaults to today in UTC
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Goal weight line
        #[arg(long)]
        target_weight: Option<f64>,
    },

    /// Turn a model reply into a meal entry
    Estimate {
        /// File holding the model reply (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Owner of the meal
        #[arg(long)]
        user: String,

        /// Timestamp for the entry (RFC 3339), defaults to now
        #[arg(long)]
        created_at: Option<DateTime<Utc>>,
    },

    /// Save a profile into a state file and print the new target
    Profile {
        #[arg(long)]
        state: PathBuf,

        #[arg(long)]
        user: String,

        /// Profile JSON file (use - for stdin)
        #[arg(short, long)]
        profile: PathBuf,

        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Append a meal entry to a state file
    Log {
        #[arg(long)]
        state: PathBuf,

        /// Meal entry JSON file (use - for stdin)
        #[arg(short, long)]
        meal: PathBuf,
    },

    /// Delete a meal from a state file
    Delete {
        #[arg(long)]
        state: PathBuf,

        #[arg(long)]
        user: String,

        #[arg(long)]
        id: Uuid,
    },

    /// Day summary for a user from a state file
    Day {
        #[arg(long)]
        state: PathBuf,

        #[arg(long)]
        user: String,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Diagnose configuration and state files
    Doctor {
        /// Check a state file
        #[arg(long)]
        state: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print example input documents
    Schema {
        /// Which document to print
        #[arg(long, default_value = "all")]
        kind: SchemaKind,
    },
}

#[derive(Clone, ValueEnum)]
enum SchemaKind {
    Profile,
    Meal,
    Weight,
    All,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "fitai_core=debug,fitai=debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .init();
    }
}

fn run(cli: Cli) -> Result<(), FitaiCliError> {
    let config_path = cli.config;
    // doctor loads the config itself and reports failures as checks
    let config = || load_config(config_path.as_deref());
    let format = cli.output_format;

    match cli.command {
        Commands::Target { profile, today } => cmd_target(&config()?, &profile, today, &format),

        Commands::Summary {
            meals,
            input_format,
            date,
            target,
        } => cmd_summary(&meals, input_format, date, target, &format),

        Commands::Trend {
            samples,
            input_format,
            fallback_weight,
            today,
            target_weight,
        } => cmd_trend(&samples, input_format, fallback_weight, today, target_weight, &format),

        Commands::Estimate {
            input,
            user,
            created_at,
        } => cmd_estimate(&input, &user, created_at, &format),

        Commands::Profile {
            state,
            user,
            profile,
            today,
        } => cmd_profile(config()?, &state, &user, &profile, today, &format),

        Commands::Log { state, meal } => cmd_log(config()?, &state, &meal),

        Commands::Delete { state, user, id } => cmd_delete(config()?, &state, &user, id),

        Commands::Day { state, user, date } => cmd_day(config()?, &state, &user, date, &format),

        Commands::Doctor { state, json } => cmd_doctor(config_path.as_deref(), state.as_deref(), json),

        Commands::Schema { kind } => cmd_schema(kind, &format),
    }
}

fn load_config(path: Option<&Path>) -> Result<TrackerConfig, FitaiCliError> {
    let config = match path {
        Some(path) => TrackerConfig::from_file(path)?,
        None => TrackerConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

fn cmd_target(
    config: &TrackerConfig,
    profile_path: &Path,
    today: Option<NaiveDate>,
    format: &OutputFormat,
) -> Result<(), FitaiCliError> {
    let profile: Profile = serde_json::from_str(&read_input(profile_path)?)?;
    let today = today.unwrap_or_else(today_utc);

    let plan = TargetCalculator::new(config.calculator.clone()).plan(&profile, today)?;
    print_output(&plan, format)
}

fn cmd_summary(
    meals_path: &Path,
    input_format: InputFormat,
    date: NaiveDate,
    target: i64,
    format: &OutputFormat,
) -> Result<(), FitaiCliError> {
    let meals: Vec<MealEntry> = parse_records(&read_input(meals_path)?, &input_format)?;
    debug!(meals = meals.len(), %date, "summarizing");

    let summary = DailyAggregator::summarize(&meals, date, target);
    print_output(&summary, format)
}

fn cmd_trend(
    samples_path: &Path,
    input_format: InputFormat,
    fallback_weight: Option<f64>,
    today: Option<NaiveDate>,
    target_weight: Option<f64>,
    format: &OutputFormat,
) -> Result<(), FitaiCliError> {
    let samples: Vec<WeightSample> = parse_records(&read_input(samples_path)?, &input_format)?;
    let history = WeightHistory::from_samples(samples)?;

    let trend = history.trend(fallback_weight, today.unwrap_or_else(today_utc), target_weight);
    print_output(&trend, format)
}

fn cmd_estimate(
    input: &Path,
    user: &str,
    created_at: Option<DateTime<Utc>>,
    format: &OutputFormat,
) -> Result<(), FitaiCliError> {
    let reply = read_input(input)?;
    let estimate = NutritionEstimate::from_reply(&reply)?;
    let meal = estimate.into_meal(user, created_at.unwrap_or_else(Utc::now));
    print_output(&meal, format)
}

fn cmd_profile(
    config: TrackerConfig,
    state: &Path,
    user: &str,
    profile_path: &Path,
    today: Option<NaiveDate>,
    format: &OutputFormat,
) -> Result<(), FitaiCliError> {
    let profile: Profile = serde_json::from_str(&read_input(profile_path)?)?;
    let mut tracker = open_tracker(config, state)?;

    let target = tracker.save_profile(user, profile, today.unwrap_or_else(today_utc))?;
    save_state(tracker, state)?;
    print_output(&target, format)
}

fn cmd_log(config: TrackerConfig, state: &Path, meal_path: &Path) -> Result<(), FitaiCliError> {
    let meal: MealEntry = serde_json::from_str(&read_input(meal_path)?)?;
    let mut tracker = open_tracker(config, state)?;

    let id = tracker.log_meal(meal)?;
    save_state(tracker, state)?;
    println!("{id}");
    Ok(())
}

fn cmd_delete(config: TrackerConfig, state: &Path, user: &str, id: Uuid) -> Result<(), FitaiCliError> {
    let mut tracker = open_tracker(config, state)?;

    if !tracker.delete_meal(user, id)? {
        return Err(FitaiCliError::MealNotFound(id));
    }
    save_state(tracker, state)
}

fn cmd_day(
    config: TrackerConfig,
    state: &Path,
    user: &str,
    date: Option<NaiveDate>,
    format: &OutputFormat,
) -> Result<(), FitaiCliError> {
    let tracker = open_tracker(config, state)?;
    let summary = tracker.day_summary(user, date.unwrap_or_else(today_utc))?;
    print_output(&summary, format)
}

fn cmd_doctor(config: Option<&Path>, state: Option<&Path>, json: bool) -> Result<(), FitaiCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("fitai-core version {}", FITAI_VERSION),
    });

    checks.push(match load_config(config) {
        Ok(cfg) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: match cfg.calculator.fallback.constant_kcal() {
                Some(kcal) => format!("Config valid (fallback target {kcal} kcal)"),
                None => "Config valid (strict profile validation)".to_string(),
            },
        },
        Err(e) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: CliError::from(e).message,
        },
    });

    if let Some(state_path) = state {
        let check = if !state_path.exists() {
            DoctorCheck {
                name: "state".to_string(),
                status: CheckStatus::Warning,
                message: "State file does not exist (will be created on first write)".to_string(),
            }
        } else {
            match fs::read_to_string(state_path) {
                Ok(content) => match MemoryStore::from_json(&content) {
                    Ok(store) => DoctorCheck {
                        name: "state".to_string(),
                        status: CheckStatus::Ok,
                        message: format!("State file valid ({} meals)", store.meal_count()),
                    },
                    Err(e) => DoctorCheck {
                        name: "state".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid state JSON: {}", e),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "state".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read state file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: if atty::is(atty::Stream::Stdin) {
            "stdin is a TTY (pass files with --profile/--meals)".to_string()
        } else {
            "stdin is a pipe (- inputs ready)".to_string()
        },
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FITAI_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("FitAI Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    if report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error)) {
        Err(FitaiCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(kind: SchemaKind, format: &OutputFormat) -> Result<(), FitaiCliError> {
    let examples = SchemaExamples::sample();
    match kind {
        SchemaKind::Profile => print_output(&examples.profile, format),
        SchemaKind::Meal => print_output(&examples.meal, format),
        SchemaKind::Weight => print_output(&examples.weight, format),
        SchemaKind::All => print_output(&examples, format),
    }
}

// Helper functions

fn read_input(path: &Path) -> Result<String, FitaiCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn parse_records<T: serde::de::DeserializeOwned>(
    data: &str,
    format: &InputFormat,
) -> Result<Vec<T>, FitaiCliError> {
    match format {
        InputFormat::Json => Ok(serde_json::from_str(data)?),
        InputFormat::Ndjson => data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .map_err(|e| FitaiCliError::ParseError(format!("line {}: {}", i + 1, e)))
            })
            .collect(),
    }
}

fn open_tracker(config: TrackerConfig, state: &Path) -> Result<Tracker<MemoryStore>, FitaiCliError> {
    let store = if state.exists() {
        MemoryStore::from_json(&fs::read_to_string(state)?)?
    } else {
        MemoryStore::new()
    };
    Ok(Tracker::with_config(store, config))
}

fn save_state(tracker: Tracker<MemoryStore>, state: &Path) -> Result<(), FitaiCliError> {
    let json = tracker.into_store().to_json()?;
    fs::write(state, json)?;
    Ok(())
}

fn print_output<T: Serialize>(value: &T, format: &OutputFormat) -> Result<(), FitaiCliError> {
    let output = match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
    };
    println!("{}", output);
    Ok(())
}

// Error types

#[derive(Debug)]
enum FitaiCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    MealNotFound(Uuid),
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for FitaiCliError {
    fn from(e: io::Error) -> Self {
        FitaiCliError::Io(e)
    }
}

impl From<ComputeError> for FitaiCliError {
    fn from(e: ComputeError) -> Self {
        FitaiCliError::Compute(e)
    }
}

impl From<serde_json::Error> for FitaiCliError {
    fn from(e: serde_json::Error) -> Self {
        FitaiCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FitaiCliError> for CliError {
    fn from(e: FitaiCliError) -> Self {
        match e {
            FitaiCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FitaiCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::InvalidProfile { .. } => (
                        "INVALID_PROFILE",
                        "Complete weight, height, age and activity, or configure a fallback target",
                    ),
                    ComputeError::ConfigError(_) => ("CONFIG_ERROR", "Check the config file and FITAI_* variables"),
                    ComputeError::EstimateParse(_) => ("ESTIMATE_ERROR", "The reply must contain a JSON object"),
                    _ => ("COMPUTE_ERROR", "Check input values"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            FitaiCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FitaiCliError::MealNotFound(id) => CliError {
                code: "MEAL_NOT_FOUND".to_string(),
                message: format!("No meal {} for this user", id),
                hint: Some("Run 'fitai day' to list meal ids".to_string()),
            },
            FitaiCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            FitaiCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct SchemaExamples {
    profile: Profile,
    meal: MealEntry,
    weight: WeightSample,
}

impl SchemaExamples {
    fn sample() -> Self {
        let today = today_utc();
        let goal_date = today + chrono::Duration::days(90);
        Self {
            profile: Profile::new(Sex::Female, 68.0, 170.0, 32, ActivityLevel::Moderate)
                .with_goal(62.0, goal_date),
            meal: MealEntry::new("user-1", "Oatmeal with berries", 350, 12.0, 8.0, 55.0, Utc::now()),
            weight: WeightSample {
                weight_kg: 68.0,
                recorded_at: today,
            },
        }
    }
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_examples_are_valid_inputs() {
        let examples = serde_json::to_value(SchemaExamples::sample()).unwrap();
        assert!(examples["meal"]["id"].is_string());

        let profile: Profile = serde_json::from_value(examples["profile"].clone()).unwrap();
        let plan = TargetCalculator::default().plan(&profile, today_utc()).unwrap();
        assert!(plan.energy.target_kcal >= 1200);

        let meal: MealEntry = serde_json::from_value(examples["meal"].clone()).unwrap();
        assert!(meal.validate().is_ok());

        let weight: WeightSample = serde_json::from_value(examples["weight"].clone()).unwrap();
        assert!(WeightHistory::from_samples(vec![weight]).is_ok());
    }
}
