//! Application configuration management.
//!
//! Every section carries serde defaults, so an empty configuration is valid and
//! reproduces the layout of the daily CSV the restaurants export today.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Input file configuration.
    #[serde(default)]
    pub input: InputConfig,
    /// Column naming configuration.
    #[serde(default)]
    pub columns: ColumnsConfig,
    /// Critical-day thresholds.
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    /// Cost distribution configuration.
    #[serde(default)]
    pub distribution: DistributionConfig,
    /// Report output configuration.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Input file configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Path to the daily CSV.
    #[serde(default = "default_input_path")]
    pub path: String,
    /// Field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Accept `12,50` as `12.50`.
    #[serde(default)]
    pub decimal_comma: bool,
    /// Drop rows that carry no revenue figure.
    #[serde(default)]
    pub require_revenue: bool,
}

fn default_input_path() -> String {
    "data/daily.csv".to_string()
}

fn default_delimiter() -> char {
    ';'
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            delimiter: default_delimiter(),
            decimal_comma: false,
            require_revenue: false,
        }
    }
}

/// Column naming configuration.
///
/// Any header not named here is treated as an ingredient purchase column.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnsConfig {
    /// Date column.
    #[serde(default = "default_date_column")]
    pub date: String,
    /// Daily revenue column.
    #[serde(default = "default_revenue_column")]
    pub revenue: String,
    /// Daily employee cost column.
    #[serde(default = "default_employee_column")]
    pub employee_cost: String,
    /// Product sales columns (bowls sold per size).
    #[serde(default = "default_product_columns")]
    pub products: Vec<String>,
    /// Extra-item sales columns (toppings sold on top of a bowl).
    #[serde(default = "default_extra_columns")]
    pub extras: Vec<String>,
    /// Columns to skip entirely.
    #[serde(default)]
    pub ignored: Vec<String>,
}

fn default_date_column() -> String {
    "data".to_string()
}

fn default_revenue_column() -> String {
    "fatturato".to_string()
}

fn default_employee_column() -> String {
    "Dipendente".to_string()
}

fn default_product_columns() -> Vec<String> {
    ["poke_regular", "poke_maxi", "poke_baby", "fruit_bowl"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_extra_columns() -> Vec<String> {
    [
        "Avocado_venduto",
        "Feta_venduto",
        "Philad_venduto",
        "Gomawak_venduto",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            date: default_date_column(),
            revenue: default_revenue_column(),
            employee_cost: default_employee_column(),
            products: default_product_columns(),
            extras: default_extra_columns(),
            ignored: Vec::new(),
        }
    }
}

/// Critical-day thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdsConfig {
    /// Ingredient cost share of revenue, in percent.
    #[serde(default = "default_ingredient_pct")]
    pub ingredient_pct: Decimal,
    /// Employee cost share of revenue, in percent.
    #[serde(default = "default_employee_pct")]
    pub employee_pct: Decimal,
    /// Minimum daily revenue.
    #[serde(default = "default_revenue_floor")]
    pub revenue_floor: Decimal,
}

fn default_ingredient_pct() -> Decimal {
    Decimal::from(35)
}

fn default_employee_pct() -> Decimal {
    Decimal::from(25)
}

fn default_revenue_floor() -> Decimal {
    Decimal::from(300)
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            ingredient_pct: default_ingredient_pct(),
            employee_pct: default_employee_pct(),
            revenue_floor: default_revenue_floor(),
        }
    }
}

/// How the last purchase of an ingredient is spread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailPolicy {
    /// The last purchase is not spread at all.
    #[default]
    None,
    /// Spread evenly up to the last date of the dataset.
    DatasetEnd,
    /// Spread evenly up to 31 December of the purchase year.
    YearEnd,
}

/// Cost distribution configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistributionConfig {
    /// Tail policy for the last purchase.
    #[serde(default)]
    pub tail: TailPolicy,
    /// Round daily shares to this many decimal places.
    #[serde(default)]
    pub precision: Option<u32>,
}

/// How the comparison period is derived from the selected one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Same number of days immediately before.
    #[default]
    PrecedingSpan,
    /// Same calendar range one year earlier.
    PriorYear,
}

/// Report output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Directory receiving `daily_kpi.csv` and `summary.json`.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// First day of the headline period. Defaults to the first dataset date.
    #[serde(default)]
    pub start: Option<NaiveDate>,
    /// Last day of the headline period. Defaults to the last dataset date.
    #[serde(default)]
    pub end: Option<NaiveDate>,
    /// Comparison period derivation.
    #[serde(default)]
    pub comparison: ComparisonMode,
    /// Number of ingredients in the spend ranking.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_output_dir() -> String {
    "out".to_string()
}

fn default_top_n() -> usize {
    5
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            start: None,
            end: None,
            comparison: ComparisonMode::default(),
            top_n: default_top_n(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from `.env`, config files and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("POKERIA").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Parses configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or has wrong types.
    pub fn from_toml(text: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Checks values the type system cannot.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` describing the first offending field.
    pub fn validate(&self) -> AppResult<()> {
        if !self.input.delimiter.is_ascii() {
            return Err(AppError::Validation(format!(
                "input.delimiter must be an ASCII character, got {:?}",
                self.input.delimiter
            )));
        }

        let thresholds = [
            ("thresholds.ingredient_pct", self.thresholds.ingredient_pct),
            ("thresholds.employee_pct", self.thresholds.employee_pct),
            ("thresholds.revenue_floor", self.thresholds.revenue_floor),
        ];
        for (name, value) in thresholds {
            if value.is_sign_negative() {
                return Err(AppError::Validation(format!(
                    "{name} cannot be negative, got {value}"
                )));
            }
        }

        if let (Some(start), Some(end)) = (self.report.start, self.report.end)
            && start > end
        {
            return Err(AppError::Validation(format!(
                "report.start {start} is after report.end {end}"
            )));
        }

        if self.report.top_n == 0 {
            return Err(AppError::Validation(
                "report.top_n must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
