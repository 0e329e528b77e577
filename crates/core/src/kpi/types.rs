//! KPI data types.

use std::collections::BTreeMap;

use chrono::{Days, Months, NaiveDate};
use pokeria_shared::config::{ComparisonMode, ThresholdsConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::KpiError;
use crate::ingest::saturating_sum;

/// Thresholds above (or below) which a day is critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalThresholds {
    /// Ingredient cost share of revenue, in percent.
    pub ingredient_pct_threshold: Decimal,
    /// Employee cost share of revenue, in percent.
    pub employee_pct_threshold: Decimal,
    /// Minimum healthy daily revenue.
    pub revenue_floor: Decimal,
}

impl CriticalThresholds {
    /// The stricter 25 / 20 / 450 preset used by some restaurants.
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            ingredient_pct_threshold: Decimal::from(25),
            employee_pct_threshold: Decimal::from(20),
            revenue_floor: Decimal::from(450),
        }
    }

    /// Returns true if any threshold is crossed.
    #[must_use]
    pub fn is_critical(
        &self,
        revenue: Decimal,
        pct_ingredient: Decimal,
        pct_employee: Decimal,
    ) -> bool {
        pct_ingredient > self.ingredient_pct_threshold
            || pct_employee > self.employee_pct_threshold
            || revenue < self.revenue_floor
    }
}

impl Default for CriticalThresholds {
    fn default() -> Self {
        Self::from(&ThresholdsConfig::default())
    }
}

impl From<&ThresholdsConfig> for CriticalThresholds {
    fn from(config: &ThresholdsConfig) -> Self {
        Self {
            ingredient_pct_threshold: config.ingredient_pct,
            employee_pct_threshold: config.employee_pct,
            revenue_floor: config.revenue_floor,
        }
    }
}

/// Closed calendar range, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range.
    ///
    /// # Errors
    ///
    /// Returns `KpiError::InvalidDateRange` if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, KpiError> {
        if start > end {
            return Err(KpiError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// First day.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day, inclusive.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered.
    #[must_use]
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The range of equal length ending the day before `start`.
    ///
    /// # Errors
    ///
    /// Returns `KpiError::DateOutOfRange` at the start of the calendar.
    pub fn preceding(&self) -> Result<Self, KpiError> {
        let out_of_range = || KpiError::DateOutOfRange(self.start);
        let end = self.start.pred_opt().ok_or_else(out_of_range)?;
        let span = u64::try_from(self.len_days() - 1).map_err(|_| out_of_range())?;
        let start = end.checked_sub_days(Days::new(span)).ok_or_else(out_of_range)?;
        Ok(Self { start, end })
    }

    /// The same calendar range one year earlier; 29 February maps to 28.
    ///
    /// # Errors
    ///
    /// Returns `KpiError::DateOutOfRange` at the start of the calendar.
    pub fn prior_year(&self) -> Result<Self, KpiError> {
        let shift = |date: NaiveDate| {
            date.checked_sub_months(Months::new(12))
                .ok_or(KpiError::DateOutOfRange(date))
        };
        Ok(Self {
            start: shift(self.start)?,
            end: shift(self.end)?,
        })
    }

    /// The comparison range for the given mode.
    ///
    /// # Errors
    ///
    /// Returns `KpiError::DateOutOfRange` at the start of the calendar.
    pub fn previous(&self, mode: ComparisonMode) -> Result<Self, KpiError> {
        match mode {
            ComparisonMode::PrecedingSpan => self.preceding(),
            ComparisonMode::PriorYear => self.prior_year(),
        }
    }
}

/// Per-day KPIs plus the inputs they were derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyKpi {
    /// Calendar date.
    pub date: NaiveDate,
    /// Revenue as ingested.
    pub revenue: Option<Decimal>,
    /// Employee cost as ingested.
    pub employee_cost: Option<Decimal>,
    /// Sum of distributed ingredient cost.
    pub total_ingredient_cost: Decimal,
    /// Ingredient cost as a percentage of revenue.
    pub pct_ingredient: Decimal,
    /// Employee cost as a percentage of revenue.
    pub pct_employee: Decimal,
    /// Revenue minus ingredient and employee cost.
    pub estimated_profit: Decimal,
    /// Whether any critical threshold was crossed.
    pub is_critical: bool,
    /// Purchases booked on this day, as ingested.
    pub purchases: BTreeMap<String, Decimal>,
    /// Products sold, as ingested.
    pub products: BTreeMap<String, Decimal>,
    /// Extra items sold, as ingested.
    pub extras: BTreeMap<String, Decimal>,
}

impl DailyKpi {
    /// Total products sold.
    #[must_use]
    pub fn items_sold(&self) -> Decimal {
        saturating_sum(self.products.values().copied())
    }

    /// Total extra items sold.
    #[must_use]
    pub fn extras_sold(&self) -> Decimal {
        saturating_sum(self.extras.values().copied())
    }
}

/// Aggregates over a closed period.
///
/// Percentages are computed from the summed totals, not averaged daily.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSummary {
    /// First day of the period.
    pub start: NaiveDate,
    /// Last day of the period.
    pub end: NaiveDate,
    /// Days with a record.
    pub days: usize,
    /// Total revenue.
    pub revenue: Decimal,
    /// Total distributed ingredient cost.
    pub ingredient_cost: Decimal,
    /// Total employee cost.
    pub employee_cost: Decimal,
    /// Revenue minus both costs.
    pub estimated_profit: Decimal,
    /// Ingredient cost share of revenue, 2 decimals.
    pub pct_ingredient: Decimal,
    /// Employee cost share of revenue, 2 decimals.
    pub pct_employee: Decimal,
    /// Days flagged critical.
    pub critical_days: usize,
    /// Products sold.
    pub items_sold: Decimal,
    /// Revenue per product sold, 2 decimals.
    pub revenue_per_item: Decimal,
    /// Ingredient cost per product sold, 2 decimals.
    pub ingredient_cost_per_item: Decimal,
    /// Extra items sold per ten products, 1 decimal.
    pub extras_per_ten_items: Decimal,
}

/// Signed differences `current - previous`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDelta {
    /// Revenue change.
    pub revenue: Decimal,
    /// Ingredient cost change.
    pub ingredient_cost: Decimal,
    /// Employee cost change.
    pub employee_cost: Decimal,
    /// Estimated profit change.
    pub estimated_profit: Decimal,
    /// Ingredient share change, in percentage points.
    pub pct_ingredient: Decimal,
    /// Employee share change, in percentage points.
    pub pct_employee: Decimal,
    /// Critical day count change.
    pub critical_days: i64,
    /// Products sold change.
    pub items_sold: Decimal,
}

impl PeriodDelta {
    /// Computes `current - previous`.
    #[must_use]
    pub fn between(current: &PeriodSummary, previous: &PeriodSummary) -> Self {
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        Self {
            revenue: current.revenue.saturating_sub(previous.revenue),
            ingredient_cost: current.ingredient_cost.saturating_sub(previous.ingredient_cost),
            employee_cost: current.employee_cost.saturating_sub(previous.employee_cost),
            estimated_profit: current.estimated_profit.saturating_sub(previous.estimated_profit),
            pct_ingredient: current.pct_ingredient.saturating_sub(previous.pct_ingredient),
            pct_employee: current.pct_employee.saturating_sub(previous.pct_employee),
            critical_days: count(current.critical_days) - count(previous.critical_days),
            items_sold: current.items_sold.saturating_sub(previous.items_sold),
        }
    }
}

/// A period compared with its derived predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodComparison {
    /// How the previous period was derived.
    pub mode: ComparisonMode,
    /// Selected period.
    pub current: PeriodSummary,
    /// Derived previous period.
    pub previous: PeriodSummary,
    /// `current - previous`.
    pub delta: PeriodDelta,
}

/// Ingredient ranked by spend within a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientSpend {
    /// Ingredient name.
    pub ingredient: String,
    /// Mean distributed cost per record day.
    pub mean_daily_cost: Decimal,
    /// Total distributed cost over record days.
    pub total_cost: Decimal,
}

/// One calendar year of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSummary {
    /// Calendar year.
    pub year: i32,
    /// Aggregates over the records of that year.
    pub summary: PeriodSummary,
}
