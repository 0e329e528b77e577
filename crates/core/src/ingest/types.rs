//! Ingestion data types.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use chrono::NaiveDate;
use pokeria_shared::config::{ColumnsConfig, InputConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One day of restaurant figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// Calendar date.
    pub date: NaiveDate,
    /// Daily revenue, absent when the cell was empty or unparseable.
    pub revenue: Option<Decimal>,
    /// Daily employee cost, absent when the cell was empty or unparseable.
    pub employee_cost: Option<Decimal>,
    /// Ingredient purchase amounts booked on this day.
    pub purchases: BTreeMap<String, Decimal>,
    /// Products sold (bowls per size).
    pub products: BTreeMap<String, Decimal>,
    /// Extra items sold on top of a product.
    pub extras: BTreeMap<String, Decimal>,
}

impl DailyRecord {
    /// Creates a record with no figures for the given date.
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            revenue: None,
            employee_cost: None,
            purchases: BTreeMap::new(),
            products: BTreeMap::new(),
            extras: BTreeMap::new(),
        }
    }

    /// Revenue with absent treated as zero.
    #[must_use]
    pub fn revenue_or_zero(&self) -> Decimal {
        self.revenue.unwrap_or_default()
    }

    /// Employee cost with absent treated as zero.
    #[must_use]
    pub fn employee_cost_or_zero(&self) -> Decimal {
        self.employee_cost.unwrap_or_default()
    }

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

/// Sums decimals, clamping at `Decimal::MAX` / `Decimal::MIN` instead of panicking.
pub fn saturating_sum(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values
        .into_iter()
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Counters describing what ingestion kept and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Data rows read after the header.
    pub rows_read: usize,
    /// Rows turned into records.
    pub rows_kept: usize,
    /// Rows with every field empty.
    pub dropped_empty: usize,
    /// Rows whose date did not parse.
    pub dropped_bad_date: usize,
    /// Rows without revenue under a `require_revenue` policy.
    pub dropped_missing_revenue: usize,
    /// Rows that replaced an earlier row with the same date.
    pub duplicates_replaced: usize,
}

/// Normalised daily records keyed by date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Records by date; at most one per date.
    pub records: BTreeMap<NaiveDate, DailyRecord>,
    /// Ingredient columns, in header order.
    pub ingredients: Vec<String>,
    /// Product columns, in header order.
    pub products: Vec<String>,
    /// Extra-item columns, in header order.
    pub extras: Vec<String>,
    /// Ingestion counters.
    pub stats: IngestStats,
}

impl Dataset {
    /// Builds a dataset from records, deriving column lists from their keys.
    ///
    /// Later records replace earlier ones with the same date.
    pub fn from_records(records: impl IntoIterator<Item = DailyRecord>) -> Self {
        let mut ingredients = BTreeSet::new();
        let mut products = BTreeSet::new();
        let mut extras = BTreeSet::new();
        let mut by_date = BTreeMap::new();

        for record in records {
            ingredients.extend(record.purchases.keys().cloned());
            products.extend(record.products.keys().cloned());
            extras.extend(record.extras.keys().cloned());
            by_date.insert(record.date, record);
        }

        Self {
            stats: IngestStats {
                rows_read: by_date.len(),
                rows_kept: by_date.len(),
                ..IngestStats::default()
            },
            records: by_date,
            ingredients: ingredients.into_iter().collect(),
            products: products.into_iter().collect(),
            extras: extras.into_iter().collect(),
        }
    }

    /// Returns true if no record survived ingestion.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest record date.
    #[must_use]
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.keys().next().copied()
    }

    /// Latest record date.
    #[must_use]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.keys().next_back().copied()
    }

    /// Records whose date falls in the inclusive range, ascending.
    ///
    /// An inverted range yields nothing.
    pub fn records_in(
        &self,
        range: RangeInclusive<NaiveDate>,
    ) -> impl Iterator<Item = &DailyRecord> + '_ {
        let (start, end) = range.into_inner();
        (start <= end)
            .then(|| self.records.range(start..=end))
            .into_iter()
            .flatten()
            .map(|(_, record)| record)
    }

    /// Purchase events for one ingredient, ascending by date.
    ///
    /// Only strictly positive amounts count as purchases.
    #[must_use]
    pub fn purchase_events(&self, ingredient: &str) -> Vec<PurchaseEvent> {
        self.records
            .values()
            .filter_map(|record| {
                record
                    .purchases
                    .get(ingredient)
                    .filter(|amount| **amount > Decimal::ZERO)
                    .map(|amount| PurchaseEvent {
                        date: record.date,
                        amount: *amount,
                    })
            })
            .collect()
    }
}

/// A dated, positive restocking amount for one ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseEvent {
    /// Purchase date.
    pub date: NaiveDate,
    /// Purchase amount, always positive.
    pub amount: Decimal,
}

/// Role of a header column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// The date column.
    Date,
    /// Daily revenue.
    Revenue,
    /// Daily employee cost.
    EmployeeCost,
    /// Product sales count.
    Product,
    /// Extra-item sales count.
    Extra,
    /// Skipped column.
    Ignored,
    /// Ingredient purchase amount.
    Ingredient,
}

/// Column naming for the daily table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Date column name.
    pub date: String,
    /// Revenue column name.
    pub revenue: String,
    /// Employee cost column name.
    pub employee_cost: String,
    /// Product column names.
    pub products: Vec<String>,
    /// Extra-item column names.
    pub extras: Vec<String>,
    /// Column names to skip.
    pub ignored: Vec<String>,
}

impl ColumnLayout {
    /// Classifies a header name. Unknown names are ingredients.
    #[must_use]
    pub fn classify(&self, header: &str) -> ColumnRole {
        if header == self.date {
            ColumnRole::Date
        } else if header == self.revenue {
            ColumnRole::Revenue
        } else if header == self.employee_cost {
            ColumnRole::EmployeeCost
        } else if self.products.iter().any(|p| p == header) {
            ColumnRole::Product
        } else if self.extras.iter().any(|e| e == header) {
            ColumnRole::Extra
        } else if header.is_empty() || self.ignored.iter().any(|i| i == header) {
            ColumnRole::Ignored
        } else {
            ColumnRole::Ingredient
        }
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self::from(&ColumnsConfig::default())
    }
}

impl From<&ColumnsConfig> for ColumnLayout {
    fn from(config: &ColumnsConfig) -> Self {
        Self {
            date: config.date.clone(),
            revenue: config.revenue.clone(),
            employee_cost: config.employee_cost.clone(),
            products: config.products.clone(),
            extras: config.extras.clone(),
            ignored: config.ignored.clone(),
        }
    }
}

/// Row acceptance and parsing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestPolicy {
    /// Drop rows without a revenue figure.
    pub require_revenue: bool,
    /// Accept a comma as decimal separator.
    pub decimal_comma: bool,
    /// Field delimiter byte.
    pub delimiter: u8,
}

impl Default for IngestPolicy {
    fn default() -> Self {
        Self {
            require_revenue: false,
            decimal_comma: false,
            delimiter: b';',
        }
    }
}

impl From<&InputConfig> for IngestPolicy {
    fn from(config: &InputConfig) -> Self {
        Self {
            require_revenue: config.require_revenue,
            decimal_comma: config.decimal_comma,
            delimiter: u8::try_from(u32::from(config.delimiter)).unwrap_or(b';'),
        }
    }
}
