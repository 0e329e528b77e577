//! Delimited export of the derived daily table.
//!
//! One row per record date. Money and percentages are rounded to two
//! decimals here and nowhere else; sold quantities are written as ingested.

use std::collections::BTreeMap;
use std::io::Write;

use pokeria_shared::AppError;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::ingest::Dataset;
use crate::kpi::DailyKpi;

/// Failures while writing the daily table.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The underlying writer failed.
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV writer rejected a record.
    #[error("Failed to encode CSV: {0}")]
    Csv(String),
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(io) => Self::Io(io),
            _ => Self::Csv(message),
        }
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        Self::Io(err.to_string())
    }
}

const LEADING: [&str; 3] = ["date", "revenue", "employee_cost"];
const TRAILING: [&str; 5] = [
    "total_ingredient_cost",
    "pct_ingredient",
    "pct_employee",
    "estimated_profit",
    "is_critical",
];

/// Header row for the dataset's columns.
#[must_use]
pub fn daily_table_header(dataset: &Dataset) -> Vec<String> {
    LEADING
        .iter()
        .map(|name| (*name).to_string())
        .chain(dataset.ingredients.iter().cloned())
        .chain(dataset.products.iter().cloned())
        .chain(dataset.extras.iter().cloned())
        .chain(TRAILING.iter().map(|name| (*name).to_string()))
        .collect()
}

/// Writes `daily` as a delimited table with a header row.
///
/// Column order: date (ISO), revenue, employee cost, one column per
/// ingredient (purchase booked that day), per product, per extra, then the
/// derived KPIs. Absent values are written as empty cells.
///
/// # Errors
///
/// Returns `ExportError` if the writer fails.
pub fn write_daily_table<W: Write>(
    writer: W,
    dataset: &Dataset,
    daily: &[DailyKpi],
    delimiter: u8,
) -> Result<(), ExportError> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    out.write_record(daily_table_header(dataset))?;
    for day in daily {
        out.write_record(row(dataset, day))?;
    }
    out.flush()?;
    Ok(())
}

fn row(dataset: &Dataset, day: &DailyKpi) -> Vec<String> {
    let mut cells = Vec::with_capacity(
        LEADING.len()
            + dataset.ingredients.len()
            + dataset.products.len()
            + dataset.extras.len()
            + TRAILING.len(),
    );

    cells.push(day.date.format("%Y-%m-%d").to_string());
    cells.push(day.revenue.map(money).unwrap_or_default());
    cells.push(day.employee_cost.map(money).unwrap_or_default());
    cells.extend(lookup(&dataset.ingredients, &day.purchases, money));
    cells.extend(lookup(&dataset.products, &day.products, quantity));
    cells.extend(lookup(&dataset.extras, &day.extras, quantity));
    cells.push(money(day.total_ingredient_cost));
    cells.push(money(day.pct_ingredient));
    cells.push(money(day.pct_employee));
    cells.push(money(day.estimated_profit));
    cells.push(day.is_critical.to_string());
    cells
}

fn lookup<'a>(
    columns: &'a [String],
    values: &'a BTreeMap<String, Decimal>,
    format: fn(Decimal) -> String,
) -> impl Iterator<Item = String> + 'a {
    columns
        .iter()
        .map(move |column| values.get(column).copied().map(format).unwrap_or_default())
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn quantity(value: Decimal) -> String {
    value.normalize().to_string()
}
