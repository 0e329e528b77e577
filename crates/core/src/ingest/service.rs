//! Daily table ingestion.

use std::collections::HashSet;
use std::io::Read;

use tracing::{debug, info, warn};

use super::error::IngestionError;
use super::parse::{parse_day_first, parse_decimal};
use super::types::{ColumnLayout, ColumnRole, DailyRecord, Dataset, IngestPolicy};

/// Why a row was not turned into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Empty,
    BadDate,
    MissingRevenue,
}

/// Turns a delimited daily table into a [`Dataset`].
#[derive(Debug, Clone, Default)]
pub struct Ingestor {
    layout: ColumnLayout,
    policy: IngestPolicy,
}

impl Ingestor {
    /// Creates an ingestor for the given column layout and policy.
    #[must_use]
    pub fn new(layout: ColumnLayout, policy: IngestPolicy) -> Self {
        Self { layout, policy }
    }

    /// Reads a delimited table with a header row.
    ///
    /// Cells are decoded lossily, so a file saved in a legacy encoding only
    /// loses the odd accented character in a header.
    ///
    /// # Errors
    ///
    /// Returns `IngestionError` when the stream cannot be read, the CSV
    /// reader rejects it, the header row is missing, or the header has no
    /// date column. Per-row problems never fail ingestion.
    pub fn read<R: Read>(&self, reader: R) -> Result<Dataset, IngestionError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.policy.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .byte_headers()?
            .iter()
            .map(|field| decode(field).trim_start_matches('\u{FEFF}').to_string())
            .collect();

        if headers.iter().all(String::is_empty) {
            return Err(IngestionError::MissingHeader);
        }

        let mut rows = Vec::new();
        for result in csv_reader.byte_records() {
            let record = result?;
            rows.push(record.iter().map(decode).collect::<Vec<_>>());
        }

        self.ingest_rows(&headers, rows)
    }

    /// Normalises already-split rows against a header.
    ///
    /// # Errors
    ///
    /// Returns `IngestionError::MissingDateColumn` if the header lacks the
    /// configured date column.
    pub fn ingest_rows<I>(&self, headers: &[String], rows: I) -> Result<Dataset, IngestionError>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let headers = disambiguate(headers);
        let headers = headers.as_slice();
        let roles: Vec<ColumnRole> = headers
            .iter()
            .map(|header| self.layout.classify(header))
            .collect();

        if !roles.contains(&ColumnRole::Date) {
            return Err(IngestionError::MissingDateColumn(self.layout.date.clone()));
        }

        let mut dataset = Dataset {
            ingredients: names_with_role(headers, &roles, ColumnRole::Ingredient),
            products: names_with_role(headers, &roles, ColumnRole::Product),
            extras: names_with_role(headers, &roles, ColumnRole::Extra),
            ..Dataset::default()
        };

        for (index, row) in rows.into_iter().enumerate() {
            // Header is line 1.
            let line = index + 2;
            dataset.stats.rows_read += 1;

            match self.normalize_row(headers, &roles, &row) {
                Ok(record) => {
                    let date = record.date;
                    if dataset.records.insert(date, record).is_some() {
                        warn!(line, %date, "Duplicate date, later row replaces earlier one");
                        dataset.stats.duplicates_replaced += 1;
                    } else {
                        dataset.stats.rows_kept += 1;
                    }
                }
                Err(rejection) => {
                    debug!(line, ?rejection, "Dropping row");
                    match rejection {
                        Rejection::Empty => dataset.stats.dropped_empty += 1,
                        Rejection::BadDate => dataset.stats.dropped_bad_date += 1,
                        Rejection::MissingRevenue => dataset.stats.dropped_missing_revenue += 1,
                    }
                }
            }
        }

        info!(
            rows_read = dataset.stats.rows_read,
            rows_kept = dataset.stats.rows_kept,
            ingredients = dataset.ingredients.len(),
            "Daily table ingested"
        );

        Ok(dataset)
    }

    fn normalize_row(
        &self,
        headers: &[String],
        roles: &[ColumnRole],
        row: &[String],
    ) -> Result<DailyRecord, Rejection> {
        if row.iter().all(|field| field.trim().is_empty()) {
            return Err(Rejection::Empty);
        }

        let cell = |index: usize| row.get(index).map_or("", String::as_str);

        let date = roles
            .iter()
            .position(|role| *role == ColumnRole::Date)
            .and_then(|index| parse_day_first(cell(index)))
            .ok_or(Rejection::BadDate)?;

        let mut record = DailyRecord::new(date);
        for (index, role) in roles.iter().enumerate() {
            let value = match role {
                ColumnRole::Date | ColumnRole::Ignored => continue,
                _ => parse_decimal(cell(index), self.policy.decimal_comma),
            };
            let Some(value) = value else {
                continue;
            };

            let name = headers[index].clone();
            match role {
                ColumnRole::Revenue => record.revenue = Some(value),
                ColumnRole::EmployeeCost => record.employee_cost = Some(value),
                ColumnRole::Product => {
                    record.products.insert(name, value);
                }
                ColumnRole::Extra => {
                    record.extras.insert(name, value);
                }
                ColumnRole::Ingredient => {
                    record.purchases.insert(name, value);
                }
                ColumnRole::Date | ColumnRole::Ignored => {}
            }
        }

        if self.policy.require_revenue && record.revenue.is_none() {
            return Err(Rejection::MissingRevenue);
        }

        Ok(record)
    }
}

/// Suffixes repeated header names with `.1`, `.2`, ... so every column keeps its data.
fn disambiguate(headers: &[String]) -> Vec<String> {
    let mut taken: HashSet<String> = headers.iter().cloned().collect();
    let mut seen: HashSet<&str> = HashSet::new();

    headers
        .iter()
        .map(|header| {
            if header.is_empty() || seen.insert(header.as_str()) {
                return header.clone();
            }
            let renamed = (1..)
                .map(|n| format!("{header}.{n}"))
                .find(|candidate| !taken.contains(candidate))
                .unwrap_or_default();
            warn!(column = %header, renamed = %renamed, "Duplicate column name");
            taken.insert(renamed.clone());
            renamed
        })
        .collect()
}

fn decode(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

fn names_with_role(headers: &[String], roles: &[ColumnRole], wanted: ColumnRole) -> Vec<String> {
    headers
        .iter()
        .zip(roles)
        .filter(|(_, role)| **role == wanted)
        .map(|(header, _)| header.clone())
        .collect()
}
