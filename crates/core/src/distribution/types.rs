//! Distributed cost types.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ingest::saturating_sum;

/// Daily shares of one purchase over consecutive calendar days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSpan {
    /// Purchase date, the first day receiving a share.
    pub start: NaiveDate,
    /// Amount that was spread.
    pub amount: Decimal,
    /// One share per day starting at `start`.
    pub daily: Vec<Decimal>,
}

impl CostSpan {
    /// First day after the span.
    #[must_use]
    pub fn end_exclusive(&self) -> NaiveDate {
        u64::try_from(self.daily.len())
            .ok()
            .and_then(|days| self.start.checked_add_days(Days::new(days)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Share attributed to `date`, if the span covers it.
    #[must_use]
    pub fn cost_on(&self, date: NaiveDate) -> Option<Decimal> {
        if date >= self.end_exclusive() {
            return None;
        }
        let offset = usize::try_from((date - self.start).num_days()).ok()?;
        self.daily.get(offset).copied()
    }

    /// Iterates over `(date, share)` pairs.
    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, Decimal)> + '_ {
        self.start
            .iter_days()
            .zip(self.daily.iter().copied())
    }
}

/// Amortised ingredient cost for every calendar day.
///
/// Spans of one ingredient are sorted by start date and never overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSchedule {
    spans: BTreeMap<String, Vec<CostSpan>>,
}

impl CostSchedule {
    /// Creates a schedule from per-ingredient spans.
    #[must_use]
    pub fn new(spans: BTreeMap<String, Vec<CostSpan>>) -> Self {
        Self { spans }
    }

    /// Spans of one ingredient, ascending by start date.
    #[must_use]
    pub fn spans(&self, ingredient: &str) -> &[CostSpan] {
        self.spans.get(ingredient).map_or(&[], Vec::as_slice)
    }

    /// Distributed cost of one ingredient on `date`. Zero when not covered.
    #[must_use]
    pub fn cost_on(&self, date: NaiveDate, ingredient: &str) -> Decimal {
        let spans = self.spans(ingredient);
        let after = spans.partition_point(|span| span.start <= date);
        after
            .checked_sub(1)
            .and_then(|index| spans[index].cost_on(date))
            .unwrap_or(Decimal::ZERO)
    }

    /// Sum of distributed cost over all ingredients on `date`.
    #[must_use]
    pub fn total_on(&self, date: NaiveDate) -> Decimal {
        saturating_sum(
            self.spans
                .keys()
                .map(|ingredient| self.cost_on(date, ingredient)),
        )
    }

    /// Sum of distributed cost of one ingredient over `[start, end)`.
    #[must_use]
    pub fn cost_between(&self, ingredient: &str, start: NaiveDate, end: NaiveDate) -> Decimal {
        saturating_sum(
            self.spans(ingredient)
                .iter()
                .flat_map(CostSpan::days)
                .filter(|(date, _)| *date >= start && *date < end)
                .map(|(_, share)| share),
        )
    }
}
