//! Spreading lump purchases over the days they are consumed.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use pokeria_shared::config::{DistributionConfig, TailPolicy};
use rust_decimal::Decimal;
use tracing::debug;

use super::allocation::split_evenly;
use super::types::{CostSchedule, CostSpan};
use crate::ingest::{Dataset, PurchaseEvent};

/// Converts purchase events into a daily cost estimate.
///
/// A purchase is assumed to be consumed evenly until the next purchase of the
/// same ingredient: `(d_i, a_i)` contributes `a_i / (d_{i+1} - d_i)` to every
/// day in `[d_i, d_{i+1})`. What happens after the last purchase depends on
/// the [`TailPolicy`]. An ingredient bought fewer than twice has no basis for
/// interpolation and costs zero every day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CostDistributor {
    tail: TailPolicy,
    precision: Option<u32>,
}

impl CostDistributor {
    /// Creates a distributor.
    ///
    /// With `precision` set, daily shares are rounded to that many decimal
    /// places and still sum to the purchase amount rounded the same way.
    #[must_use]
    pub const fn new(tail: TailPolicy, precision: Option<u32>) -> Self {
        Self { tail, precision }
    }

    /// Distributes every ingredient of the dataset.
    #[must_use]
    pub fn distribute(&self, dataset: &Dataset) -> CostSchedule {
        let horizon = dataset.last_date();
        let spans: BTreeMap<String, Vec<CostSpan>> = dataset
            .ingredients
            .iter()
            .map(|ingredient| {
                let events = dataset.purchase_events(ingredient);
                let spans = self.distribute_events(&events, horizon);
                debug!(
                    ingredient = %ingredient,
                    purchases = events.len(),
                    spans = spans.len(),
                    "Distributed purchases"
                );
                (ingredient.clone(), spans)
            })
            .collect();

        CostSchedule::new(spans)
    }

    /// Distributes one ingredient's purchase events.
    ///
    /// `events` must be ascending by date. `horizon` is the last date of the
    /// dataset and only matters for [`TailPolicy::DatasetEnd`].
    #[must_use]
    pub fn distribute_events(
        &self,
        events: &[PurchaseEvent],
        horizon: Option<NaiveDate>,
    ) -> Vec<CostSpan> {
        if events.len() < 2 {
            return Vec::new();
        }

        let mut spans: Vec<CostSpan> = events
            .windows(2)
            .filter_map(|pair| {
                let span_days = (pair[1].date - pair[0].date).num_days();
                // Inverted or duplicate dates contribute nothing.
                (span_days > 0).then(|| self.spread(pair[0], span_days))
            })
            .collect();

        if let Some(last) = events.last()
            && let Some(tail) = self.tail_span(*last, horizon)
        {
            spans.push(tail);
        }

        spans
    }

    fn tail_span(&self, last: PurchaseEvent, horizon: Option<NaiveDate>) -> Option<CostSpan> {
        let end_inclusive = match self.tail {
            TailPolicy::None => return None,
            TailPolicy::DatasetEnd => horizon?,
            TailPolicy::YearEnd => NaiveDate::from_ymd_opt(last.date.year(), 12, 31)?,
        };

        let span_days = (end_inclusive - last.date).num_days() + 1;
        (span_days > 0).then(|| self.spread(last, span_days))
    }

    fn spread(&self, event: PurchaseEvent, span_days: i64) -> CostSpan {
        let days = usize::try_from(span_days).unwrap_or(0);
        let daily = match self.precision {
            Some(decimal_places) => split_evenly(event.amount, days, decimal_places),
            None => vec![event.amount / Decimal::from(span_days); days],
        };

        CostSpan {
            start: event.date,
            amount: event.amount,
            daily,
        }
    }
}

impl From<&DistributionConfig> for CostDistributor {
    fn from(config: &DistributionConfig) -> Self {
        Self::new(config.tail, config.precision)
    }
}
