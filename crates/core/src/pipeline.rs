//! Ingest, distribute and aggregate in one pass.

use std::io::{Read, Write};

use chrono::NaiveDate;
use pokeria_shared::config::{AppConfig, ComparisonMode, ReportConfig};
use serde::Serialize;
use tracing::info;

use crate::distribution::{CostDistributor, CostSchedule};
use crate::export::{self, ExportError};
use crate::ingest::{ColumnLayout, Dataset, IngestPolicy, IngestStats, IngestionError, Ingestor};
use crate::kpi::{
    DailyKpi, DateRange, IngredientSpend, KpiAggregator, KpiError, PeriodComparison,
    PeriodSummary, YearSummary,
};

/// The three stages wired together.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    ingestor: Ingestor,
    distributor: CostDistributor,
    aggregator: KpiAggregator,
}

impl Pipeline {
    /// Creates a pipeline from its stages.
    #[must_use]
    pub const fn new(
        ingestor: Ingestor,
        distributor: CostDistributor,
        aggregator: KpiAggregator,
    ) -> Self {
        Self {
            ingestor,
            distributor,
            aggregator,
        }
    }

    /// Builds every stage from application config.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Ingestor::new(
                ColumnLayout::from(&config.columns),
                IngestPolicy::from(&config.input),
            ),
            CostDistributor::from(&config.distribution),
            KpiAggregator::from(&config.thresholds),
        )
    }

    /// Reads the daily table and derives every KPI.
    ///
    /// # Errors
    ///
    /// Returns `IngestionError` if the table cannot be read.
    pub fn run<R: Read>(&self, reader: R) -> Result<Analysis, IngestionError> {
        let dataset = self.ingestor.read(reader)?;
        Ok(self.analyse(dataset))
    }

    /// Derives every KPI from an already ingested dataset.
    #[must_use]
    pub fn analyse(&self, dataset: Dataset) -> Analysis {
        let schedule = self.distributor.distribute(&dataset);
        let daily = self.aggregator.daily_kpis(&dataset, &schedule);

        info!(
            days = daily.len(),
            ingredients = dataset.ingredients.len(),
            critical = daily.iter().filter(|day| day.is_critical).count(),
            "Daily KPIs computed"
        );

        Analysis {
            dataset,
            schedule,
            daily,
        }
    }
}

/// Period selection for a [`Summary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryOptions {
    /// First day; defaults to the first record date.
    pub start: Option<NaiveDate>,
    /// Last day; defaults to the last record date.
    pub end: Option<NaiveDate>,
    /// Comparison period derivation.
    pub comparison: ComparisonMode,
    /// Length of the ingredient ranking.
    pub top_n: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self::from(&ReportConfig::default())
    }
}

impl From<&ReportConfig> for SummaryOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            start: config.start,
            end: config.end,
            comparison: config.comparison,
            top_n: config.top_n,
        }
    }
}

/// Everything reported for the selected period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Selected period.
    pub range: DateRange,
    /// Headline aggregates.
    pub period: PeriodSummary,
    /// Selected period against its predecessor.
    pub comparison: PeriodComparison,
    /// Critical days in the period, ascending.
    pub critical_days: Vec<DailyKpi>,
    /// Highest mean daily ingredient spend.
    pub top_ingredients: Vec<IngredientSpend>,
    /// Whole dataset, one entry per year.
    pub yearly: Vec<YearSummary>,
    /// Ingestion counters.
    pub ingest: IngestStats,
}

/// Immutable result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    /// Ingested records.
    pub dataset: Dataset,
    /// Distributed ingredient cost.
    pub schedule: CostSchedule,
    /// Per-day KPIs, ascending by date.
    pub daily: Vec<DailyKpi>,
}

impl Analysis {
    /// Resolves the period, filling open ends from the dataset.
    ///
    /// # Errors
    ///
    /// Returns `KpiError::EmptyDataset` if an open end cannot be filled, or
    /// `KpiError::InvalidDateRange` if start is after end.
    pub fn range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<DateRange, KpiError> {
        let start = start
            .or_else(|| self.dataset.first_date())
            .ok_or(KpiError::EmptyDataset)?;
        let end = end
            .or_else(|| self.dataset.last_date())
            .ok_or(KpiError::EmptyDataset)?;
        DateRange::new(start, end)
    }

    /// Aggregates over a period.
    #[must_use]
    pub fn period(&self, range: &DateRange) -> PeriodSummary {
        KpiAggregator::summarize(&self.daily, range)
    }

    /// Builds the full report for the selected period.
    ///
    /// # Errors
    ///
    /// Returns `KpiError` if the period cannot be resolved or compared.
    pub fn summary(&self, options: &SummaryOptions) -> Result<Summary, KpiError> {
        let range = self.range(options.start, options.end)?;
        let comparison = KpiAggregator::compare(&self.daily, &range, options.comparison)?;

        Ok(Summary {
            range,
            period: comparison.current.clone(),
            critical_days: KpiAggregator::critical_days(&self.daily, &range),
            top_ingredients: KpiAggregator::top_ingredients(
                &self.dataset,
                &self.schedule,
                &range,
                options.top_n,
            ),
            yearly: KpiAggregator::yearly_breakdown(&self.daily),
            ingest: self.dataset.stats,
            comparison,
        })
    }

    /// Writes the daily table, restricted to `range` when given.
    ///
    /// # Errors
    ///
    /// Returns `ExportError` if the writer fails.
    pub fn write_daily_table<W: Write>(
        &self,
        writer: W,
        range: Option<&DateRange>,
        delimiter: u8,
    ) -> Result<(), ExportError> {
        let days = range.map_or(self.daily.as_slice(), |range| {
            KpiAggregator::days_in(&self.daily, range)
        });
        export::write_daily_table(writer, &self.dataset, days, delimiter)
    }
}
