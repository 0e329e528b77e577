//! Daily and period KPIs.
//!
//! Turns records and a cost schedule into per-day metrics, flags critical
//! days, and aggregates periods from their summed totals.

pub mod error;
pub mod service;
pub mod types;


pub use error::KpiError;
pub use service::{KpiAggregator, safe_percentage};
pub use types::{
    CriticalThresholds, DailyKpi, DateRange, IngredientSpend, PeriodComparison, PeriodDelta,
    PeriodSummary, YearSummary,
};
