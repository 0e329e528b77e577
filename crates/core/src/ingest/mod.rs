//! Record ingestion and normalisation.
//!
//! Reads the daily CSV into typed [`DailyRecord`]s keyed by date:
//! - day-first date parsing, rows with a bad date are dropped
//! - permissive numeric coercion, unparseable cells become absent
//! - header classification through a [`ColumnLayout`]

pub mod error;
pub mod parse;
pub mod service;
pub mod types;


pub use error::IngestionError;
pub use parse::{parse_day_first, parse_decimal};
pub use service::Ingestor;
pub use types::{
    ColumnLayout, ColumnRole, DailyRecord, Dataset, IngestPolicy, IngestStats, PurchaseEvent,
    saturating_sum,
};
