//! Core KPI logic for Pokeria.
//!
//! This crate contains pure computation over readers and writers with ZERO
//! file-system or logging setup. Callers open files and install subscribers.
//!
//! # Modules
//!
//! - `ingest` - Daily CSV parsing and normalisation
//! - `distribution` - Spreading ingredient purchases over the days they cover
//! - `kpi` - Daily KPIs, critical days, period aggregates and comparisons
//! - `export` - Delimited export of the daily table
//! - `pipeline` - The three stages wired together

pub mod distribution;
pub mod export;
pub mod ingest;
pub mod kpi;
pub mod pipeline;

pub use pipeline::{Analysis, Pipeline, Summary, SummaryOptions};
