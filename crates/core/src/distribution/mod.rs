//! Cost distribution.
//!
//! Spreads each lump ingredient purchase across the days until the next
//! purchase of the same ingredient, producing a [`CostSchedule`].

pub mod allocation;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

pub use allocation::split_evenly;
pub use service::CostDistributor;
pub use types::{CostSchedule, CostSpan};
