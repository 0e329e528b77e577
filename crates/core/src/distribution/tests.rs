//! Property-based tests for cost distribution.
//!
//! - Conservation: each purchase is fully spread over `[d_i, d_{i+1})`
//! - Fewer than two purchases cost nothing
//! - Shares are never negative

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use pokeria_shared::config::TailPolicy;
use rust_decimal::Decimal;

use super::service::CostDistributor;
use crate::ingest::{DailyRecord, Dataset};

/// Rounding slack for exact division (28 significant digits).
fn tolerance() -> Decimal {
    Decimal::new(1, 18)
}

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

/// Strategy producing purchase amounts from 0.01 to 10,000.00.
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy producing `(day offset, amount)` purchases with distinct offsets.
fn purchases(max: usize) -> impl Strategy<Value = Vec<(u64, Decimal)>> {
    prop::collection::btree_map(0u64..400, amount(), 0..max)
        .prop_map(|map| map.into_iter().collect())
}

fn tail_policy() -> impl Strategy<Value = TailPolicy> {
    prop_oneof![
        Just(TailPolicy::None),
        Just(TailPolicy::DatasetEnd),
        Just(TailPolicy::YearEnd),
    ]
}

fn dataset_for(purchases: &[(u64, Decimal)]) -> Dataset {
    Dataset::from_records(purchases.iter().map(|(offset, amount)| {
        let mut record = DailyRecord::new(base_date() + Days::new(*offset));
        record.purchases.insert("salmon".to_string(), *amount);
        record
    }))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The spread of purchase `i` over `[d_i, d_{i+1})` sums to its amount.
    #[test]
    fn prop_distribution_conserves_each_purchase(
        purchases in purchases(12),
        tail in tail_policy(),
    ) {
        let dataset = dataset_for(&purchases);
        let schedule = CostDistributor::new(tail, None).distribute(&dataset);

        for pair in purchases.windows(2) {
            let start = base_date() + Days::new(pair[0].0);
            let end = base_date() + Days::new(pair[1].0);
            let spread = schedule.cost_between("salmon", start, end);
            prop_assert!(
                (spread - pair[0].1).abs() <= tolerance(),
                "spread {} != amount {}", spread, pair[0].1
            );
        }
    }

    /// With cent precision the conservation is exact.
    #[test]
    fn prop_cent_precision_is_exact(purchases in purchases(12)) {
        let dataset = dataset_for(&purchases);
        let schedule = CostDistributor::new(TailPolicy::None, Some(2)).distribute(&dataset);

        for pair in purchases.windows(2) {
            let start = base_date() + Days::new(pair[0].0);
            let end = base_date() + Days::new(pair[1].0);
            prop_assert_eq!(schedule.cost_between("salmon", start, end), pair[0].1);
        }
    }

    /// Zero or one purchase never produces any cost, whatever the tail policy.
    #[test]
    fn prop_fewer_than_two_purchases_cost_nothing(
        purchases in purchases(2),
        tail in tail_policy(),
        probe in 0u64..800,
    ) {
        let dataset = dataset_for(&purchases);
        let schedule = CostDistributor::new(tail, None).distribute(&dataset);

        prop_assert_eq!(
            schedule.cost_on(base_date() + Days::new(probe), "salmon"),
            Decimal::ZERO
        );
    }

    /// No day ever receives a negative share, and nothing precedes the first purchase.
    #[test]
    fn prop_shares_are_non_negative(
        purchases in purchases(12),
        tail in tail_policy(),
    ) {
        let dataset = dataset_for(&purchases);
        let schedule = CostDistributor::new(tail, None).distribute(&dataset);

        for span in schedule.spans("salmon") {
            for (_, share) in span.days() {
                prop_assert!(share >= Decimal::ZERO);
            }
        }
        if let Some((first, _)) = purchases.first() {
            if *first > 0 {
                let before = base_date() + Days::new(first - 1);
                prop_assert_eq!(schedule.total_on(before), Decimal::ZERO);
            }
        }
    }
}
