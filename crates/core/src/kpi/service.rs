//! KPI aggregation service.

use std::cmp::Ordering;

use chrono::{Datelike, NaiveDate};
use pokeria_shared::config::{ComparisonMode, ThresholdsConfig};
use rust_decimal::Decimal;

use super::error::KpiError;
use super::types::{
    CriticalThresholds, DailyKpi, DateRange, IngredientSpend, PeriodComparison, PeriodDelta,
    PeriodSummary, YearSummary,
};
use crate::distribution::CostSchedule;
use crate::ingest::{DailyRecord, Dataset, saturating_sum};

/// Returns `cost / revenue * 100`, or zero when revenue is not positive.
///
/// Never panics: a quotient too large for a `Decimal` saturates.
#[must_use]
pub fn safe_percentage(cost: Decimal, revenue: Decimal) -> Decimal {
    if revenue <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    cost.checked_div(revenue)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::MAX)
}

/// `revenue - ingredient_cost - employee_cost`, clamped to the `Decimal` range.
fn profit(revenue: Decimal, ingredient_cost: Decimal, employee_cost: Decimal) -> Decimal {
    revenue
        .saturating_sub(ingredient_cost)
        .saturating_sub(employee_cost)
}

fn safe_ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or(Decimal::MAX)
}

/// Derives daily and period KPIs from records and distributed cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KpiAggregator {
    thresholds: CriticalThresholds,
}

impl KpiAggregator {
    /// Creates an aggregator with the given critical-day thresholds.
    #[must_use]
    pub const fn new(thresholds: CriticalThresholds) -> Self {
        Self { thresholds }
    }

    /// KPIs for a single day.
    #[must_use]
    pub fn daily_kpi(&self, record: &DailyRecord, schedule: &CostSchedule) -> DailyKpi {
        let revenue = record.revenue_or_zero();
        let employee_cost = record.employee_cost_or_zero();
        let total_ingredient_cost = schedule.total_on(record.date);

        let pct_ingredient = safe_percentage(total_ingredient_cost, revenue);
        let pct_employee = safe_percentage(employee_cost, revenue);

        DailyKpi {
            date: record.date,
            revenue: record.revenue,
            employee_cost: record.employee_cost,
            total_ingredient_cost,
            pct_ingredient,
            pct_employee,
            estimated_profit: profit(revenue, total_ingredient_cost, employee_cost),
            is_critical: self
                .thresholds
                .is_critical(revenue, pct_ingredient, pct_employee),
            purchases: record.purchases.clone(),
            products: record.products.clone(),
            extras: record.extras.clone(),
        }
    }

    /// KPIs for every record of the dataset, ascending by date.
    #[must_use]
    pub fn daily_kpis(&self, dataset: &Dataset, schedule: &CostSchedule) -> Vec<DailyKpi> {
        dataset
            .records
            .values()
            .map(|record| self.daily_kpi(record, schedule))
            .collect()
    }

    /// Aggregates the days of `daily` falling in `range`.
    ///
    /// `daily` must be ascending by date.
    #[must_use]
    pub fn summarize(daily: &[DailyKpi], range: &DateRange) -> PeriodSummary {
        let days = in_range(daily, range);

        let mut revenue = Decimal::ZERO;
        let mut ingredient_cost = Decimal::ZERO;
        let mut employee_cost = Decimal::ZERO;
        let mut items_sold = Decimal::ZERO;
        let mut extras_sold = Decimal::ZERO;
        let mut critical_days = 0;

        for day in days {
            revenue = revenue.saturating_add(day.revenue.unwrap_or_default());
            ingredient_cost = ingredient_cost.saturating_add(day.total_ingredient_cost);
            employee_cost = employee_cost.saturating_add(day.employee_cost.unwrap_or_default());
            items_sold = items_sold.saturating_add(day.items_sold());
            extras_sold = extras_sold.saturating_add(day.extras_sold());
            if day.is_critical {
                critical_days += 1;
            }
        }

        PeriodSummary {
            start: range.start(),
            end: range.end(),
            days: days.len(),
            revenue,
            ingredient_cost,
            employee_cost,
            estimated_profit: profit(revenue, ingredient_cost, employee_cost),
            pct_ingredient: safe_percentage(ingredient_cost, revenue).round_dp(2),
            pct_employee: safe_percentage(employee_cost, revenue).round_dp(2),
            critical_days,
            items_sold,
            revenue_per_item: safe_ratio(revenue, items_sold).round_dp(2),
            ingredient_cost_per_item: safe_ratio(ingredient_cost, items_sold).round_dp(2),
            extras_per_ten_items: safe_ratio(extras_sold.saturating_mul(Decimal::TEN), items_sold)
                .round_dp(1),
        }
    }

    /// The days of an ascending daily table that fall in `range`.
    #[must_use]
    pub fn days_in<'a>(daily: &'a [DailyKpi], range: &DateRange) -> &'a [DailyKpi] {
        in_range(daily, range)
    }

    /// Days in `range` flagged critical, ascending by date.
    #[must_use]
    pub fn critical_days(daily: &[DailyKpi], range: &DateRange) -> Vec<DailyKpi> {
        in_range(daily, range)
            .iter()
            .filter(|day| day.is_critical)
            .cloned()
            .collect()
    }

    /// The `n` ingredients with the highest mean daily distributed cost.
    ///
    /// The mean runs over the record days in `range`. Ties are broken by
    /// ingredient name, ascending.
    #[must_use]
    pub fn top_ingredients(
        dataset: &Dataset,
        schedule: &CostSchedule,
        range: &DateRange,
        n: usize,
    ) -> Vec<IngredientSpend> {
        let dates: Vec<NaiveDate> = dataset
            .records_in(range.start()..=range.end())
            .map(|record| record.date)
            .collect();
        if dates.is_empty() {
            return Vec::new();
        }
        let day_count = Decimal::from(dates.len());

        let mut ranking: Vec<IngredientSpend> = dataset
            .ingredients
            .iter()
            .map(|ingredient| {
                let total_cost =
                    saturating_sum(dates.iter().map(|date| schedule.cost_on(*date, ingredient)));
                IngredientSpend {
                    ingredient: ingredient.clone(),
                    mean_daily_cost: total_cost / day_count,
                    total_cost,
                }
            })
            .collect();

        ranking.sort_by(|a, b| match b.mean_daily_cost.cmp(&a.mean_daily_cost) {
            Ordering::Equal => a.ingredient.cmp(&b.ingredient),
            other => other,
        });
        ranking.truncate(n);
        ranking
    }

    /// Compares `range` with the period derived from it by `mode`.
    ///
    /// # Errors
    ///
    /// Returns `KpiError::DateOutOfRange` if the previous period would start
    /// before the supported calendar.
    pub fn compare(
        daily: &[DailyKpi],
        range: &DateRange,
        mode: ComparisonMode,
    ) -> Result<PeriodComparison, KpiError> {
        let previous_range = range.previous(mode)?;
        let current = Self::summarize(daily, range);
        let previous = Self::summarize(daily, &previous_range);
        let delta = PeriodDelta::between(&current, &previous);

        Ok(PeriodComparison {
            mode,
            current,
            previous,
            delta,
        })
    }

    /// One summary per calendar year present in `daily`, ascending.
    #[must_use]
    pub fn yearly_breakdown(daily: &[DailyKpi]) -> Vec<YearSummary> {
        let mut years: Vec<i32> = daily.iter().map(|day| day.date.year()).collect();
        years.dedup();

        years
            .into_iter()
            .filter_map(|year| {
                let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
                let end = NaiveDate::from_ymd_opt(year, 12, 31)?;
                let range = DateRange::new(start, end).ok()?;
                Some(YearSummary {
                    year,
                    summary: Self::summarize(daily, &range),
                })
            })
            .collect()
    }
}

impl From<&ThresholdsConfig> for KpiAggregator {
    fn from(config: &ThresholdsConfig) -> Self {
        Self::new(CriticalThresholds::from(config))
    }
}

/// The contiguous slice of an ascending daily table inside `range`.
fn in_range<'a>(daily: &'a [DailyKpi], range: &DateRange) -> &'a [DailyKpi] {
    let from = daily.partition_point(|day| day.date < range.start());
    let to = daily.partition_point(|day| day.date <= range.end());
    &daily[from..to.max(from)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::CostDistributor;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(date: NaiveDate, revenue: Decimal, employee_cost: Decimal) -> DailyRecord {
        let mut record = DailyRecord::new(date);
        record.revenue = Some(revenue);
        record.employee_cost = Some(employee_cost);
        record
    }

    fn kpi(date: NaiveDate, revenue: Decimal, ingredient: Decimal, employee: Decimal) -> DailyKpi {
        let record = record(date, revenue, employee);
        let mut kpi = KpiAggregator::default().daily_kpi(&record, &CostSchedule::default());
        kpi.total_ingredient_cost = ingredient;
        kpi.pct_ingredient = safe_percentage(ingredient, revenue);
        kpi.estimated_profit = revenue - ingredient - employee;
        kpi.is_critical = CriticalThresholds::default().is_critical(
            revenue,
            kpi.pct_ingredient,
            kpi.pct_employee,
        );
        kpi
    }

    #[rstest]
    #[case(dec!(0), dec!(0))]
    #[case(dec!(50), dec!(0))]
    #[case(dec!(50), dec!(-10))]
    fn test_safe_percentage_non_positive_revenue(#[case] cost: Decimal, #[case] revenue: Decimal) {
        assert_eq!(safe_percentage(cost, revenue), dec!(0));
    }

    #[test]
    fn test_safe_percentage() {
        assert_eq!(safe_percentage(dec!(30), dec!(120)), dec!(25));
    }

    #[test]
    fn test_safe_percentage_saturates() {
        assert_eq!(
            safe_percentage(Decimal::MAX, dec!(0.0000001)),
            Decimal::MAX
        );
    }

    #[test]
    fn test_low_revenue_day_is_critical() {
        let thresholds = CriticalThresholds::default();
        assert!(thresholds.is_critical(dec!(250), dec!(10), dec!(5)));
    }

    #[rstest]
    #[case(dec!(1000), dec!(35.01), dec!(0), true)]
    #[case(dec!(1000), dec!(35), dec!(0), false)]
    #[case(dec!(1000), dec!(0), dec!(25.5), true)]
    #[case(dec!(1000), dec!(0), dec!(25), false)]
    #[case(dec!(299.99), dec!(0), dec!(0), true)]
    #[case(dec!(300), dec!(0), dec!(0), false)]
    fn test_default_thresholds(
        #[case] revenue: Decimal,
        #[case] pct_ingredient: Decimal,
        #[case] pct_employee: Decimal,
        #[case] expected: bool,
    ) {
        let thresholds = CriticalThresholds::default();
        assert_eq!(
            thresholds.is_critical(revenue, pct_ingredient, pct_employee),
            expected
        );
    }

    #[test]
    fn test_conservative_thresholds() {
        let thresholds = CriticalThresholds::conservative();
        assert!(thresholds.is_critical(dec!(400), dec!(0), dec!(0)));
        assert!(thresholds.is_critical(dec!(1000), dec!(26), dec!(0)));
        assert!(thresholds.is_critical(dec!(1000), dec!(0), dec!(21)));
        assert!(!thresholds.is_critical(dec!(500), dec!(25), dec!(20)));
    }

    #[test]
    fn test_zero_revenue_day() {
        let record = record(date(2024, 1, 1), dec!(0), dec!(50));
        let kpi = KpiAggregator::default().daily_kpi(&record, &CostSchedule::default());

        assert_eq!(kpi.pct_employee, dec!(0));
        assert_eq!(kpi.pct_ingredient, dec!(0));
        assert_eq!(kpi.estimated_profit, dec!(-50));
        assert!(kpi.is_critical);
    }

    #[test]
    fn test_missing_revenue_counts_as_zero() {
        let mut record = DailyRecord::new(date(2024, 1, 1));
        record.employee_cost = Some(dec!(40));
        let kpi = KpiAggregator::default().daily_kpi(&record, &CostSchedule::default());

        assert_eq!(kpi.revenue, None);
        assert_eq!(kpi.estimated_profit, dec!(-40));
        assert!(kpi.is_critical);
    }

    #[test]
    fn test_daily_kpi_uses_distributed_cost() {
        let mut first = record(date(2024, 1, 1), dec!(400), dec!(80));
        first.purchases.insert("salmon".to_string(), dec!(100));
        let mut second = record(date(2024, 1, 6), dec!(500), dec!(80));
        second.purchases.insert("salmon".to_string(), dec!(50));
        let dataset = Dataset::from_records(vec![first, second]);
        let schedule = CostDistributor::default().distribute(&dataset);

        let daily = KpiAggregator::default().daily_kpis(&dataset, &schedule);

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].total_ingredient_cost, dec!(20));
        assert_eq!(daily[0].pct_ingredient, dec!(5));
        assert_eq!(daily[0].pct_employee, dec!(20));
        assert_eq!(daily[0].estimated_profit, dec!(300));
        assert!(!daily[0].is_critical);
        assert_eq!(daily[1].total_ingredient_cost, dec!(0));
    }

    #[test]
    fn test_period_percentage_uses_summed_totals() {
        let daily: Vec<DailyKpi> = (1..=30)
            .map(|day| kpi(date(2024, 1, day), dec!(300), dec!(100), dec!(0)))
            .collect();
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();

        let summary = KpiAggregator::summarize(&daily, &range);

        assert_eq!(summary.revenue, dec!(9000));
        assert_eq!(summary.ingredient_cost, dec!(3000));
        assert_eq!(summary.pct_ingredient, dec!(33.33));
        assert_eq!(summary.days, 30);
    }

    #[test]
    fn test_period_percentage_is_not_average_of_days() {
        let daily = vec![
            kpi(date(2024, 1, 1), dec!(100), dec!(50), dec!(0)),
            kpi(date(2024, 1, 2), dec!(900), dec!(50), dec!(0)),
        ];
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 2)).unwrap();

        let summary = KpiAggregator::summarize(&daily, &range);

        // 100 / 1000, not (50% + 5.56%) / 2.
        assert_eq!(summary.pct_ingredient, dec!(10));
    }

    #[test]
    fn test_per_item_metrics() {
        let mut record = record(date(2024, 1, 1), dec!(1000), dec!(0));
        record.products.insert("poke_regular".to_string(), dec!(30));
        record.products.insert("poke_maxi".to_string(), dec!(10));
        record.extras.insert("Avocado_venduto".to_string(), dec!(6));
        let mut day = KpiAggregator::default().daily_kpi(&record, &CostSchedule::default());
        day.total_ingredient_cost = dec!(300);
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 1)).unwrap();

        let summary = KpiAggregator::summarize(&[day], &range);

        assert_eq!(summary.items_sold, dec!(40));
        assert_eq!(summary.revenue_per_item, dec!(25));
        assert_eq!(summary.ingredient_cost_per_item, dec!(7.5));
        assert_eq!(summary.extras_per_ten_items, dec!(1.5));
    }

    #[test]
    fn test_empty_period_is_all_zero() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let summary = KpiAggregator::summarize(&[], &range);

        assert_eq!(summary.days, 0);
        assert_eq!(summary.revenue, dec!(0));
        assert_eq!(summary.pct_ingredient, dec!(0));
        assert_eq!(summary.revenue_per_item, dec!(0));
    }

    #[test]
    fn test_critical_days_in_range() {
        let daily = vec![
            kpi(date(2024, 1, 1), dec!(250), dec!(0), dec!(0)),
            kpi(date(2024, 1, 2), dec!(900), dec!(0), dec!(0)),
            kpi(date(2024, 1, 3), dec!(100), dec!(0), dec!(0)),
            kpi(date(2024, 1, 4), dec!(100), dec!(0), dec!(0)),
        ];
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 3)).unwrap();

        let critical = KpiAggregator::critical_days(&daily, &range);

        let dates: Vec<NaiveDate> = critical.iter().map(|day| day.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 3)]);
    }

    #[test]
    fn test_top_ingredients_ranking_and_ties() {
        let mut first = record(date(2024, 1, 1), dec!(500), dec!(0));
        first.purchases.insert("tuna".to_string(), dec!(40));
        first.purchases.insert("avocado".to_string(), dec!(40));
        first.purchases.insert("salmon".to_string(), dec!(100));
        first.purchases.insert("rice".to_string(), dec!(4));
        let mut last = record(date(2024, 1, 3), dec!(500), dec!(0));
        for name in ["tuna", "avocado", "salmon", "rice"] {
            last.purchases.insert(name.to_string(), dec!(1));
        }
        let second = record(date(2024, 1, 2), dec!(500), dec!(0));
        let dataset = Dataset::from_records(vec![first, second, last]);
        let schedule = CostDistributor::default().distribute(&dataset);
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 2)).unwrap();

        let top = KpiAggregator::top_ingredients(&dataset, &schedule, &range, 3);

        let names: Vec<&str> = top.iter().map(|spend| spend.ingredient.as_str()).collect();
        assert_eq!(names, vec!["salmon", "avocado", "tuna"]);
        assert_eq!(top[0].mean_daily_cost, dec!(50));
        assert_eq!(top[0].total_cost, dec!(100));
        assert_eq!(top[1].mean_daily_cost, dec!(20));
    }

    #[test]
    fn test_top_ingredients_empty_period() {
        let dataset = Dataset::from_records(vec![record(date(2024, 1, 1), dec!(1), dec!(0))]);
        let range = DateRange::new(date(2025, 1, 1), date(2025, 1, 2)).unwrap();

        let top = KpiAggregator::top_ingredients(&dataset, &CostSchedule::default(), &range, 3);
        assert!(top.is_empty());
    }

    #[test]
    fn test_compare_preceding_span() {
        let daily = vec![
            kpi(date(2024, 1, 1), dec!(400), dec!(100), dec!(50)),
            kpi(date(2024, 1, 2), dec!(200), dec!(100), dec!(50)),
            kpi(date(2024, 1, 3), dec!(800), dec!(100), dec!(50)),
            kpi(date(2024, 1, 4), dec!(700), dec!(100), dec!(50)),
        ];
        let range = DateRange::new(date(2024, 1, 3), date(2024, 1, 4)).unwrap();

        let comparison =
            KpiAggregator::compare(&daily, &range, ComparisonMode::PrecedingSpan).unwrap();

        assert_eq!(comparison.previous.start, date(2024, 1, 1));
        assert_eq!(comparison.previous.end, date(2024, 1, 2));
        assert_eq!(comparison.delta.revenue, dec!(900));
        assert_eq!(comparison.delta.ingredient_cost, dec!(0));
        assert_eq!(comparison.delta.estimated_profit, dec!(900));
        assert_eq!(comparison.delta.critical_days, -1);
    }

    #[test]
    fn test_compare_prior_year() {
        let daily = vec![
            kpi(date(2023, 3, 1), dec!(500), dec!(0), dec!(0)),
            kpi(date(2024, 3, 1), dec!(650), dec!(0), dec!(0)),
        ];
        let range = DateRange::new(date(2024, 3, 1), date(2024, 3, 31)).unwrap();

        let comparison =
            KpiAggregator::compare(&daily, &range, ComparisonMode::PriorYear).unwrap();

        assert_eq!(comparison.mode, ComparisonMode::PriorYear);
        assert_eq!(comparison.previous.start, date(2023, 3, 1));
        assert_eq!(comparison.previous.revenue, dec!(500));
        assert_eq!(comparison.delta.revenue, dec!(150));
    }

    #[test]
    fn test_summary_saturates_instead_of_overflowing() {
        let daily = vec![
            kpi(date(2024, 1, 1), Decimal::MAX, dec!(0), dec!(0)),
            kpi(date(2024, 1, 2), Decimal::MAX, dec!(0), dec!(0)),
        ];
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 2)).unwrap();

        let summary = KpiAggregator::summarize(&daily, &range);

        assert_eq!(summary.revenue, Decimal::MAX);
        assert_eq!(summary.estimated_profit, Decimal::MAX);
        assert_eq!(summary.pct_ingredient, dec!(0));
    }

    #[test]
    fn test_daily_profit_saturates() {
        let record = record(date(2024, 1, 1), Decimal::MIN, Decimal::MAX);
        let kpi = KpiAggregator::default().daily_kpi(&record, &CostSchedule::default());

        assert_eq!(kpi.estimated_profit, Decimal::MIN);
        assert!(kpi.is_critical);
    }

    #[test]
    fn test_delta_saturates() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 1)).unwrap();
        let mut current = KpiAggregator::summarize(&[], &range);
        let mut previous = current.clone();
        current.revenue = Decimal::MAX;
        previous.revenue = Decimal::MIN;

        let delta = PeriodDelta::between(&current, &previous);

        assert_eq!(delta.revenue, Decimal::MAX);
    }

    #[test]
    fn test_yearly_breakdown() {
        let daily = vec![
            kpi(date(2023, 12, 30), dec!(500), dec!(100), dec!(0)),
            kpi(date(2023, 12, 31), dec!(500), dec!(100), dec!(0)),
            kpi(date(2024, 1, 1), dec!(800), dec!(400), dec!(0)),
        ];

        let years = KpiAggregator::yearly_breakdown(&daily);

        assert_eq!(years.len(), 2);
        assert_eq!(years[0].year, 2023);
        assert_eq!(years[0].summary.revenue, dec!(1000));
        assert_eq!(years[0].summary.pct_ingredient, dec!(20));
        assert_eq!(years[1].year, 2024);
        assert_eq!(years[1].summary.pct_ingredient, dec!(50));
    }
}
