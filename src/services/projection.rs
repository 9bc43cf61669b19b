// src/services/projection.rs

use crate::models::{PendingQuotes, PeriodProgress, ProjectedRevenue, RevenueSnapshot};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Elapsed share of the contract period as of a given date. `days_elapsed`
/// is clamped into `[0, total_days]` so callers never divide by a stale
/// denominator after the contract has ended.
pub fn period_progress(start: NaiveDate, end: NaiveDate, as_of: NaiveDate) -> PeriodProgress {
    let total_days = (end - start).num_days().max(0);
    let days_elapsed = (as_of - start).num_days().clamp(0, total_days);
    let percentage = if total_days > 0 {
        Decimal::from(days_elapsed) / Decimal::from(total_days) * dec!(100)
    } else {
        dec!(0)
    };
    PeriodProgress {
        days_elapsed,
        total_days,
        percentage,
    }
}

pub fn build_snapshot(
    invoiced_amount: Decimal,
    paid_amount: Decimal,
    quote_count: i64,
    quote_total: Decimal,
    conversion_rate: Decimal,
    start: NaiveDate,
    end: NaiveDate,
    as_of: NaiveDate,
) -> RevenueSnapshot {
    RevenueSnapshot {
        invoiced_amount,
        paid_amount,
        pending_quotes: PendingQuotes {
            count: quote_count,
            total: quote_total,
            conversion_rate,
            weighted_amount: quote_total * conversion_rate,
        },
        period_progress: period_progress(start, end, as_of),
    }
}

/// Project revenue to contract end and fiscal year end from the amounts
/// invoiced so far plus quote-weighted pipeline.
///
/// Divisions are guarded: with zero elapsed days every prorata collapses to
/// the invoiced amount. Past the contract end date no further accrual is
/// projected.
pub fn project(
    start: NaiveDate,
    end: NaiveDate,
    snapshot: &RevenueSnapshot,
    as_of: NaiveDate,
) -> ProjectedRevenue {
    let invoiced = snapshot.invoiced_amount;
    let elapsed = snapshot.period_progress.days_elapsed;
    let total_days = snapshot.period_progress.total_days;
    let weighted = snapshot.pending_quotes.weighted_amount;

    let daily_rate = if elapsed > 0 {
        Some(invoiced / Decimal::from(elapsed))
    } else {
        None
    };

    let prorata = match daily_rate {
        Some(rate) => rate * Decimal::from(total_days),
        None => invoiced,
    };

    // Fiscal year ends Dec 31 of the as-of calendar year.
    let fiscal_year_end = NaiveDate::from_ymd_opt(as_of.year(), 12, 31).unwrap_or(as_of);
    let days_to_year_end = (fiscal_year_end - start).num_days();
    let end_of_year = match daily_rate {
        Some(rate) if days_to_year_end > 0 => rate * Decimal::from(days_to_year_end) + weighted,
        _ => invoiced + weighted,
    };

    let end_of_contract = if as_of > end {
        invoiced
    } else {
        prorata + weighted
    };

    ProjectedRevenue {
        prorata: prorata.max(Decimal::ZERO),
        with_quotes: (prorata + weighted).max(Decimal::ZERO),
        end_of_year: end_of_year.max(Decimal::ZERO),
        end_of_contract: end_of_contract.max(Decimal::ZERO),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot_without_quotes(
        invoiced: Decimal,
        start: NaiveDate,
        end: NaiveDate,
        as_of: NaiveDate,
    ) -> RevenueSnapshot {
        build_snapshot(invoiced, dec!(0), 0, dec!(0), dec!(0.5), start, end, as_of)
    }

    #[test]
    fn prorata_full_year_contract() {
        let start = date(2024, 1, 1);
        let end = date(2024, 12, 31);
        let as_of = date(2024, 7, 1);
        let snap = snapshot_without_quotes(dec!(100000), start, end, as_of);

        assert_eq!(snap.period_progress.days_elapsed, 182);
        assert_eq!(snap.period_progress.total_days, 365);

        let projected = project(start, end, &snap, as_of);
        // 100 000 / 182 * 365
        assert_eq!(projected.prorata.round_dp(2), dec!(200549.45));
        // fiscal year end coincides with contract end here
        assert_eq!(projected.end_of_year.round_dp(2), dec!(200549.45));
    }

    #[test]
    fn zero_elapsed_days_clamps_to_invoiced() {
        let start = date(2024, 1, 1);
        let end = date(2024, 12, 31);
        let snap = snapshot_without_quotes(dec!(5000), start, end, start);

        let projected = project(start, end, &snap, start);
        assert_eq!(projected.prorata, dec!(5000));
        assert_eq!(projected.end_of_year, dec!(5000));
    }

    #[test]
    fn past_contract_end_stops_accrual() {
        let start = date(2023, 1, 1);
        let end = date(2023, 12, 31);
        let as_of = date(2024, 3, 1);
        let snap = snapshot_without_quotes(dec!(80000), start, end, as_of);

        let projected = project(start, end, &snap, as_of);
        assert_eq!(projected.end_of_contract, dec!(80000));
    }

    #[test]
    fn quotes_weighted_by_conversion_rate() {
        let start = date(2024, 1, 1);
        let end = date(2024, 12, 31);
        let as_of = date(2024, 7, 1);
        let snap = build_snapshot(
            dec!(100000),
            dec!(60000),
            3,
            dec!(40000),
            dec!(0.25),
            start,
            end,
            as_of,
        );

        assert_eq!(snap.pending_quotes.weighted_amount, dec!(10000));
        let projected = project(start, end, &snap, as_of);
        assert_eq!(projected.with_quotes, projected.prorata + dec!(10000));
        assert_eq!(projected.end_of_contract, projected.with_quotes);
    }

    #[test]
    fn projection_is_idempotent() {
        let start = date(2024, 1, 1);
        let end = date(2024, 12, 31);
        let as_of = date(2024, 9, 15);
        let snap = build_snapshot(
            dec!(123456.78),
            dec!(100000),
            2,
            dec!(20000),
            dec!(0.5),
            start,
            end,
            as_of,
        );

        let first = project(start, end, &snap, as_of);
        let second = project(start, end, &snap, as_of);
        assert_eq!(first, second);
    }
}
