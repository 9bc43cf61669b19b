// src/services/rebate.rs
//
// Progressive end-of-year rebate (RFA) over a contract's rate schedule.
// Marginal brackets: the revenue falling between two thresholds is rebated
// at the lower threshold's rate, the way progressive tax scales work.

use crate::errors::{AppError, AppResult};
use crate::models::{BracketSlice, RebateResult};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone, PartialEq)]
pub struct RateBracket {
    pub threshold: Decimal,
    pub rate: Decimal,
}

/// Structural validation of a rate schedule, run when a schedule is created
/// or replaced, never per computation.
pub fn validate_schedule(brackets: &[RateBracket]) -> AppResult<()> {
    if brackets.is_empty() {
        return Err(AppError::Validation(
            "Rate schedule must contain at least one bracket".to_string(),
        ));
    }
    if brackets[0].threshold < dec!(0) {
        return Err(AppError::Validation(
            "First bracket threshold cannot be negative".to_string(),
        ));
    }
    for pair in brackets.windows(2) {
        if pair[1].threshold <= pair[0].threshold {
            return Err(AppError::Validation(
                "Bracket thresholds must be strictly ascending".to_string(),
            ));
        }
    }
    for bracket in brackets {
        if bracket.rate < dec!(0) || bracket.rate > dec!(100) {
            return Err(AppError::Validation(
                "Bracket rates must be between 0 and 100".to_string(),
            ));
        }
    }
    Ok(())
}

/// Compute the rebate owed on `revenue` under a progressive `schedule`.
///
/// Stateless: callers re-invoke it for each revenue figure (current,
/// projected end-of-year, projected end-of-contract). No rounding happens
/// inside the loop; totals keep full precision until display.
pub fn compute(revenue: Decimal, schedule: &[RateBracket]) -> RebateResult {
    let revenue = revenue.max(Decimal::ZERO);
    let mut total = Decimal::ZERO;
    let mut slices = Vec::with_capacity(schedule.len());

    for (i, bracket) in schedule.iter().enumerate() {
        let lower = bracket.threshold;
        let upper = schedule.get(i + 1).map(|next| next.threshold);
        let capped = match upper {
            Some(u) => revenue.min(u),
            None => revenue,
        };
        let amount = (capped - lower).max(Decimal::ZERO);
        let rebate = amount * bracket.rate / dec!(100);
        total += rebate;
        slices.push(BracketSlice {
            label: bracket_label(lower, upper),
            rate: bracket.rate,
            amount,
            rebate,
        });
    }

    RebateResult {
        total,
        brackets: slices,
    }
}

fn bracket_label(lower: Decimal, upper: Option<Decimal>) -> String {
    match upper {
        Some(u) => format!("{} - {}", lower.normalize(), u.normalize()),
        None => format!("{} et plus", lower.normalize()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_schedule() -> Vec<RateBracket> {
        vec![
            RateBracket {
                threshold: dec!(0),
                rate: dec!(0),
            },
            RateBracket {
                threshold: dec!(50000),
                rate: dec!(1),
            },
            RateBracket {
                threshold: dec!(100000),
                rate: dec!(2),
            },
        ]
    }

    #[test]
    fn progressive_slices_accumulate() {
        let result = compute(dec!(130000), &standard_schedule());
        // 50 000 @ 0% + 50 000 @ 1% + 30 000 @ 2% = 1 100
        assert_eq!(result.total, dec!(1100));
        assert_eq!(result.brackets.len(), 3);
        assert_eq!(result.brackets[0].rebate, dec!(0));
        assert_eq!(result.brackets[1].rebate, dec!(500));
        assert_eq!(result.brackets[2].rebate, dec!(600));
        assert_eq!(result.brackets[2].amount, dec!(30000));
    }

    #[test]
    fn slice_sum_matches_total() {
        for revenue in [dec!(0), dec!(49999.99), dec!(75000), dec!(1234567.89)] {
            let result = compute(revenue, &standard_schedule());
            let sum: Decimal = result.brackets.iter().map(|s| s.rebate).sum();
            assert!((sum - result.total).abs() < dec!(0.01));
        }
    }

    #[test]
    fn rebate_is_monotonic_in_revenue() {
        let schedule = standard_schedule();
        let mut previous = Decimal::ZERO;
        for revenue in [dec!(0), dec!(25000), dec!(50000), dec!(99999), dec!(250000)] {
            let total = compute(revenue, &schedule).total;
            assert!(total >= previous);
            previous = total;
        }
    }

    #[test]
    fn revenue_below_first_paying_bracket() {
        let result = compute(dec!(30000), &standard_schedule());
        assert_eq!(result.total, dec!(0));
        assert_eq!(result.brackets[1].amount, dec!(0));
    }

    #[test]
    fn negative_revenue_is_clamped() {
        let result = compute(dec!(-500), &standard_schedule());
        assert_eq!(result.total, dec!(0));
    }

    #[test]
    fn schedule_validation() {
        assert!(validate_schedule(&standard_schedule()).is_ok());
        assert!(validate_schedule(&[]).is_err());
        assert!(
            validate_schedule(&[
                RateBracket {
                    threshold: dec!(50000),
                    rate: dec!(1)
                },
                RateBracket {
                    threshold: dec!(50000),
                    rate: dec!(2)
                },
            ])
            .is_err()
        );
        assert!(
            validate_schedule(&[RateBracket {
                threshold: dec!(0),
                rate: dec!(150)
            }])
            .is_err()
        );
    }
}
