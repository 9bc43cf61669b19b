// src/services/payment.rs
//
// Shared guard for recording partial payments: `paid` may approach `total`
// but never exceed it. The SQL update carries the same condition, so a
// stale read between this check and the write still cannot overpay.

use crate::errors::{AppError, AppResult};
use rust_decimal::Decimal;

pub fn ensure_within_balance(paid: Decimal, total: Decimal, amount: Decimal) -> AppResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation(
            "Payment amount must be greater than zero".to_string(),
        ));
    }
    if paid + amount > total {
        return Err(AppError::Validation(format!(
            "Payment of {} would exceed the outstanding balance of {}",
            amount,
            total - paid
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn partial_payment_within_balance_is_accepted() {
        assert!(ensure_within_balance(dec!(200), dec!(1000), dec!(300)).is_ok());
    }

    #[test]
    fn exact_settlement_is_accepted() {
        assert!(ensure_within_balance(dec!(700), dec!(1000), dec!(300)).is_ok());
    }

    #[test]
    fn overpayment_is_rejected() {
        let err = ensure_within_balance(dec!(900), dec!(1000), dec!(100.01)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(ensure_within_balance(dec!(0), dec!(1000), dec!(0)).is_err());
        assert!(ensure_within_balance(dec!(0), dec!(1000), dec!(-50)).is_err());
    }
}
