//! Promotion validation rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Reasons a promotion definition is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromotionError {
    #[error("Debe especificar al menos porcentaje_descuento o monto_descuento")]
    MissingDiscount,
    #[error("El porcentaje de descuento debe estar entre 0 y 100")]
    PercentageOutOfRange,
    #[error("El monto de descuento debe ser mayor a 0")]
    NonPositiveAmount,
    #[error("La fecha de inicio debe ser anterior a la fecha de término")]
    InvalidWindow,
}

/// Check that a promotion grants some discount.
///
/// At least one of percentage or amount must be given. A percentage must be
/// in `(0, 100]` and an amount must be positive.
///
/// # Errors
///
/// Returns the first rule the pair violates.
pub fn validate_discount(
    percentage: Option<Decimal>,
    amount: Option<Decimal>,
) -> Result<(), PromotionError> {
    if percentage.is_none() && amount.is_none() {
        return Err(PromotionError::MissingDiscount);
    }
    if let Some(pct) = percentage
        && (pct <= Decimal::ZERO || pct > Decimal::ONE_HUNDRED)
    {
        return Err(PromotionError::PercentageOutOfRange);
    }
    if let Some(amt) = amount
        && amt <= Decimal::ZERO
    {
        return Err(PromotionError::NonPositiveAmount);
    }
    Ok(())
}

/// Check that a promotion window starts strictly before it ends.
///
/// # Errors
///
/// Returns [`PromotionError::InvalidWindow`] otherwise.
pub fn validate_window(starts: DateTime<Utc>, ends: DateTime<Utc>) -> Result<(), PromotionError> {
    if starts >= ends {
        return Err(PromotionError::InvalidWindow);
    }
    Ok(())
}

/// Whether an active promotion applies at `now` (inclusive bounds).
#[must_use]
pub fn is_current(
    active: bool,
    starts: DateTime<Utc>,
    ends: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    active && starts <= now && now <= ends
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn d(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn test_discount_requires_one_value() {
        assert_eq!(
            validate_discount(None, None),
            Err(PromotionError::MissingDiscount)
        );
        assert!(validate_discount(Some(d("15")), None).is_ok());
        assert!(validate_discount(None, Some(d("20.00"))).is_ok());
        assert!(validate_discount(Some(d("10")), Some(d("5"))).is_ok());
    }

    #[test]
    fn test_discount_ranges() {
        assert_eq!(
            validate_discount(Some(d("0")), None),
            Err(PromotionError::PercentageOutOfRange)
        );
        assert_eq!(
            validate_discount(Some(d("100.5")), None),
            Err(PromotionError::PercentageOutOfRange)
        );
        assert!(validate_discount(Some(d("100")), None).is_ok());
        assert_eq!(
            validate_discount(None, Some(d("-1"))),
            Err(PromotionError::NonPositiveAmount)
        );
    }

    #[test]
    fn test_window_must_be_ordered() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(validate_window(start, start + Duration::days(7)).is_ok());
        assert_eq!(
            validate_window(start, start),
            Err(PromotionError::InvalidWindow)
        );
        assert_eq!(
            validate_window(start + Duration::days(1), start),
            Err(PromotionError::InvalidWindow)
        );
    }

    #[test]
    fn test_is_current_bounds_inclusive() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(30);
        assert!(is_current(true, start, end, start));
        assert!(is_current(true, start, end, end));
        assert!(is_current(true, start, end, start + Duration::days(3)));
        assert!(!is_current(true, start, end, end + Duration::seconds(1)));
        assert!(!is_current(false, start, end, start + Duration::days(3)));
    }

    #[test]
    fn test_error_messages_are_client_facing() {
        assert_eq!(
            PromotionError::InvalidWindow.to_string(),
            "La fecha de inicio debe ser anterior a la fecha de término"
        );
    }
}
