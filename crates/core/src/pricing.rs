//! Order and sale arithmetic.
//!
//! Amounts are `Decimal` pesos. Loyalty points redeem at a fixed rate of one
//! peso per point.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Item name stored when neither the client nor the product provides one.
pub const FALLBACK_ITEM_NAME: &str = "Producto";

/// Largest amount a `NUMERIC(10, 2)` money column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, 2);

/// An amount that cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("El monto excede el máximo permitido")]
    AmountTooLarge,
    #[error("Los montos no pueden ser negativos")]
    NegativeAmount,
}

/// Check that an amount fits a money column.
///
/// # Errors
///
/// Returns `PricingError` for negative amounts or amounts above
/// [`MAX_AMOUNT`].
pub fn ensure_amount(amount: Decimal) -> Result<Decimal, PricingError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PricingError::NegativeAmount);
    }
    if amount > MAX_AMOUNT {
        return Err(PricingError::AmountTooLarge);
    }
    Ok(amount)
}

/// A priced line of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl LineAmount {
    #[must_use]
    pub const fn new(quantity: i32, unit_price: Decimal) -> Self {
        Self {
            quantity,
            unit_price,
        }
    }

    /// `unit_price * quantity`.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::AmountTooLarge` when the product does not fit
    /// a money column.
    pub fn total(&self) -> Result<Decimal, PricingError> {
        self.unit_price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or(PricingError::AmountTooLarge)
            .and_then(ensure_amount)
    }
}

/// Sum of all line totals.
///
/// # Errors
///
/// Returns `PricingError` when a line or the running sum is out of range.
pub fn subtotal<'a>(
    lines: impl IntoIterator<Item = &'a LineAmount>,
) -> Result<Decimal, PricingError> {
    lines.into_iter().try_fold(Decimal::ZERO, |acc, line| {
        acc.checked_add(line.total()?)
            .ok_or(PricingError::AmountTooLarge)
            .and_then(ensure_amount)
    })
}

/// Resolved totals for a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    pub subtotal: Decimal,
    /// Manual discount plus the peso value of redeemed points.
    pub discount: Decimal,
    /// Never negative.
    pub total: Decimal,
}

impl SaleTotals {
    /// Apply a manual discount and redeemed points to a subtotal.
    ///
    /// # Errors
    ///
    /// Returns `PricingError` when the discount is negative or any amount
    /// does not fit a money column.
    pub fn compute(
        subtotal: Decimal,
        manual_discount: Decimal,
        points_used: i32,
    ) -> Result<Self, PricingError> {
        let subtotal = ensure_amount(subtotal)?;
        let discount = ensure_amount(manual_discount)?
            .checked_add(points_value(points_used))
            .ok_or(PricingError::AmountTooLarge)
            .and_then(ensure_amount)?;
        let total = (subtotal - discount).max(Decimal::ZERO);
        Ok(Self {
            subtotal,
            discount,
            total,
        })
    }
}

/// Peso value of a number of loyalty points.
#[must_use]
pub fn points_value(points: i32) -> Decimal {
    Decimal::from(points.max(0))
}

/// Amount recorded for a payment: what was tendered, or the exact total.
#[must_use]
pub fn tendered_amount(paid: Option<Decimal>, total: Decimal) -> Decimal {
    match paid {
        Some(amount) if !amount.is_zero() => amount,
        _ => total,
    }
}

/// Change handed back for a payment.
///
/// # Errors
///
/// Returns `PricingError` when the tendered amount is negative or too large.
pub fn change_due(tendered: Decimal, total: Decimal) -> Result<Decimal, PricingError> {
    Ok(ensure_amount(tendered)? - total)
}

/// Prefixes used by generated reference codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Orders placed through the ordering flow.
    Order,
    /// Orders created at the register by a sale.
    Sale,
    /// Payment transaction references.
    Transaction,
}

impl ReferenceKind {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Order => "PED",
            Self::Sale => "VTA",
            Self::Transaction => "TXN",
        }
    }
}

const REFERENCE_SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Build a reference code such as `PED-1718123456789-k3j9x0a1b`.
///
/// `entropy` supplies the random suffix; it is rendered as nine base-36
/// characters.
#[must_use]
pub fn reference_code(kind: ReferenceKind, timestamp_millis: i64, entropy: u64) -> String {
    let mut suffix = [b'0'; REFERENCE_SUFFIX_LEN];
    let mut rest = entropy;
    for slot in suffix.iter_mut().rev() {
        let digit = usize::try_from(rest % 36).unwrap_or(0);
        *slot = BASE36.get(digit).copied().unwrap_or(b'0');
        rest /= 36;
    }
    let suffix = String::from_utf8_lossy(&suffix);
    format!("{}-{timestamp_millis}-{suffix}", kind.prefix())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn d(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn test_line_total_and_subtotal() {
        let lines = [
            LineAmount::new(2, d("45.50")),
            LineAmount::new(1, d("30")),
        ];
        assert_eq!(lines[0].total().unwrap(), d("91.00"));
        assert_eq!(subtotal(&lines).unwrap(), d("121.00"));
    }

    #[test]
    fn test_subtotal_of_nothing_is_zero() {
        assert_eq!(subtotal(&[]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_oversized_amounts_are_rejected() {
        let huge = LineAmount::new(2, d("70000000000000000000000000000"));
        assert_eq!(huge.total(), Err(PricingError::AmountTooLarge));
        assert_eq!(subtotal(&[huge]), Err(PricingError::AmountTooLarge));

        let at_limit = LineAmount::new(1, MAX_AMOUNT);
        assert_eq!(subtotal(&[at_limit]).unwrap(), d("9999999.99"));
        assert_eq!(
            subtotal(&[at_limit, LineAmount::new(1, d("0.01"))]),
            Err(PricingError::AmountTooLarge)
        );

        assert_eq!(
            SaleTotals::compute(Decimal::ZERO, Decimal::MAX, 5),
            Err(PricingError::AmountTooLarge)
        );
        assert_eq!(
            SaleTotals::compute(d("10"), d("-1"), 0),
            Err(PricingError::NegativeAmount)
        );
        assert_eq!(
            change_due(Decimal::MIN, d("10")),
            Err(PricingError::NegativeAmount)
        );
    }

    #[test]
    fn test_sale_totals_apply_points_and_discount() {
        let totals = SaleTotals::compute(d("150"), d("10"), 25).unwrap();
        assert_eq!(totals.discount, d("35"));
        assert_eq!(totals.total, d("115"));
        assert_eq!(totals.subtotal, d("150"));
    }

    #[test]
    fn test_sale_total_never_negative() {
        let totals = SaleTotals::compute(d("20"), d("5"), 100).unwrap();
        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(totals.discount, d("105"));
    }

    #[test]
    fn test_negative_points_are_ignored() {
        assert_eq!(points_value(-5), Decimal::ZERO);
    }

    #[test]
    fn test_tendered_and_change() {
        assert_eq!(tendered_amount(Some(d("200")), d("115")), d("200"));
        assert_eq!(tendered_amount(None, d("115")), d("115"));
        assert_eq!(tendered_amount(Some(Decimal::ZERO), d("115")), d("115"));
        assert_eq!(change_due(d("200"), d("115")).unwrap(), d("85"));
        assert_eq!(change_due(d("115"), d("115")).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_reference_code_shape() {
        let code = reference_code(ReferenceKind::Order, 1_718_000_000_000, 35);
        assert_eq!(code, "PED-1718000000000-00000000z");

        let sale = reference_code(ReferenceKind::Sale, 1, u64::MAX);
        let suffix = sale.rsplit('-').next().unwrap_or_default();
        assert!(sale.starts_with("VTA-1-"));
        assert_eq!(suffix.len(), 9);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));

        assert!(reference_code(ReferenceKind::Transaction, 5, 0).starts_with("TXN-5-"));
    }
}
