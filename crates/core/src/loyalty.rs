//! Loyalty points and account tiers.
//!
//! Customers earn one point per ten pesos spent and climb tiers
//! (`niveles_cuenta`) as their visit count grows.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::types::TierId;

/// Pesos spent per point earned.
pub const PESOS_PER_POINT: i64 = 10;

/// Points earned for a purchase total: `floor(total / 10)`, never negative.
#[must_use]
pub fn points_for_total(total: Decimal) -> i32 {
    if total.is_sign_negative() {
        return 0;
    }
    (total / Decimal::from(PESOS_PER_POINT))
        .floor()
        .to_i32()
        .unwrap_or(i32::MAX)
}

/// The payload encoded in a points QR code.
///
/// Field order and names are what the mobile app scans for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsVoucher {
    pub puntos: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub fecha: String,
}

impl PointsVoucher {
    /// Issue a voucher for a purchase total at `issued_at`.
    #[must_use]
    pub fn issue(total: Decimal, issued_at: DateTime<Utc>) -> Self {
        Self {
            puntos: points_for_total(total),
            total,
            fecha: issued_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// A tier threshold: reaching `visitas_minimas` visits unlocks the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThreshold {
    pub id: TierId,
    pub visitas_minimas: i32,
}

/// Pick the tier a customer should be promoted to after a visit.
///
/// Returns the highest tier whose threshold is above the customer's current
/// tier threshold and at or below the new visit count, or `None` when the
/// customer stays where they are. A customer without a tier is treated as
/// sitting at threshold zero.
#[must_use]
pub fn next_tier(
    current: Option<TierId>,
    visits: i32,
    tiers: &[TierThreshold],
) -> Option<TierId> {
    let current_min = current
        .and_then(|id| tiers.iter().find(|tier| tier.id == id))
        .map_or(0, |tier| tier.visitas_minimas);

    tiers
        .iter()
        .filter(|tier| tier.visitas_minimas > current_min && tier.visitas_minimas <= visits)
        .max_by_key(|tier| tier.visitas_minimas)
        .map(|tier| tier.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ladder() -> Vec<TierThreshold> {
        vec![
            TierThreshold {
                id: TierId::new(1),
                visitas_minimas: 0,
            },
            TierThreshold {
                id: TierId::new(2),
                visitas_minimas: 5,
            },
            TierThreshold {
                id: TierId::new(3),
                visitas_minimas: 15,
            },
            TierThreshold {
                id: TierId::new(4),
                visitas_minimas: 30,
            },
        ]
    }

    #[test]
    fn test_points_for_total_floors() {
        assert_eq!(points_for_total("0".parse().unwrap()), 0);
        assert_eq!(points_for_total("9.99".parse().unwrap()), 0);
        assert_eq!(points_for_total("10".parse().unwrap()), 1);
        assert_eq!(points_for_total("259.90".parse().unwrap()), 25);
    }

    #[test]
    fn test_points_for_negative_total_is_zero() {
        assert_eq!(points_for_total("-50".parse().unwrap()), 0);
    }

    #[test]
    fn test_voucher_json_shape() {
        let issued = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap();
        let voucher = PointsVoucher::issue("125.5".parse().unwrap(), issued);
        assert_eq!(voucher.puntos, 12);

        let json = serde_json::to_value(&voucher).unwrap();
        assert_eq!(json["puntos"], 12);
        assert_eq!(json["total"], 125.5);
        assert_eq!(json["fecha"], "2025-03-01T12:30:00.000Z");
    }

    #[test]
    fn test_next_tier_promotes_to_highest_reached() {
        let tiers = ladder();
        assert_eq!(next_tier(Some(TierId::new(1)), 5, &tiers), Some(TierId::new(2)));
        assert_eq!(next_tier(Some(TierId::new(1)), 20, &tiers), Some(TierId::new(3)));
        assert_eq!(next_tier(Some(TierId::new(2)), 31, &tiers), Some(TierId::new(4)));
    }

    #[test]
    fn test_next_tier_none_when_threshold_not_reached() {
        let tiers = ladder();
        assert_eq!(next_tier(Some(TierId::new(2)), 14, &tiers), None);
        assert_eq!(next_tier(Some(TierId::new(4)), 100, &tiers), None);
    }

    #[test]
    fn test_next_tier_without_current_tier() {
        let tiers = ladder();
        assert_eq!(next_tier(None, 1, &tiers), None);
        assert_eq!(next_tier(None, 6, &tiers), Some(TierId::new(2)));
    }

    #[test]
    fn test_next_tier_unknown_current_treated_as_zero() {
        let tiers = ladder();
        assert_eq!(next_tier(Some(TierId::new(99)), 5, &tiers), Some(TierId::new(2)));
    }

    #[test]
    fn test_next_tier_empty_ladder() {
        assert_eq!(next_tier(None, 1000, &[]), None);
    }
}
