//! Sales reporting over delivered orders.
//!
//! The API loads raw rows for a period and hands them here; everything in
//! this module is plain aggregation.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// Default number of products in a best-seller ranking.
pub const DEFAULT_BEST_SELLER_LIMIT: usize = 10;

/// Parse a date filter from a query string.
///
/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (taken as
/// midnight UTC).
#[must_use]
pub fn parse_date_bound(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// One payment attached to a sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub metodo: String,
    pub monto: Decimal,
}

/// A delivered order as seen by the summary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SaleRecord {
    pub total: Decimal,
    pub payments: Vec<PaymentRecord>,
}

/// Count and amount collected through one payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MethodTotals {
    pub cantidad: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub monto_total: Decimal,
}

/// Aggregate figures for a set of sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SalesSummary {
    pub total_ventas: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub ingreso_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub promedio_venta: Decimal,
    pub ventas_por_metodo: BTreeMap<String, MethodTotals>,
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Summarize sales: count, revenue, average ticket, and per-method totals.
///
/// Revenue and average are rounded to cents. A sale with split payments
/// counts once per payment in the method breakdown.
#[must_use]
pub fn summarize_sales(sales: &[SaleRecord]) -> SalesSummary {
    let total_ventas = sales.len();
    let revenue: Decimal = sales.iter().map(|sale| sale.total).sum();
    let average = if total_ventas == 0 {
        Decimal::ZERO
    } else {
        revenue / Decimal::from(total_ventas)
    };

    let mut ventas_por_metodo: BTreeMap<String, MethodTotals> = BTreeMap::new();
    for payment in sales.iter().flat_map(|sale| &sale.payments) {
        let entry = ventas_por_metodo.entry(payment.metodo.clone()).or_default();
        entry.cantidad += 1;
        entry.monto_total += payment.monto;
    }

    SalesSummary {
        total_ventas,
        ingreso_total: round_money(revenue),
        promedio_venta: round_money(average),
        ventas_por_metodo,
    }
}

/// A sold order line joined with its product's current catalog data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoldLine {
    pub producto_id: ProductId,
    pub nombre: String,
    pub precio: Decimal,
    pub cantidad: i32,
}

/// One entry of a best-seller ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestSeller {
    pub id: ProductId,
    pub nombre: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub precio: Decimal,
    pub cantidad_vendida: i64,
    /// Quantity times the current catalog price.
    #[serde(with = "rust_decimal::serde::float")]
    pub ingresos_generados: Decimal,
}

/// Rank products by units sold, highest first, keeping the top `limit`.
///
/// Ties keep the order in which products were first seen.
#[must_use]
pub fn best_sellers(lines: &[SoldLine], limit: usize) -> Vec<BestSeller> {
    let mut ranking: Vec<BestSeller> = Vec::new();
    let mut index: HashMap<ProductId, usize> = HashMap::new();

    for line in lines {
        let slot = *index.entry(line.producto_id).or_insert_with(|| {
            ranking.push(BestSeller {
                id: line.producto_id,
                nombre: line.nombre.clone(),
                precio: line.precio,
                cantidad_vendida: 0,
                ingresos_generados: Decimal::ZERO,
            });
            ranking.len() - 1
        });
        if let Some(entry) = ranking.get_mut(slot) {
            entry.cantidad_vendida += i64::from(line.cantidad);
            entry.ingresos_generados += line.precio * Decimal::from(line.cantidad);
        }
    }

    ranking.sort_by(|a, b| b.cantidad_vendida.cmp(&a.cantidad_vendida));
    ranking.truncate(limit);
    ranking
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn d(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn payment(metodo: &str, monto: &str) -> PaymentRecord {
        PaymentRecord {
            metodo: metodo.to_string(),
            monto: d(monto),
        }
    }

    #[test]
    fn test_parse_date_bound_formats() {
        assert_eq!(
            parse_date_bound("2025-02-10"),
            Some(Utc.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date_bound("2025-02-10T15:00:00-06:00"),
            Some(Utc.with_ymd_and_hms(2025, 2, 10, 21, 0, 0).unwrap())
        );
        assert_eq!(parse_date_bound("ayer"), None);
    }

    #[test]
    fn test_summary_of_no_sales() {
        let summary = summarize_sales(&[]);
        assert_eq!(summary.total_ventas, 0);
        assert_eq!(summary.ingreso_total, Decimal::ZERO);
        assert_eq!(summary.promedio_venta, Decimal::ZERO);
        assert!(summary.ventas_por_metodo.is_empty());
    }

    #[test]
    fn test_summary_totals_and_methods() {
        let sales = vec![
            SaleRecord {
                total: d("100"),
                payments: vec![payment("tarjeta", "100")],
            },
            SaleRecord {
                total: d("50.25"),
                payments: vec![payment("efectivo", "60"), payment("tarjeta", "0")],
            },
            SaleRecord {
                total: d("0.10"),
                payments: vec![],
            },
        ];

        let summary = summarize_sales(&sales);
        assert_eq!(summary.total_ventas, 3);
        assert_eq!(summary.ingreso_total, d("150.35"));
        assert_eq!(summary.promedio_venta, d("50.12"));

        let tarjeta = summary.ventas_por_metodo.get("tarjeta").unwrap();
        assert_eq!(tarjeta.cantidad, 2);
        assert_eq!(tarjeta.monto_total, d("100"));
        let efectivo = summary.ventas_por_metodo.get("efectivo").unwrap();
        assert_eq!(efectivo.cantidad, 1);
        assert_eq!(efectivo.monto_total, d("60"));
    }

    #[test]
    fn test_summary_serializes_numbers() {
        let summary = summarize_sales(&[SaleRecord {
            total: d("10.5"),
            payments: vec![payment("tarjeta", "10.5")],
        }]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["ingreso_total"], 10.5);
        assert_eq!(json["ventas_por_metodo"]["tarjeta"]["cantidad"], 1);
    }

    #[test]
    fn test_best_sellers_ranks_and_limits() {
        let line = |id: i32, nombre: &str, precio: &str, cantidad: i32| SoldLine {
            producto_id: ProductId::new(id),
            nombre: nombre.to_string(),
            precio: d(precio),
            cantidad,
        };
        let lines = vec![
            line(1, "Dango", "40", 2),
            line(2, "Mochi", "35", 5),
            line(1, "Dango", "40", 4),
            line(3, "Té", "25", 1),
        ];

        let top = best_sellers(&lines, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, ProductId::new(1));
        assert_eq!(top[0].cantidad_vendida, 6);
        assert_eq!(top[0].ingresos_generados, d("240"));
        assert_eq!(top[1].id, ProductId::new(2));
    }

    #[test]
    fn test_best_sellers_ties_keep_first_seen_order() {
        let lines = vec![
            SoldLine {
                producto_id: ProductId::new(9),
                nombre: "A".into(),
                precio: d("1"),
                cantidad: 3,
            },
            SoldLine {
                producto_id: ProductId::new(4),
                nombre: "B".into(),
                precio: d("1"),
                cantidad: 3,
            },
        ];
        let ranking = best_sellers(&lines, DEFAULT_BEST_SELLER_LIMIT);
        assert_eq!(ranking[0].id, ProductId::new(9));
        assert_eq!(ranking[1].id, ProductId::new(4));
    }
}
