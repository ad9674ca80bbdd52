//! Sale (venta) route handlers.
//!
//! A sale is a delivered order. Listings and reports reuse the order
//! filters, pinned to the `entregado` status.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use dengo_core::OrderStatus;
use dengo_core::reporting::{
    BestSeller, DEFAULT_BEST_SELLER_LIMIT, SalesSummary, best_sellers, summarize_sales,
};

use crate::db::OrderRepository;
use crate::error::Result;
use crate::extract::{Json, Query};
use crate::models::order::{OrderDetail, OrderFilter};
use crate::routes::orders::{ListQuery, Pagination};
use crate::services::checkout::{self, SaleRequest};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SaleRegistered {
    pub mensaje: &'static str,
    pub venta: OrderDetail,
    pub puntos_usados: i32,
}

#[derive(Debug, Serialize)]
pub struct SalePage {
    pub ventas: Vec<OrderDetail>,
    pub paginacion: Pagination,
}

#[derive(Debug, Serialize)]
pub struct Period {
    pub inicio: String,
    pub fin: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub resumen: SalesSummary,
    pub periodo: Period,
}

#[derive(Debug, Serialize)]
pub struct BestSellerResponse {
    pub productos_mas_vendidos: Vec<BestSeller>,
    pub total_productos: usize,
}

fn delivered(query: &ListQuery) -> Result<OrderFilter> {
    let mut filter = query.filter()?;
    filter.estado = Some(OrderStatus::Entregado);
    Ok(filter)
}

/// `POST /ventas/registrar-venta`
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<SaleRequest>,
) -> Result<Response> {
    let receipt = checkout::register_sale(state.pool(), state.tiers(), request).await?;
    Ok((
        StatusCode::CREATED,
        Json(SaleRegistered {
            mensaje: "Venta registrada exitosamente",
            venta: receipt.venta,
            puntos_usados: receipt.puntos_usados,
        }),
    )
        .into_response())
}

/// `GET /ventas`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<SalePage>> {
    let filter = delivered(&query)?;
    let page = query.page();
    let (ventas, total) = OrderRepository::new(state.pool())
        .list(&filter, page)
        .await?;

    Ok(Json(SalePage {
        ventas,
        paginacion: Pagination {
            pagina: page.page(),
            por_pagina: page.per_page(),
            total,
        },
    }))
}

/// `GET /ventas/resumen`
#[instrument(skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<SummaryResponse>> {
    let filter = delivered(&query)?;
    let records = OrderRepository::new(state.pool())
        .sale_records(&filter)
        .await?;

    let label = |raw: &Option<String>, fallback: &str| {
        raw.as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(fallback)
            .to_string()
    };

    Ok(Json(SummaryResponse {
        resumen: summarize_sales(&records),
        periodo: Period {
            inicio: label(&query.fecha_inicio, "Inicio"),
            fin: label(&query.fecha_fin, "Ahora"),
        },
    }))
}

/// `?limite=` on top of the usual filters.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limite: Option<usize>,
}

/// `GET /ventas/mas-vendidas`
#[instrument(skip(state))]
pub async fn best_selling(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(limit): Query<LimitQuery>,
) -> Result<Json<BestSellerResponse>> {
    let filter = delivered(&query)?;
    let lines = OrderRepository::new(state.pool())
        .sold_lines(&filter)
        .await?;

    let limit = limit
        .limite
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_BEST_SELLER_LIMIT);
    let productos_mas_vendidos = best_sellers(&lines, limit);

    Ok(Json(BestSellerResponse {
        total_productos: productos_mas_vendidos.len(),
        productos_mas_vendidos,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sales_filter_pins_delivered() {
        let query = ListQuery {
            estado: Some("cancelado".to_string()),
            ..ListQuery::default()
        };
        let filter = delivered(&query).unwrap();
        assert_eq!(filter.estado, Some(OrderStatus::Entregado));
    }

    #[test]
    fn test_summary_period_labels_serialize() {
        let body = serde_json::to_value(SummaryResponse {
            resumen: summarize_sales(&[]),
            periodo: Period {
                inicio: "Inicio".to_string(),
                fin: "Ahora".to_string(),
            },
        })
        .unwrap();
        assert_eq!(body["resumen"]["total_ventas"], 0);
        assert_eq!(body["periodo"]["fin"], "Ahora");
    }
}
