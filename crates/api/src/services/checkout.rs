//! Order and sale pipelines.
//!
//! Both pipelines price their items against the catalog and write the
//! order, its items, and its payments inside a single transaction. A sale
//! additionally redeems points and counts a visit for the customer.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, instrument};

use dengo_core::pricing::{
    FALLBACK_ITEM_NAME, LineAmount, PricingError, ReferenceKind, SaleTotals, change_due,
    reference_code, subtotal, tendered_amount,
};
use dengo_core::{
    BranchId, DEFAULT_DELIVERY_METHOD, DEFAULT_PAYMENT_METHOD, OrderId, OrderStatus, ProductId,
    RecipeId, UserId,
};

use crate::db::RepositoryError;
use crate::db::orders::{
    catalog_entries, insert_items, insert_order, insert_payments, load_detail, mark_delivered,
};
use crate::db::users::{debit_points, loyalty_state};
use crate::error::{AppError, add_breadcrumb};
use crate::models::ProductRef;
use crate::models::order::{NewOrder, NewOrderItem, NewPayment, OrderDetail};
use crate::services::loyalty::{TierCache, apply_visit};

/// A line item as submitted by a client.
///
/// Price and name fall back to the catalog when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct LineRequest {
    pub producto_id: Option<ProductId>,
    pub receta_id: Option<RecipeId>,
    pub nombre_item: Option<String>,
    pub cantidad: i32,
    pub precio_unitario: Option<Decimal>,
    pub personalizaciones: Option<serde_json::Value>,
}

/// Body of `POST /pedidos`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    pub usuario_id: Option<UserId>,
    pub sucursal_id: Option<BranchId>,
    pub metodo_entrega: Option<String>,
    pub notas: Option<String>,
    pub datos_personalizados: Option<serde_json::Value>,
    #[serde(default)]
    pub items: Vec<LineRequest>,
    #[serde(default)]
    pub pagos: Vec<NewPayment>,
}

/// Body of `POST /ventas/registrar-venta`.
#[derive(Debug, Clone, Deserialize)]
pub struct SaleRequest {
    pub pedido_id: Option<OrderId>,
    pub sucursal_id: Option<BranchId>,
    pub usuario_id: Option<UserId>,
    #[serde(default)]
    pub items: Vec<LineRequest>,
    pub metodo_pago: Option<String>,
    pub monto_pagado: Option<Decimal>,
    #[serde(default)]
    pub puntos_usados: i32,
    #[serde(default)]
    pub descuento_aplicado: Decimal,
    pub notas: Option<String>,
    pub referencia_transaccion: Option<String>,
}

/// A registered sale.
#[derive(Debug, Clone)]
pub struct SaleReceipt {
    pub venta: OrderDetail,
    pub puntos_usados: i32,
}

fn new_reference(kind: ReferenceKind) -> String {
    reference_code(kind, Utc::now().timestamp_millis(), rand::random())
}

fn validate_lines(items: &[LineRequest], empty_message: &str) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::bad_request(empty_message));
    }
    if items.iter().any(|item| item.cantidad <= 0) {
        return Err(AppError::bad_request(
            "La cantidad de cada item debe ser mayor a cero",
        ));
    }
    Ok(())
}

/// Products whose price or name has to come from the catalog.
fn catalog_lookups(items: &[LineRequest]) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = items
        .iter()
        .filter(|item| {
            item.precio_unitario.is_none_or(|price| price.is_zero())
                || item.nombre_item.as_deref().is_none_or(str::is_empty)
        })
        .filter_map(|item| item.producto_id)
        .collect();
    ids.sort_unstable_by_key(|id| id.get());
    ids.dedup();
    ids
}

/// Resolve every line's unit price and display name.
///
/// A missing or zero price takes the product's current price (0 when the
/// product is unknown). A missing name takes the product's name, then
/// [`FALLBACK_ITEM_NAME`].
fn price_lines(items: &[LineRequest], catalog: &HashMap<ProductId, ProductRef>) -> Vec<NewOrderItem> {
    items
        .iter()
        .map(|item| {
            let product = item.producto_id.and_then(|id| catalog.get(&id));
            let precio_unitario = match item.precio_unitario {
                Some(price) if !price.is_zero() => price,
                _ => product.map_or(Decimal::ZERO, |p| p.precio),
            };
            let nombre_item = item
                .nombre_item
                .clone()
                .filter(|name| !name.is_empty())
                .or_else(|| product.map(|p| p.nombre.clone()))
                .unwrap_or_else(|| FALLBACK_ITEM_NAME.to_string());

            NewOrderItem {
                producto_id: item.producto_id,
                receta_id: item.receta_id,
                nombre_item,
                cantidad: item.cantidad,
                precio_unitario,
                personalizaciones: item.personalizaciones.clone(),
            }
        })
        .collect()
}

fn items_subtotal(items: &[NewOrderItem]) -> Result<Decimal, PricingError> {
    let lines: Vec<LineAmount> = items
        .iter()
        .map(|item| LineAmount::new(item.cantidad, item.precio_unitario))
        .collect();
    subtotal(&lines)
}

/// Place an order in the `recibido` state.
///
/// # Errors
///
/// Returns `AppError::BadRequest` when the branch or items are missing and
/// `AppError::Database` when a write fails.
#[instrument(skip(pool, request), fields(sucursal_id = tracing::field::Empty, items = request.items.len()))]
pub async fn create_order(pool: &PgPool, request: OrderRequest) -> Result<OrderDetail, AppError> {
    let Some(sucursal_id) = request.sucursal_id else {
        return Err(AppError::bad_request("La sucursal es requerida"));
    };
    tracing::Span::current().record("sucursal_id", sucursal_id.get());
    validate_lines(&request.items, "El pedido debe tener al menos un item")?;

    let mut tx = pool.begin().await.map_err(RepositoryError::from)?;

    let catalog = catalog_entries(&mut tx, &catalog_lookups(&request.items)).await?;
    let items = price_lines(&request.items, &catalog);
    let subtotal = items_subtotal(&items)?;

    let order = insert_order(
        &mut tx,
        &NewOrder {
            usuario_id: request.usuario_id,
            sucursal_id,
            numero_pedido: new_reference(ReferenceKind::Order),
            metodo_entrega: request
                .metodo_entrega
                .unwrap_or_else(|| DEFAULT_DELIVERY_METHOD.to_string()),
            notas: request.notas,
            datos_personalizados: request.datos_personalizados,
            subtotal,
            descuentos: Decimal::ZERO,
            total: subtotal,
            estado: OrderStatus::Recibido,
        },
    )
    .await?;
    insert_items(&mut tx, order.id, &items).await?;
    insert_payments(&mut tx, order.id, &request.pagos).await?;

    let detail = load_detail(&mut tx, order.id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("order {} vanished after insert", order.id)))?;
    tx.commit().await.map_err(RepositoryError::from)?;

    add_breadcrumb(
        "orders",
        "Order created",
        &[
            ("order_id", order.id.to_string()),
            ("numero_pedido", order.numero_pedido.clone()),
        ],
    );
    info!(order_id = %order.id, numero_pedido = %order.numero_pedido, "Order created");

    Ok(detail)
}

/// Register a sale, closing an existing order or creating a delivered one.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for invalid input,
/// `AppError::InsufficientPoints` when the customer cannot cover the
/// redeemed points, `AppError::NotFound` when `pedido_id` does not exist,
/// and `AppError::Database` when a write fails. Nothing is written unless
/// the whole sale succeeds.
#[instrument(skip(pool, tiers, request), fields(sucursal_id = tracing::field::Empty, pedido_id = ?request.pedido_id))]
pub async fn register_sale(
    pool: &PgPool,
    tiers: &TierCache,
    request: SaleRequest,
) -> Result<SaleReceipt, AppError> {
    let Some(sucursal_id) = request.sucursal_id else {
        return Err(AppError::bad_request("La sucursal es requerida"));
    };
    tracing::Span::current().record("sucursal_id", sucursal_id.get());
    validate_lines(&request.items, "La venta debe tener al menos un item")?;
    if request.puntos_usados < 0 {
        return Err(AppError::bad_request(
            "Los puntos usados no pueden ser negativos",
        ));
    }
    if request.puntos_usados > 0 && request.usuario_id.is_none() {
        return Err(AppError::bad_request(
            "Se requiere un usuario registrado para usar puntos",
        ));
    }

    let thresholds = tiers.thresholds(pool).await?;
    let mut tx = pool.begin().await.map_err(RepositoryError::from)?;

    let catalog = catalog_entries(&mut tx, &catalog_lookups(&request.items)).await?;
    let items = price_lines(&request.items, &catalog);
    let totals = SaleTotals::compute(
        items_subtotal(&items)?,
        request.descuento_aplicado,
        request.puntos_usados,
    )?;

    if request.puntos_usados > 0
        && let Some(user) = request.usuario_id
        && debit_points(&mut tx, user, request.puntos_usados)
            .await?
            .is_none()
    {
        let available = loyalty_state(&mut tx, user)
            .await?
            .map_or(0, |state| state.puntos);
        return Err(AppError::InsufficientPoints {
            available,
            required: request.puntos_usados,
        });
    }

    let order_id = if let Some(existing) = request.pedido_id {
        mark_delivered(&mut tx, existing, totals.discount, totals.total)
            .await?
            .ok_or_else(|| AppError::not_found("Pedido no encontrado"))?
            .id
    } else {
        let order = insert_order(
            &mut tx,
            &NewOrder {
                usuario_id: request.usuario_id,
                sucursal_id,
                numero_pedido: new_reference(ReferenceKind::Sale),
                metodo_entrega: DEFAULT_DELIVERY_METHOD.to_string(),
                notas: request.notas,
                datos_personalizados: None,
                subtotal: totals.subtotal,
                descuentos: totals.discount,
                total: totals.total,
                estado: OrderStatus::Entregado,
            },
        )
        .await?;
        insert_items(&mut tx, order.id, &items).await?;
        order.id
    };

    let tendered = tendered_amount(request.monto_pagado, totals.total);
    let cambio = change_due(tendered, totals.total)?;
    let payment = NewPayment {
        pagado_por_usuario_id: request.usuario_id,
        metodo: request
            .metodo_pago
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
        monto: tendered,
        cambio,
        referencia_transaccion: Some(
            request
                .referencia_transaccion
                .unwrap_or_else(|| new_reference(ReferenceKind::Transaction)),
        ),
    };
    insert_payments(&mut tx, order_id, std::slice::from_ref(&payment)).await?;

    if let Some(user) = request.usuario_id {
        apply_visit(&mut tx, user, 0, &thresholds).await?;
    }

    let venta = load_detail(&mut tx, order_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("sale {order_id} vanished after insert")))?;
    tx.commit().await.map_err(RepositoryError::from)?;

    add_breadcrumb(
        "sales",
        "Sale registered",
        &[
            ("order_id", order_id.to_string()),
            ("total", totals.total.to_string()),
        ],
    );
    info!(
        order_id = %order_id,
        total = %totals.total,
        puntos_usados = request.puntos_usados,
        "Sale registered"
    );

    Ok(SaleReceipt {
        venta,
        puntos_usados: request.puntos_usados,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn line(producto: Option<i32>, price: Option<&str>, name: Option<&str>, qty: i32) -> LineRequest {
        LineRequest {
            producto_id: producto.map(ProductId::new),
            receta_id: None,
            nombre_item: name.map(str::to_string),
            cantidad: qty,
            precio_unitario: price.map(d),
            personalizaciones: None,
        }
    }

    fn catalog() -> HashMap<ProductId, ProductRef> {
        let latte = ProductRef {
            id: ProductId::new(1),
            nombre: "Latte".to_string(),
            precio: d("55.00"),
        };
        HashMap::from([(latte.id, latte)])
    }

    #[test]
    fn test_catalog_lookups_only_incomplete_lines() {
        let items = vec![
            line(Some(1), None, Some("Latte"), 1),
            line(Some(2), Some("30"), Some("Té"), 1),
            line(Some(3), Some("30"), None, 1),
            line(Some(1), Some("0"), Some("Latte"), 2),
            line(None, None, None, 1),
        ];
        let ids = catalog_lookups(&items);
        assert_eq!(ids, vec![ProductId::new(1), ProductId::new(3)]);
    }

    #[test]
    fn test_price_lines_uses_catalog_and_fallbacks() {
        let items = vec![
            line(Some(1), None, None, 2),
            line(Some(1), Some("60"), Some("Latte grande"), 1),
            line(Some(99), None, None, 1),
            line(None, Some("12.5"), None, 4),
        ];
        let priced = price_lines(&items, &catalog());

        assert_eq!(priced[0].precio_unitario, d("55.00"));
        assert_eq!(priced[0].nombre_item, "Latte");
        assert_eq!(priced[1].precio_unitario, d("60"));
        assert_eq!(priced[1].nombre_item, "Latte grande");
        assert_eq!(priced[2].precio_unitario, Decimal::ZERO);
        assert_eq!(priced[2].nombre_item, FALLBACK_ITEM_NAME);
        assert_eq!(priced[3].nombre_item, FALLBACK_ITEM_NAME);

        assert_eq!(items_subtotal(&priced).unwrap(), d("220.00"));
    }

    #[test]
    fn test_oversized_client_price_is_a_bad_request() {
        let request: OrderRequest = serde_json::from_value(serde_json::json!({
            "sucursal_id": 1,
            "items": [{
                "producto_id": 1,
                "nombre_item": "Latte",
                "cantidad": 2,
                "precio_unitario": "70000000000000000000000000000"
            }]
        }))
        .unwrap();
        let priced = price_lines(&request.items, &catalog());

        let err = AppError::from(items_subtotal(&priced).unwrap_err());
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_validate_lines() {
        assert!(validate_lines(&[], "vacío").is_err());
        assert!(validate_lines(&[line(Some(1), None, None, 0)], "vacío").is_err());
        assert!(validate_lines(&[line(Some(1), None, None, 1)], "vacío").is_ok());
    }

    #[test]
    fn test_new_reference_shape() {
        let code = new_reference(ReferenceKind::Sale);
        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "VTA");
        assert_eq!(parts[2].len(), 9);
    }

    #[test]
    fn test_sale_request_defaults() {
        let request: SaleRequest = serde_json::from_value(serde_json::json!({
            "sucursal_id": 1,
            "items": [{"producto_id": 1, "cantidad": 1}]
        }))
        .unwrap();
        assert_eq!(request.puntos_usados, 0);
        assert_eq!(request.descuento_aplicado, Decimal::ZERO);
        assert!(request.metodo_pago.is_none());
    }
}
