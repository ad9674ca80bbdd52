//! Orders, line items, and payments.
//!
//! A sale is an order in the `entregado` state with at least one payment.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use dengo_core::{
    BranchId, OrderId, OrderItemId, OrderStatus, PaymentId, ProductId, RecipeId, UserId,
};

use super::{BranchRef, ProductRef, RecipeRef, UserRef};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: OrderId,
    pub usuario_id: Option<UserId>,
    pub sucursal_id: BranchId,
    pub numero_pedido: String,
    pub metodo_entrega: String,
    pub notas: Option<String>,
    pub datos_personalizados: Option<serde_json::Value>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub descuentos: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub estado: OrderStatus,
    pub creado_en: DateTime<Utc>,
    pub actualizado_en: DateTime<Utc>,
}

/// An order row with its customer and branch embedded.
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    #[sqlx(flatten)]
    pub order: Order,
    pub usuarios: Option<Json<UserRef>>,
    pub sucursales: Option<Json<BranchRef>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub pedido_id: OrderId,
    pub producto_id: Option<ProductId>,
    pub receta_id: Option<RecipeId>,
    pub nombre_item: String,
    pub cantidad: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub precio_unitario: Decimal,
    pub personalizaciones: Option<serde_json::Value>,
}

/// A line item with its product and recipe embedded.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItemDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: OrderItem,
    pub productos: Option<Json<ProductRef>>,
    pub recetas_comunidad: Option<Json<RecipeRef>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Payment {
    pub id: PaymentId,
    pub pedido_id: OrderId,
    pub pagado_por_usuario_id: Option<UserId>,
    pub metodo: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub monto: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cambio: Decimal,
    pub referencia_transaccion: Option<String>,
    pub creado_en: DateTime<Utc>,
}

/// An order with everything a client screen needs.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items_pedido: Vec<OrderItemDetail>,
    pub pagos: Vec<Payment>,
    pub usuarios: Option<Json<UserRef>>,
    pub sucursales: Option<Json<BranchRef>>,
}

/// Values for a new order header.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub usuario_id: Option<UserId>,
    pub sucursal_id: BranchId,
    pub numero_pedido: String,
    pub metodo_entrega: String,
    pub notas: Option<String>,
    pub datos_personalizados: Option<serde_json::Value>,
    pub subtotal: Decimal,
    pub descuentos: Decimal,
    pub total: Decimal,
    pub estado: OrderStatus,
}

/// A line item with its price and name already resolved.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub producto_id: Option<ProductId>,
    pub receta_id: Option<RecipeId>,
    pub nombre_item: String,
    pub cantidad: i32,
    pub precio_unitario: Decimal,
    pub personalizaciones: Option<serde_json::Value>,
}

/// A payment as submitted by a client or produced by a sale.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub pagado_por_usuario_id: Option<UserId>,
    pub metodo: String,
    pub monto: Decimal,
    #[serde(default)]
    pub cambio: Decimal,
    pub referencia_transaccion: Option<String>,
}

/// Filters shared by order and sale listings.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub usuario_id: Option<UserId>,
    pub sucursal_id: Option<BranchId>,
    pub estado: Option<OrderStatus>,
    pub desde: Option<DateTime<Utc>>,
    pub hasta: Option<DateTime<Utc>>,
    pub metodo_pago: Option<String>,
}

/// Totals and payments of one delivered order, for the sales summary.
#[derive(Debug, Clone, FromRow)]
pub struct SaleTotalsRow {
    pub id: OrderId,
    pub total: Decimal,
}

/// One payment of a delivered order, for the sales summary.
#[derive(Debug, Clone, FromRow)]
pub struct SalePaymentRow {
    pub pedido_id: OrderId,
    pub metodo: String,
    pub monto: Decimal,
}

/// A delivered line joined with its product, for best-seller rankings.
#[derive(Debug, Clone, FromRow)]
pub struct SoldLineRow {
    pub producto_id: ProductId,
    pub nombre: String,
    pub precio: Decimal,
    pub cantidad: i32,
}
