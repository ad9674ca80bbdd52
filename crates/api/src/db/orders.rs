//! Order repository.
//!
//! Orders and sales share the `pedidos` table: a sale is an order in the
//! `entregado` state. Reads assemble an [`OrderDetail`] from three queries
//! (orders, then items and payments for all of them with `= ANY($1)`).
//!
//! Writes used by the order and sale pipelines are free functions over a
//! `PgConnection` so they can share one transaction.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use dengo_core::reporting::{PaymentRecord, SaleRecord, SoldLine};
use dengo_core::{OrderId, OrderStatus, ProductId, UserId};

use super::{PageParams, RepositoryError};
use crate::models::ProductRef;
use crate::models::order::{
    NewOrder, NewOrderItem, NewPayment, Order, OrderDetail, OrderFilter, OrderItemDetail,
    OrderRow, Payment, SalePaymentRow, SaleTotalsRow, SoldLineRow,
};

const ORDER_COLUMNS: &str = "id, usuario_id, sucursal_id, numero_pedido, metodo_entrega, notas, \
     datos_personalizados, subtotal, descuentos, total, estado, creado_en, actualizado_en";

const ORDER_ROW_SELECT: &str = "SELECT o.id, o.usuario_id, o.sucursal_id, o.numero_pedido, \
         o.metodo_entrega, o.notas, o.datos_personalizados, o.subtotal, o.descuentos, o.total, \
         o.estado, o.creado_en, o.actualizado_en, \
         (SELECT json_build_object('id', u.id, 'nombre', u.nombre, 'apellidos', u.apellidos, \
                 'email', u.email) \
            FROM usuarios u WHERE u.id = o.usuario_id) AS usuarios, \
         (SELECT json_build_object('id', s.id, 'nombre', s.nombre, 'direccion', s.direccion) \
            FROM sucursales s WHERE s.id = o.sucursal_id) AS sucursales \
     FROM pedidos o";

const ITEMS_FOR_ORDERS: &str = "SELECT i.id, i.pedido_id, i.producto_id, i.receta_id, i.nombre_item, \
         i.cantidad, i.precio_unitario, i.personalizaciones, \
         (SELECT json_build_object('id', p.id, 'nombre', p.nombre, 'precio', p.precio) \
            FROM productos p WHERE p.id = i.producto_id) AS productos, \
         (SELECT json_build_object('id', r.id, 'nombre', r.nombre) \
            FROM recetas_comunidad r WHERE r.id = i.receta_id) AS recetas_comunidad \
     FROM items_pedido i \
     WHERE i.pedido_id = ANY($1) \
     ORDER BY i.id ASC";

const PAYMENT_COLUMNS: &str = "id, pedido_id, pagado_por_usuario_id, metodo, monto, cambio, \
     referencia_transaccion, creado_en";

/// Append `AND ...` clauses for every filter that is set.
///
/// The builder must already contain a `WHERE` clause.
fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    if let Some(user) = filter.usuario_id {
        query.push(" AND o.usuario_id = ").push_bind(user);
    }
    if let Some(branch) = filter.sucursal_id {
        query.push(" AND o.sucursal_id = ").push_bind(branch);
    }
    if let Some(status) = filter.estado {
        query.push(" AND o.estado = ").push_bind(status);
    }
    if let Some(from) = filter.desde {
        query.push(" AND o.creado_en >= ").push_bind(from);
    }
    if let Some(to) = filter.hasta {
        query.push(" AND o.creado_en <= ").push_bind(to);
    }
    if let Some(method) = &filter.metodo_pago {
        query
            .push(" AND EXISTS (SELECT 1 FROM pagos pg WHERE pg.pedido_id = o.id AND pg.metodo = ")
            .push_bind(method.clone())
            .push(")");
    }
}

/// Repository for order and sale reads.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of orders matching `filter`, newest first, plus the total
    /// number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &OrderFilter,
        page: PageParams,
    ) -> Result<(Vec<OrderDetail>, i64), RepositoryError> {
        let mut conn = self.pool.acquire().await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM pedidos o WHERE TRUE");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&mut *conn).await?;

        let mut query = QueryBuilder::new(ORDER_ROW_SELECT);
        query.push(" WHERE TRUE");
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY o.creado_en DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = query
            .build_query_as::<OrderRow>()
            .fetch_all(&mut *conn)
            .await?;

        let orders = attach_lines(&mut conn, rows).await?;
        Ok((orders, total))
    }

    /// Every order of a user, newest first, optionally narrowed to one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderDetail>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;

        let filter = OrderFilter {
            usuario_id: Some(user),
            estado: status,
            ..OrderFilter::default()
        };
        let mut query = QueryBuilder::new(ORDER_ROW_SELECT);
        query.push(" WHERE TRUE");
        push_filters(&mut query, &filter);
        query.push(" ORDER BY o.creado_en DESC");
        let rows = query
            .build_query_as::<OrderRow>()
            .fetch_all(&mut *conn)
            .await?;

        attach_lines(&mut conn, rows).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_detail(&mut conn, id).await
    }

    /// Current status of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status(&self, id: OrderId) -> Result<Option<OrderStatus>, RepositoryError> {
        let status = sqlx::query_scalar::<_, OrderStatus>("SELECT estado FROM pedidos WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(status)
    }

    /// Move an order from `from` to `to`.
    ///
    /// Returns `None` when the order is missing or no longer in `from`, so a
    /// concurrent cancellation or sale is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE pedidos SET estado = $2, actualizado_en = NOW() \
             WHERE id = $1 AND estado = $3 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(to)
        .bind(from)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Cancel an order that is still cancellable, replacing its notes.
    ///
    /// Returns `None` when the order is missing or already delivered or
    /// cancelled, so a concurrent delivery cannot be overwritten.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn cancel(&self, id: OrderId, notes: &str) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE pedidos SET estado = 'cancelado', notas = $2, actualizado_en = NOW() \
             WHERE id = $1 AND estado NOT IN ('entregado', 'cancelado') \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(notes)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Totals and payments of every delivered order matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn sale_records(&self, filter: &OrderFilter) -> Result<Vec<SaleRecord>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;

        let mut query = QueryBuilder::new("SELECT o.id, o.total FROM pedidos o WHERE o.estado = ");
        query.push_bind(OrderStatus::Entregado);
        push_filters(&mut query, filter);
        let totals = query
            .build_query_as::<SaleTotalsRow>()
            .fetch_all(&mut *conn)
            .await?;

        let ids: Vec<OrderId> = totals.iter().map(|row| row.id).collect();
        let payments = if ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as::<_, SalePaymentRow>(
                "SELECT pedido_id, metodo, monto FROM pagos WHERE pedido_id = ANY($1) ORDER BY id",
            )
            .bind(&ids)
            .fetch_all(&mut *conn)
            .await?
        };

        let mut by_order: HashMap<OrderId, Vec<PaymentRecord>> = HashMap::new();
        for payment in payments {
            by_order
                .entry(payment.pedido_id)
                .or_default()
                .push(PaymentRecord {
                    metodo: payment.metodo,
                    monto: payment.monto,
                });
        }

        Ok(totals
            .into_iter()
            .map(|row| SaleRecord {
                total: row.total,
                payments: by_order.remove(&row.id).unwrap_or_default(),
            })
            .collect())
    }

    /// Product lines of every delivered order matching `filter`, priced at
    /// the product's current price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sold_lines(&self, filter: &OrderFilter) -> Result<Vec<SoldLine>, RepositoryError> {
        let mut query = QueryBuilder::new(
            "SELECT i.producto_id, p.nombre, p.precio, i.cantidad \
             FROM items_pedido i \
             JOIN pedidos o ON o.id = i.pedido_id \
             JOIN productos p ON p.id = i.producto_id \
             WHERE o.estado = ",
        );
        query.push_bind(OrderStatus::Entregado);
        push_filters(&mut query, filter);
        query.push(" ORDER BY o.creado_en ASC, i.id ASC");

        let rows = query
            .build_query_as::<SoldLineRow>()
            .fetch_all(self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| SoldLine {
                producto_id: row.producto_id,
                nombre: row.nombre,
                precio: row.precio,
                cantidad: row.cantidad,
            })
            .collect())
    }
}

/// Attach items and payments to a batch of order rows, keeping row order.
async fn attach_lines(
    conn: &mut PgConnection,
    rows: Vec<OrderRow>,
) -> Result<Vec<OrderDetail>, RepositoryError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<OrderId> = rows.iter().map(|row| row.order.id).collect();

    let items = sqlx::query_as::<_, OrderItemDetail>(ITEMS_FOR_ORDERS)
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;
    let payments = sqlx::query_as::<_, Payment>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM pagos WHERE pedido_id = ANY($1) ORDER BY id ASC"
    ))
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut items_by_order: HashMap<OrderId, Vec<OrderItemDetail>> = HashMap::new();
    for item in items {
        items_by_order.entry(item.item.pedido_id).or_default().push(item);
    }
    let mut payments_by_order: HashMap<OrderId, Vec<Payment>> = HashMap::new();
    for payment in payments {
        payments_by_order
            .entry(payment.pedido_id)
            .or_default()
            .push(payment);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let id = row.order.id;
            OrderDetail {
                order: row.order,
                items_pedido: items_by_order.remove(&id).unwrap_or_default(),
                pagos: payments_by_order.remove(&id).unwrap_or_default(),
                usuarios: row.usuarios,
                sucursales: row.sucursales,
            }
        })
        .collect())
}

/// Load one order with items, payments, customer, and branch.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn load_detail(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<OrderDetail>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_ROW_SELECT} WHERE o.id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    Ok(attach_lines(conn, vec![row]).await?.into_iter().next())
}

/// Name and current price of the given products, keyed by id.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn catalog_entries(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<HashMap<ProductId, ProductRef>, RepositoryError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let entries = sqlx::query_as::<_, ProductRef>(
        "SELECT id, nombre, precio FROM productos WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(conn)
    .await?;
    Ok(entries.into_iter().map(|entry| (entry.id, entry)).collect())
}

/// Insert an order header.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the user or branch does not exist
/// or the order number is taken.
pub async fn insert_order(conn: &mut PgConnection, new: &NewOrder) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO pedidos (usuario_id, sucursal_id, numero_pedido, metodo_entrega, notas, \
             datos_personalizados, subtotal, descuentos, total, estado) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(new.usuario_id)
    .bind(new.sucursal_id)
    .bind(&new.numero_pedido)
    .bind(&new.metodo_entrega)
    .bind(new.notas.as_deref())
    .bind(new.datos_personalizados.as_ref())
    .bind(new.subtotal)
    .bind(new.descuentos)
    .bind(new.total)
    .bind(new.estado)
    .fetch_one(conn)
    .await
    .map_err(|e| RepositoryError::from_write(e, "order"))
}

/// Insert the line items of an order in one statement.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if a product or recipe does not exist.
pub async fn insert_items(
    conn: &mut PgConnection,
    order: OrderId,
    items: &[NewOrderItem],
) -> Result<(), RepositoryError> {
    if items.is_empty() {
        return Ok(());
    }
    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO items_pedido (pedido_id, producto_id, receta_id, nombre_item, cantidad, \
             precio_unitario, personalizaciones) ",
    );
    query.push_values(items, |mut row, item| {
        row.push_bind(order)
            .push_bind(item.producto_id)
            .push_bind(item.receta_id)
            .push_bind(item.nombre_item.clone())
            .push_bind(item.cantidad)
            .push_bind(item.precio_unitario)
            .push_bind(item.personalizaciones.clone());
    });
    query
        .build()
        .execute(conn)
        .await
        .map_err(|e| RepositoryError::from_write(e, "order item"))?;
    Ok(())
}

/// Insert payments for an order.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if a paying user does not exist.
pub async fn insert_payments(
    conn: &mut PgConnection,
    order: OrderId,
    payments: &[NewPayment],
) -> Result<Vec<Payment>, RepositoryError> {
    if payments.is_empty() {
        return Ok(Vec::new());
    }
    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO pagos (pedido_id, pagado_por_usuario_id, metodo, monto, cambio, \
             referencia_transaccion) ",
    );
    query.push_values(payments, |mut row, payment| {
        row.push_bind(order)
            .push_bind(payment.pagado_por_usuario_id)
            .push_bind(payment.metodo.clone())
            .push_bind(payment.monto)
            .push_bind(payment.cambio)
            .push_bind(payment.referencia_transaccion.clone());
    });
    query.push(format!(" RETURNING {PAYMENT_COLUMNS}"));
    query
        .build_query_as::<Payment>()
        .fetch_all(conn)
        .await
        .map_err(|e| RepositoryError::from_write(e, "payment"))
}

/// Close an existing order as a sale.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn mark_delivered(
    conn: &mut PgConnection,
    id: OrderId,
    discounts: Decimal,
    total: Decimal,
) -> Result<Option<Order>, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE pedidos SET estado = 'entregado', descuentos = $2, total = $3, \
             actualizado_en = NOW() \
         WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(discounts)
    .bind(total)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
