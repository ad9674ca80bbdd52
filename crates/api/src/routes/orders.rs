//! Order (pedido) route handlers.
//!
//! Order endpoints answer with `{mensaje, pedido}` / `{pedidos, paginacion}`
//! bodies rather than the generic envelope; the mobile app reads those
//! keys directly.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use dengo_core::reporting::parse_date_bound;
use dengo_core::{BranchId, OrderId, OrderStatus, UserId};

use crate::db::{OrderRepository, PageParams, UserRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::models::order::{Order, OrderDetail, OrderFilter};
use crate::services::checkout::{self, OrderRequest};
use crate::services::expo::{PushMessage, is_expo_push_token};
use crate::state::AppState;

const NOT_FOUND: &str = "Pedido no encontrado";

/// `{mensaje, pedido}` response body.
#[derive(Debug, Serialize)]
pub struct OrderMessage<T> {
    pub mensaje: &'static str,
    pub pedido: T,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub pagina: u32,
    pub por_pagina: u32,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub pedidos: Vec<OrderDetail>,
    pub paginacion: Pagination,
}

#[derive(Debug, Serialize)]
pub struct UserOrders {
    pub pedidos: Vec<OrderDetail>,
}

/// Listing filters shared by orders and sales.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub usuario_id: Option<UserId>,
    pub sucursal_id: Option<BranchId>,
    pub estado: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
    pub metodo_pago: Option<String>,
    pub pagina: Option<u32>,
    pub por_pagina: Option<u32>,
}

impl ListQuery {
    pub(crate) const fn page(&self) -> PageParams {
        PageParams {
            pagina: self.pagina,
            por_pagina: self.por_pagina,
        }
    }

    /// Build the repository filter, rejecting unparseable values.
    pub(crate) fn filter(&self) -> Result<OrderFilter> {
        let estado = non_empty(self.estado.as_deref())
            .map(parse_status)
            .transpose()?;
        let desde = non_empty(self.fecha_inicio.as_deref())
            .map(parse_date)
            .transpose()?;
        let hasta = non_empty(self.fecha_fin.as_deref())
            .map(parse_date)
            .transpose()?;

        Ok(OrderFilter {
            usuario_id: self.usuario_id,
            sucursal_id: self.sucursal_id,
            estado,
            desde,
            hasta,
            metodo_pago: non_empty(self.metodo_pago.as_deref()).map(String::from),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_status(raw: &str) -> Result<OrderStatus> {
    raw.parse()
        .map_err(|_| AppError::bad_request("Estado no válido"))
}

fn parse_date(raw: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    parse_date_bound(raw).ok_or_else(|| AppError::bad_request(format!("Fecha no válida: {raw}")))
}

/// `POST /pedidos`
#[instrument(skip(state, request))]
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<OrderRequest>,
) -> Result<Response> {
    let pedido = checkout::create_order(state.pool(), request).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderMessage {
            mensaje: "Pedido creado exitosamente",
            pedido,
        }),
    )
        .into_response())
}

/// `GET /pedidos`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<OrderPage>> {
    let filter = query.filter()?;
    let page = query.page();
    let (pedidos, total) = OrderRepository::new(state.pool())
        .list(&filter, page)
        .await?;

    Ok(Json(OrderPage {
        pedidos,
        paginacion: Pagination {
            pagina: page.page(),
            por_pagina: page.per_page(),
            total,
        },
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub estado: Option<String>,
}

/// `GET /pedidos/usuario/{usuario_id}`
#[instrument(skip(state))]
pub async fn user_orders(
    State(state): State<AppState>,
    Path(user): Path<UserId>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<UserOrders>> {
    let status = non_empty(query.estado.as_deref())
        .map(parse_status)
        .transpose()?;
    let pedidos = OrderRepository::new(state.pool())
        .list_for_user(user, status)
        .await?;
    Ok(Json(UserOrders { pedidos }))
}

/// `GET /pedidos/{id}`: the bare order detail.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let order = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub estado: Option<String>,
}

/// `PUT /pedidos/{id}/estado`
///
/// Moves the order along its lifecycle and notifies the customer's device.
/// A failed notification is logged and never fails the request.
#[instrument(skip(state, body))]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusBody>,
) -> Result<Json<OrderMessage<Order>>> {
    let Some(raw) = non_empty(body.estado.as_deref()) else {
        return Err(AppError::bad_request("El estado es requerido"));
    };
    let next = parse_status(raw)?;

    let repo = OrderRepository::new(state.pool());
    let current = repo
        .status(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    check_transition(current, next)?;

    let Some(pedido) = repo.update_status(id, current, next).await? else {
        // Changed between the read and the write; judge against the new state.
        let latest = repo
            .status(id)
            .await?
            .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
        check_transition(latest, next)?;
        return Err(AppError::Conflict(
            "El pedido cambió mientras se actualizaba, intenta de nuevo".to_string(),
        ));
    };
    tracing::info!(order_id = %id, from = %current, to = %next, "Order status updated");

    if let Some(user) = pedido.usuario_id {
        notify_status(&state, user, id, next).await;
    }

    Ok(Json(OrderMessage {
        mensaje: "Estado del pedido actualizado exitosamente",
        pedido,
    }))
}

fn check_transition(current: OrderStatus, next: OrderStatus) -> Result<()> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::bad_request(format!(
            "No se puede cambiar un pedido de {current} a {next}"
        )))
    }
}

async fn notify_status(state: &AppState, user: UserId, order: OrderId, status: OrderStatus) {
    let token = match UserRepository::new(state.pool()).expo_token(user).await {
        Ok(Some(token)) if is_expo_push_token(&token) => token,
        Ok(_) => return,
        Err(e) => {
            warn!(error = %e, %user, "Could not load push token");
            return;
        }
    };

    let message = PushMessage::order_status(&token, order, status);
    if let Err(e) = state.expo().send(&message).await {
        warn!(error = %e, %user, order_id = %order, "Push notification failed; order was updated");
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelBody {
    pub razon: Option<String>,
}

/// `PUT /pedidos/{id}/cancelar`
#[instrument(skip(state, body))]
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(body): Json<CancelBody>,
) -> Result<Json<OrderMessage<Order>>> {
    let notes = non_empty(body.razon.as_deref())
        .map_or_else(|| "Pedido cancelado".to_string(), |r| format!("Cancelado: {r}"));

    let repo = OrderRepository::new(state.pool());
    let Some(pedido) = repo.cancel(id, &notes).await? else {
        // Distinguish a missing order from one that can no longer be cancelled
        return Err(match repo.status(id).await? {
            None => AppError::not_found(NOT_FOUND),
            Some(_) => AppError::bad_request("No se puede cancelar un pedido en este estado"),
        });
    };
    tracing::info!(order_id = %id, "Order cancelled");

    Ok(Json(OrderMessage {
        mensaje: "Pedido cancelado exitosamente",
        pedido,
    }))
}
