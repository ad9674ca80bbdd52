//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                   - Service banner
//! GET  /health                             - Liveness
//! GET  /health/ready                       - Database readiness
//!
//! # Everything below is nested under /api
//!
//! GET  /sucursales                         - Branches
//! GET  /sucursales/{id}
//! POST /sucursales
//! PUT  /sucursales/{id}
//! PATCH /sucursales/activa/{id}            - Open or close a branch
//!
//! GET  /productos                          - Catalog
//! GET  /productos/activos                  - Orderable right now
//! GET  /productos/categoria/{categoria}
//! GET  /productos/{id}
//! POST /productos
//! PUT  /productos/{id}
//! PATCH /productos/deshabilitar/{id}
//! PATCH /productos/habilitar/{id}
//! DELETE /productos/{id}
//!
//! POST /favoritos                          - Favorites
//! GET  /favoritos/usuario/{usuario_id}
//! POST /favoritos/eliminar
//!
//! GET  /ingredientes                       - Ingredients
//! GET  /ingredientes/activos
//! GET  /ingredientes/categoria/{id}
//! GET  /ingredientes/producto/{id}
//! GET  /ingredientes/{id}
//! POST /ingredientes
//! PUT  /ingredientes/{id}
//! PATCH /ingredientes/{id}/habilitar
//! DELETE /ingredientes/{id}
//!
//! GET  /categorias
//!
//! POST /pedidos                            - Orders
//! GET  /pedidos
//! GET  /pedidos/usuario/{usuario_id}
//! GET  /pedidos/{id}
//! PUT  /pedidos/{id}/estado
//! PUT  /pedidos/{id}/cancelar
//!
//! POST /ventas/registrar-venta             - Sales
//! GET  /ventas
//! GET  /ventas/resumen
//! GET  /ventas/mas-vendidas
//!
//! POST /puntos                             - Points voucher (QR)
//! GET  /puntos/usuario/{usuario_id}
//! POST /puntos/registrar                   - Rate limited
//!
//! GET  /promociones                        - Promotions
//! GET  /promociones/activas
//! GET  /promociones/vigentes
//! GET  /promociones/tipo/{tipo}
//! GET  /promociones/nivel/{nivel_id}
//! GET  /promociones/{id}
//! POST /promociones
//! PUT  /promociones/{id}
//! PATCH /promociones/{id}/habilitar
//! DELETE /promociones/{id}
//!
//! GET  /eventos                            - Events
//! GET  /eventos/sucursal/{sucursal_id}
//! GET  /eventos/{id}
//! POST /eventos
//! PUT  /eventos/{id}
//! DELETE /eventos/{id}
//! GET  /eventos/{id}/asistencia
//! POST /eventos/{id}/asistencia
//!
//! GET  /comunidad/feed                     - Community recipes
//! GET  /comunidad/pendientes
//! GET  /comunidad/usuario/{usuario_id}
//! POST /comunidad
//! POST /comunidad/eliminar
//! POST /comunidad/aprobar
//! POST /comunidad/rechazar
//!
//! GET  /usuarios                           - Users
//! GET  /usuarios/{id}
//! POST /usuarios                           - Rate limited
//! PUT  /usuarios/{id}
//! DELETE /usuarios/{id}
//! POST /expo/guardar-expo-token
//!
//! POST /stripe/create-payment-intent       - Payments
//! POST /stripe/webhook
//! ```

pub mod branches;
pub mod categories;
pub mod community;
pub mod events;
pub mod ingredients;
pub mod orders;
pub mod points;
pub mod products;
pub mod promotions;
pub mod sales;
pub mod stripe;
pub mod users;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{
    Router,
    routing::{get, patch, post, put},
};
use serde::Serialize;

use crate::extract::Json;
use crate::middleware::{points_rate_limiter, signup_rate_limiter};
use crate::state::AppState;

/// Create the branch routes router.
pub fn branch_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(branches::index).post(branches::create))
        .route("/{id}", get(branches::show).put(branches::update))
        .route("/activa/{id}", patch(branches::set_active))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/activos", get(products::available))
        .route("/categoria/{categoria}", get(products::by_category))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
        .route("/deshabilitar/{id}", patch(products::disable))
        .route("/habilitar/{id}", patch(products::enable))
}

/// Create the favorite routes router.
pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(products::add_favorite))
        .route("/usuario/{usuario_id}", get(products::user_favorites))
        .route("/eliminar", post(products::remove_favorite))
}

/// Create the ingredient routes router.
pub fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(ingredients::index).post(ingredients::create))
        .route("/activos", get(ingredients::active))
        .route("/categoria/{id}", get(ingredients::by_category))
        .route("/producto/{id}", get(ingredients::by_product))
        .route(
            "/{id}",
            get(ingredients::show)
                .put(ingredients::update)
                .delete(ingredients::destroy),
        )
        .route("/{id}/habilitar", patch(ingredients::enable))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/usuario/{usuario_id}", get(orders::user_orders))
        .route("/{id}", get(orders::show))
        .route("/{id}/estado", put(orders::update_status))
        .route("/{id}/cancelar", put(orders::cancel))
}

/// Create the sale routes router.
pub fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(sales::index))
        .route("/registrar-venta", post(sales::register))
        .route("/resumen", get(sales::summary))
        .route("/mas-vendidas", get(sales::best_selling))
}

/// Create the points routes router.
pub fn points_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(points::issue_voucher))
        .route("/usuario/{usuario_id}", get(points::balance))
        .route(
            "/registrar",
            post(points::register).layer(points_rate_limiter()),
        )
}

/// Create the promotion routes router.
pub fn promotion_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(promotions::index).post(promotions::create))
        .route("/activas", get(promotions::active))
        .route("/vigentes", get(promotions::current))
        .route("/tipo/{tipo}", get(promotions::by_type))
        .route("/nivel/{nivel_id}", get(promotions::by_tier))
        .route(
            "/{id}",
            get(promotions::show)
                .put(promotions::update)
                .delete(promotions::destroy),
        )
        .route("/{id}/habilitar", patch(promotions::enable))
}

/// Create the event routes router.
pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(events::index).post(events::create))
        .route("/sucursal/{sucursal_id}", get(events::by_branch))
        .route(
            "/{id}",
            get(events::show)
                .put(events::update)
                .delete(events::destroy),
        )
        .route(
            "/{id}/asistencia",
            get(events::attendees).post(events::register),
        )
}

/// Create the community routes router.
pub fn community_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(community::create))
        .route("/feed", get(community::feed))
        .route("/pendientes", get(community::pending))
        .route("/usuario/{usuario_id}", get(community::user_recipes))
        .route("/eliminar", post(community::destroy))
        .route("/aprobar", post(community::approve))
        .route("/rechazar", post(community::reject))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(users::create)
                .layer(signup_rate_limiter())
                .get(users::index),
        )
        .route(
            "/{id}",
            get(users::show).put(users::update).delete(users::destroy),
        )
}

/// Create the payment routes router.
pub fn stripe_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/create-payment-intent",
            post(stripe::create_payment_intent),
        )
        .route("/webhook", post(stripe::webhook))
}

/// Create every `/api` route.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/sucursales", branch_routes())
        .nest("/productos", product_routes())
        .nest("/favoritos", favorite_routes())
        .nest("/ingredientes", ingredient_routes())
        .route("/categorias", get(categories::index))
        .nest("/pedidos", order_routes())
        .nest("/ventas", sale_routes())
        .nest("/puntos", points_routes())
        .nest("/promociones", promotion_routes())
        .nest("/eventos", event_routes())
        .nest("/comunidad", community_routes())
        .nest("/usuarios", user_routes())
        .route("/expo/guardar-expo-token", post(users::save_expo_token))
        .nest("/stripe", stripe_routes())
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes())
}

#[derive(Debug, Serialize)]
pub struct Banner {
    pub message: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

/// Service banner.
async fn banner() -> Json<Banner> {
    Json(Banner {
        message: "API Dengo",
        version: "1.0.0",
        status: "online",
    })
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
