//! End-to-end flows against a migrated `PostgreSQL` database.
//!
//! These tests require:
//! - A running `PostgreSQL` database reachable through `DENGO_DATABASE_URL`
//!
//! Run with: cargo test -p dengo-integration-tests -- --ignored

use axum::http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use dengo_api::db::OrderRepository;
use dengo_core::{OrderId, OrderStatus};
use dengo_integration_tests::TestApp;

/// Create an open branch and return its id.
async fn create_branch(app: &TestApp) -> i64 {
    let resp = app
        .post(
            "/api/sucursales",
            &json!({ "nombre": format!("Sucursal {}", Uuid::new_v4()), "direccion": "Centro" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
    resp.body["data"]["id"].as_i64().unwrap()
}

/// Create a product priced at `precio` and return its id.
async fn create_product(app: &TestApp, precio: f64) -> i64 {
    let resp = app
        .post(
            "/api/productos",
            &json!({ "nombre": format!("Bebida {}", Uuid::new_v4()), "precio": precio }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
    resp.body["data"]["id"].as_i64().unwrap()
}

/// Sign up a customer and return their id.
async fn create_user(app: &TestApp) -> String {
    let resp = app
        .post(
            "/api/usuarios",
            &json!({
                "nombre": "Cliente",
                "email": format!("cliente-{}@example.mx", Uuid::new_v4()),
                "password": "secreto123"
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
    resp.body["data"]["id"].as_str().unwrap().to_string()
}

async fn place_order(app: &TestApp, branch: i64, product: i64, user: &str) -> Value {
    let resp = app
        .post(
            "/api/pedidos",
            &json!({
                "usuario_id": user,
                "sucursal_id": branch,
                "items": [{ "producto_id": product, "cantidad": 2 }]
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
    resp.body["pedido"].clone()
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (DENGO_DATABASE_URL)"]
async fn test_order_prices_items_from_catalog() {
    let app = TestApp::connect().await;
    let branch = create_branch(&app).await;
    let product = create_product(&app, 45.0).await;
    let user = create_user(&app).await;

    let order = place_order(&app, branch, product, &user).await;

    assert_eq!(order["estado"], "recibido");
    assert_eq!(order["total"], 90.0);
    assert!(order["numero_pedido"].as_str().unwrap().starts_with("PED-"));
    assert_eq!(order["items_pedido"].as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DENGO_DATABASE_URL)"]
async fn test_order_status_moves_forward_only() {
    let app = TestApp::connect().await;
    let branch = create_branch(&app).await;
    let product = create_product(&app, 30.0).await;
    let user = create_user(&app).await;
    let id = place_order(&app, branch, product, &user).await["id"]
        .as_i64()
        .unwrap();

    let resp = app
        .put(&format!("/api/pedidos/{id}/estado"), &json!({ "estado": "listo" }))
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    assert_eq!(resp.body["pedido"]["estado"], "listo");

    let resp = app
        .put(
            &format!("/api/pedidos/{id}/estado"),
            &json!({ "estado": "preparando" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.error(),
        "No se puede cambiar un pedido de listo a preparando"
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DENGO_DATABASE_URL)"]
async fn test_delivered_order_cannot_be_cancelled() {
    let app = TestApp::connect().await;
    let branch = create_branch(&app).await;
    let product = create_product(&app, 30.0).await;
    let user = create_user(&app).await;
    let id = place_order(&app, branch, product, &user).await["id"]
        .as_i64()
        .unwrap();

    let resp = app
        .put(
            &format!("/api/pedidos/{id}/estado"),
            &json!({ "estado": "entregado" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app
        .put(&format!("/api/pedidos/{id}/cancelar"), &json!({ "razon": "tarde" }))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error(), "No se puede cancelar un pedido en este estado");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DENGO_DATABASE_URL)"]
async fn test_cancel_records_reason() {
    let app = TestApp::connect().await;
    let branch = create_branch(&app).await;
    let product = create_product(&app, 30.0).await;
    let user = create_user(&app).await;
    let id = place_order(&app, branch, product, &user).await["id"]
        .as_i64()
        .unwrap();

    let resp = app
        .put(
            &format!("/api/pedidos/{id}/cancelar"),
            &json!({ "razon": "sin leche de avena" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    assert_eq!(resp.body["pedido"]["estado"], "cancelado");
    assert_eq!(resp.body["pedido"]["notas"], "Cancelado: sin leche de avena");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DENGO_DATABASE_URL)"]
async fn test_stale_status_update_does_not_revive_cancelled_order() {
    let app = TestApp::connect().await;
    let branch = create_branch(&app).await;
    let product = create_product(&app, 30.0).await;
    let user = create_user(&app).await;
    let id = place_order(&app, branch, product, &user).await["id"]
        .as_i64()
        .unwrap();

    let resp = app
        .put(&format!("/api/pedidos/{id}/estado"), &json!({ "estado": "listo" }))
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    let resp = app
        .put(&format!("/api/pedidos/{id}/cancelar"), &json!({ "razon": "cerrado" }))
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);

    // A writer that still believes the order is `listo`.
    let order = OrderId::new(i32::try_from(id).unwrap());
    let updated = OrderRepository::new(app.pool())
        .update_status(order, OrderStatus::Listo, OrderStatus::Entregado)
        .await
        .unwrap();
    assert!(updated.is_none());

    let resp = app.get(&format!("/api/pedidos/{id}")).await;
    assert_eq!(resp.body["estado"], "cancelado", "{}", resp.text);

    let resp = app
        .put(
            &format!("/api/pedidos/{id}/estado"),
            &json!({ "estado": "entregado" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.error(),
        "No se puede cambiar un pedido de cancelado a entregado"
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DENGO_DATABASE_URL)"]
async fn test_oversized_item_price_is_rejected() {
    let app = TestApp::connect().await;
    let branch = create_branch(&app).await;

    let resp = app
        .post(
            "/api/pedidos",
            &json!({
                "sucursal_id": branch,
                "items": [{
                    "nombre_item": "Latte",
                    "cantidad": 2,
                    "precio_unitario": "70000000000000000000000000000"
                }]
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{}", resp.text);
    assert_eq!(resp.error(), "El monto excede el máximo permitido");

    let resp = app
        .post(
            "/api/ventas/registrar-venta",
            &json!({
                "sucursal_id": branch,
                "items": [{ "nombre_item": "Latte", "cantidad": 1, "precio_unitario": 50 }],
                "descuento_aplicado": "79228162514264337593543950335"
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{}", resp.text);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DENGO_DATABASE_URL)"]
async fn test_missing_order_is_404() {
    let app = TestApp::connect().await;
    let resp = app.get("/api/pedidos/2147483000").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Catalog soft deletes
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (DENGO_DATABASE_URL)"]
async fn test_deleted_product_is_hidden_but_kept() {
    let app = TestApp::connect().await;
    let product = create_product(&app, 25.0).await;

    let resp = app.delete(&format!("/api/productos/{product}")).await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    assert_eq!(resp.body["message"], "Producto eliminado exitosamente");

    let resp = app.get("/api/productos").await;
    assert_eq!(resp.status, StatusCode::OK);
    let listed = resp.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["id"].as_i64() == Some(product));
    assert!(!listed);

    let resp = app.get(&format!("/api/productos/{product}")).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app
        .put(&format!("/api/productos/{product}"), &json!({ "precio": 30 }))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app.delete(&format!("/api/productos/{product}")).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let eliminado: bool = sqlx::query_scalar("SELECT eliminado FROM productos WHERE id = $1")
        .bind(i32::try_from(product).unwrap())
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert!(eliminado);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DENGO_DATABASE_URL)"]
async fn test_ingredient_reenable_rules() {
    let app = TestApp::connect().await;
    let resp = app
        .post(
            "/api/ingredientes",
            &json!({
                "nombre": format!("Tapioca {}", Uuid::new_v4()),
                "descripcion": "Perlas de tapioca",
                "tipo": "topping"
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
    let id = resp.body["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/ingredientes/{id}");

    let resp = app.patch(&format!("{uri}/habilitar"), &json!({})).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error(), "El ingrediente ya está habilitado");

    let resp = app.delete(&uri).await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);

    let resp = app.get(&uri).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["activo"], false);

    let resp = app.put(&uri, &json!({ "activo": true })).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.error(),
        "No se puede volver a habilitar un ingrediente deshabilitado"
    );

    let resp = app.patch(&format!("{uri}/habilitar"), &json!({})).await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    assert_eq!(resp.body["data"]["activo"], true);
}

// ============================================================================
// Sales and loyalty
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (DENGO_DATABASE_URL)"]
async fn test_sale_counts_visit_and_change() {
    let app = TestApp::connect().await;
    let branch = create_branch(&app).await;
    let product = create_product(&app, 40.0).await;
    let user = create_user(&app).await;

    let resp = app
        .post(
            "/api/ventas/registrar-venta",
            &json!({
                "sucursal_id": branch,
                "usuario_id": user,
                "items": [{ "producto_id": product, "cantidad": 2 }],
                "metodo_pago": "efectivo",
                "monto_pagado": 100
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
    let venta = &resp.body["venta"];
    assert_eq!(venta["estado"], "entregado");
    assert_eq!(venta["total"], 80.0);
    assert_eq!(venta["pagos"][0]["cambio"], 20.0);

    let resp = app.get(&format!("/api/puntos/usuario/{user}")).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["visitas"], 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DENGO_DATABASE_URL)"]
async fn test_sale_rejects_insufficient_points() {
    let app = TestApp::connect().await;
    let branch = create_branch(&app).await;
    let product = create_product(&app, 40.0).await;
    let user = create_user(&app).await;

    let resp = app
        .post(
            "/api/ventas/registrar-venta",
            &json!({
                "sucursal_id": branch,
                "usuario_id": user,
                "items": [{ "producto_id": product, "cantidad": 1 }],
                "puntos_usados": 50
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["puntos_disponibles"], 0);
    assert_eq!(resp.body["puntos_requeridos"], 50);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DENGO_DATABASE_URL)"]
async fn test_registering_voucher_points() {
    let app = TestApp::connect().await;
    let user = create_user(&app).await;

    let resp = app
        .post(
            "/api/puntos/registrar",
            &json!({ "idUsuario": user, "puntos": 15 }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    assert_eq!(resp.body["nuevosPuntos"], 15);
    assert_eq!(resp.body["nuevasVisitas"], 1);

    let resp = app
        .post(
            "/api/puntos/registrar",
            &json!({ "idUsuario": Uuid::new_v4(), "puntos": 15 }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (DENGO_DATABASE_URL)"]
async fn test_duplicate_email_is_conflict() {
    let app = TestApp::connect().await;
    let body = json!({
        "nombre": "Ana",
        "email": format!("ana-{}@example.mx", Uuid::new_v4()),
        "password": "secreto123"
    });

    let first = app.post("/api/usuarios", &body).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert!(first.body["data"].get("password_hash").is_none());

    let second = app.post("/api/usuarios", &body).await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.error(), "El email ya está registrado");
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (DENGO_DATABASE_URL)"]
async fn test_event_capacity_and_duplicates() {
    let app = TestApp::connect().await;
    let branch = create_branch(&app).await;
    let resp = app
        .post(
            "/api/eventos",
            &json!({ "titulo": "Noche de juegos", "sucursal_id": branch, "capacidad": 1 }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
    let event = resp.body["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/eventos/{event}/asistencia");

    let first = create_user(&app).await;
    let second = create_user(&app).await;

    let resp = app.post(&uri, &json!({ "usuario_id": first })).await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);

    let resp = app.post(&uri, &json!({ "usuario_id": first })).await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    let resp = app.post(&uri, &json!({ "usuario_id": second })).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error(), "El evento ya no tiene cupo");

    let resp = app.get(&uri).await;
    assert_eq!(resp.body["total"], 1);
}

// ============================================================================
// Promotions
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (DENGO_DATABASE_URL)"]
async fn test_disabled_promotion_cannot_be_reenabled_by_update() {
    let app = TestApp::connect().await;
    let creator = create_user(&app).await;
    let resp = app
        .post(
            "/api/promociones",
            &json!({
                "titulo": "Martes de taro",
                "descripcion": "20% en bebidas de taro",
                "tipo_promocion": "descuento",
                "porcentaje_descuento": 20,
                "inicia_en": "2026-01-01T00:00:00Z",
                "termina_en": "2026-12-31T23:59:59Z",
                "creada_por": creator
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
    let id = resp.body["data"]["id"].as_i64().unwrap();

    let resp = app.delete(&format!("/api/promociones/{id}")).await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app
        .put(&format!("/api/promociones/{id}"), &json!({ "activa": true }))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .patch(&format!("/api/promociones/{id}/habilitar"), &json!({}))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["activa"], true);
}
