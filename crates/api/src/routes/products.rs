//! Product and favorite route handlers.

use axum::extract::State;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use dengo_core::{CategoryId, FavoriteId, ProductId, RecipeId, UserId};

use crate::db::{FavoriteRepository, ProductRepository};
use crate::error::{AppError, Result, not_found_as};
use crate::extract::{Json, Path};
use crate::models::catalog::{
    Favorite, FavoriteListing, NewProduct, Product, ProductFields, ProductListing,
};
use crate::response::Envelope;
use crate::state::AppState;

const NOT_FOUND: &str = "Producto no encontrado";

/// `GET /productos`
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Envelope<Vec<ProductListing>>> {
    let products = ProductRepository::new(state.pool()).list_active().await?;
    Ok(Envelope::data(products))
}

/// `GET /productos/activos`: products that can be ordered right now.
#[instrument(skip(state))]
pub async fn available(State(state): State<AppState>) -> Result<Envelope<Vec<ProductListing>>> {
    let products = ProductRepository::new(state.pool())
        .list_available(Utc::now())
        .await?;
    Ok(Envelope::data(products))
}

/// `GET /productos/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Envelope<ProductListing>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::data(product))
}

/// `GET /productos/categoria/{categoria}`
#[instrument(skip(state))]
pub async fn by_category(
    State(state): State<AppState>,
    Path(category): Path<CategoryId>,
) -> Result<Envelope<Vec<ProductListing>>> {
    let products = ProductRepository::new(state.pool())
        .list_by_category(category)
        .await?;
    Ok(Envelope::data(products))
}

#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub precio: Option<Decimal>,
    pub url_imagen: Option<String>,
    pub categoria_id: Option<CategoryId>,
    pub creado_por: Option<UserId>,
}

/// `POST /productos`
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateProduct>,
) -> Result<Envelope<Product>> {
    let nombre = body.nombre.filter(|n| !n.trim().is_empty());
    let precio = body.precio.filter(|p| p.is_sign_positive() && !p.is_zero());
    let (Some(nombre), Some(precio)) = (nombre, precio) else {
        return Err(AppError::bad_request("Nombre y precio son requeridos"));
    };

    let product = ProductRepository::new(state.pool())
        .create(&NewProduct {
            nombre,
            descripcion: body.descripcion,
            precio,
            url_imagen: body.url_imagen,
            categoria_id: body.categoria_id,
            creado_por: body.creado_por,
        })
        .await?;
    tracing::info!(product_id = %product.id, "Product created");

    Ok(Envelope::data(product)
        .message("Producto creado exitosamente")
        .created())
}

/// `PUT /productos/{id}`
#[instrument(skip(state, fields))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(fields): Json<ProductFields>,
) -> Result<Envelope<Product>> {
    let product = ProductRepository::new(state.pool())
        .update(id, fields)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::data(product).message("Producto actualizado exitosamente"))
}

#[derive(Debug, Default, Deserialize)]
pub struct DisableBody {
    pub razon: Option<String>,
    pub hasta: Option<DateTime<Utc>>,
}

/// `PATCH /productos/deshabilitar/{id}`
#[instrument(skip(state, body))]
pub async fn disable(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(body): Json<DisableBody>,
) -> Result<Envelope<Product>> {
    let product = ProductRepository::new(state.pool())
        .disable(id, body.razon.as_deref(), body.hasta)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::data(product).message("Producto deshabilitado temporalmente"))
}

/// `PATCH /productos/habilitar/{id}`
#[instrument(skip(state))]
pub async fn enable(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Envelope<Product>> {
    let product = ProductRepository::new(state.pool())
        .enable(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::data(product).message("Producto habilitado exitosamente"))
}

/// `DELETE /productos/{id}`
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Envelope<()>> {
    ProductRepository::new(state.pool())
        .soft_delete(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::message_only("Producto eliminado exitosamente"))
}

// =============================================================================
// Favorites
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddFavorite {
    pub usuario_id: Option<UserId>,
    pub producto_id: Option<ProductId>,
    pub receta_id: Option<RecipeId>,
}

/// `POST /favoritos`
#[instrument(skip(state, body))]
pub async fn add_favorite(
    State(state): State<AppState>,
    Json(body): Json<AddFavorite>,
) -> Result<Envelope<Favorite>> {
    let (Some(user), Some(product)) = (body.usuario_id, body.producto_id) else {
        return Err(AppError::bad_request(
            "El usuario y el producto son requeridos",
        ));
    };

    let favorite = FavoriteRepository::new(state.pool())
        .add(user, product, body.receta_id)
        .await?;
    Ok(Envelope::data(favorite)
        .message("Favorito asignado correctamente")
        .created())
}

/// `GET /favoritos/usuario/{usuario_id}`
#[instrument(skip(state))]
pub async fn user_favorites(
    State(state): State<AppState>,
    Path(user): Path<UserId>,
) -> Result<Envelope<Vec<FavoriteListing>>> {
    let favorites = FavoriteRepository::new(state.pool())
        .list_for_user(user)
        .await?;
    Ok(Envelope::data(favorites))
}

#[derive(Debug, Deserialize)]
pub struct FavoriteIdBody {
    pub id: Option<FavoriteId>,
}

/// `POST /favoritos/eliminar`
#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    Json(body): Json<FavoriteIdBody>,
) -> Result<Envelope<()>> {
    let Some(id) = body.id else {
        return Err(AppError::bad_request("El id del favorito es requerido"));
    };

    FavoriteRepository::new(state.pool())
        .remove(id)
        .await
        .map_err(not_found_as("Favorito no encontrado"))?;
    Ok(Envelope::message_only("Favorito eliminado correctamente"))
}
