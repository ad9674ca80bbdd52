//! Ingredient route handlers.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use dengo_core::{CategoryId, IngredientId, ProductId};

use crate::db::IngredientRepository;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::models::catalog::{Ingredient, IngredientFields, NewIngredient};
use crate::response::Envelope;
use crate::state::AppState;

const NOT_FOUND: &str = "Ingrediente no encontrado";

/// `GET /ingredientes`
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Envelope<Vec<Ingredient>>> {
    let ingredients = IngredientRepository::new(state.pool()).list().await?;
    Ok(Envelope::data(ingredients))
}

/// `GET /ingredientes/activos`
#[instrument(skip(state))]
pub async fn active(State(state): State<AppState>) -> Result<Envelope<Vec<Ingredient>>> {
    let ingredients = IngredientRepository::new(state.pool()).list_active().await?;
    Ok(Envelope::data(ingredients))
}

/// `GET /ingredientes/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<IngredientId>,
) -> Result<Envelope<Ingredient>> {
    let ingredient = IngredientRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::data(ingredient))
}

/// `GET /ingredientes/categoria/{id}`
#[instrument(skip(state))]
pub async fn by_category(
    State(state): State<AppState>,
    Path(category): Path<CategoryId>,
) -> Result<Envelope<Vec<Ingredient>>> {
    let ingredients = IngredientRepository::new(state.pool())
        .list_by_category(category)
        .await?;
    Ok(Envelope::list(ingredients))
}

/// `GET /ingredientes/producto/{id}`
#[instrument(skip(state))]
pub async fn by_product(
    State(state): State<AppState>,
    Path(product): Path<ProductId>,
) -> Result<Envelope<Vec<Ingredient>>> {
    let ingredients = IngredientRepository::new(state.pool())
        .list_for_product(product)
        .await?;
    Ok(Envelope::list(ingredients))
}

#[derive(Debug, Deserialize)]
pub struct CreateIngredient {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub tipo: Option<String>,
    pub categoria_id: Option<CategoryId>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `POST /ingredientes`
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateIngredient>,
) -> Result<Envelope<Ingredient>> {
    let (Some(nombre), Some(descripcion), Some(tipo)) = (
        non_blank(body.nombre),
        non_blank(body.descripcion),
        non_blank(body.tipo),
    ) else {
        return Err(AppError::bad_request(
            "Los campos nombre, descripcion y tipo son obligatorios",
        ));
    };

    let ingredient = IngredientRepository::new(state.pool())
        .create(&NewIngredient {
            nombre,
            descripcion,
            tipo,
            categoria_id: body.categoria_id,
            activo: true,
        })
        .await?;
    Ok(Envelope::data(ingredient)
        .message("Ingrediente creado correctamente")
        .created())
}

/// `PUT /ingredientes/{id}`
///
/// An inactive ingredient cannot be re-enabled here; that goes through
/// `PATCH /ingredientes/{id}/habilitar`.
#[instrument(skip(state, fields))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<IngredientId>,
    Json(fields): Json<IngredientFields>,
) -> Result<Envelope<Ingredient>> {
    let repo = IngredientRepository::new(state.pool());
    let existing = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    if !existing.activo && fields.activo == Some(true) {
        return Err(AppError::bad_request(
            "No se puede volver a habilitar un ingrediente deshabilitado",
        ));
    }
    if fields.is_empty() {
        return Err(AppError::bad_request(
            "No se enviaron campos para actualizar",
        ));
    }

    let ingredient = repo
        .update(id, fields)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::data(ingredient).message("Ingrediente actualizado correctamente"))
}

/// `PATCH /ingredientes/{id}/habilitar`
#[instrument(skip(state))]
pub async fn enable(
    State(state): State<AppState>,
    Path(id): Path<IngredientId>,
) -> Result<Envelope<Ingredient>> {
    let repo = IngredientRepository::new(state.pool());
    let existing = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    if existing.activo {
        return Err(AppError::bad_request("El ingrediente ya está habilitado"));
    }

    let ingredient = repo
        .set_active(id, true)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::data(ingredient).message("Ingrediente habilitado correctamente"))
}

/// `DELETE /ingredientes/{id}`
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<IngredientId>,
) -> Result<Envelope<()>> {
    IngredientRepository::new(state.pool())
        .set_active(id, false)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::message_only(
        "Ingrediente eliminado (inactivado) correctamente",
    ))
}
