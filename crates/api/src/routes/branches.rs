//! Branch (sucursal) route handlers.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use dengo_core::BranchId;

use crate::db::BranchRepository;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::models::branch::{Branch, BranchFields};
use crate::response::Envelope;
use crate::state::AppState;

const NOT_FOUND: &str = "Sucursal no encontrada";

/// `GET /sucursales`
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Envelope<Vec<Branch>>> {
    let branches = BranchRepository::new(state.pool()).list().await?;
    Ok(Envelope::data(branches))
}

/// `GET /sucursales/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<BranchId>,
) -> Result<Envelope<Branch>> {
    let branch = BranchRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::data(branch))
}

/// `POST /sucursales`
#[instrument(skip(state, fields))]
pub async fn create(
    State(state): State<AppState>,
    Json(fields): Json<BranchFields>,
) -> Result<Envelope<Branch>> {
    let Some(nombre) = fields.nombre.as_deref().filter(|n| !n.trim().is_empty()) else {
        return Err(AppError::bad_request(
            "El nombre de la sucursal es requerido",
        ));
    };

    let branch = BranchRepository::new(state.pool())
        .create(nombre, &fields)
        .await?;
    tracing::info!(branch_id = %branch.id, "Branch created");

    Ok(Envelope::data(branch)
        .message("Sucursal creada exitosamente")
        .created())
}

/// `PUT /sucursales/{id}`
#[instrument(skip(state, fields))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<BranchId>,
    Json(fields): Json<BranchFields>,
) -> Result<Envelope<Branch>> {
    if fields.is_empty() {
        return Err(AppError::bad_request(
            "No se enviaron campos para actualizar",
        ));
    }

    let branch = BranchRepository::new(state.pool())
        .update(id, fields)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::data(branch).message("Sucursal actualizada exitosamente"))
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
    pub activa: Option<bool>,
}

/// `PATCH /sucursales/activa/{id}`
#[instrument(skip(state))]
pub async fn set_active(
    State(state): State<AppState>,
    Path(id): Path<BranchId>,
    Json(body): Json<ActiveBody>,
) -> Result<Envelope<Branch>> {
    let Some(activa) = body.activa else {
        return Err(AppError::bad_request(
            "Se necesita un valor adecuado para la petición",
        ));
    };

    let branch = BranchRepository::new(state.pool())
        .set_active(id, activa)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    let message = if activa {
        "Sucursal activada correctamente"
    } else {
        "Sucursal desactivada correctamente"
    };
    Ok(Envelope::data(branch).message(message))
}
