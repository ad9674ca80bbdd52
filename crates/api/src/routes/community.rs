//! Community recipe (receta de comunidad) route handlers.
//!
//! Moderation actions take the recipe id in the body (`{id}`), which is how
//! the mobile app calls them.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use dengo_core::{RecipeId, RecipeStatus, UserId};

use crate::db::RecipeRepository;
use crate::error::{AppError, Result, not_found_as};
use crate::extract::{Json, Path};
use crate::models::community::{NewRecipe, Recipe, RecipeListing};
use crate::response::Envelope;
use crate::state::AppState;

const NOT_FOUND: &str = "Receta no encontrada";

/// `GET /comunidad/feed`: approved recipes.
#[instrument(skip(state))]
pub async fn feed(State(state): State<AppState>) -> Result<Envelope<Vec<RecipeListing>>> {
    let recipes = RecipeRepository::new(state.pool())
        .list_by_status(RecipeStatus::Aprobado)
        .await?;
    Ok(Envelope::data(recipes))
}

/// `GET /comunidad/pendientes`: the moderation queue.
#[instrument(skip(state))]
pub async fn pending(State(state): State<AppState>) -> Result<Envelope<Vec<RecipeListing>>> {
    let recipes = RecipeRepository::new(state.pool())
        .list_by_status(RecipeStatus::Pendiente)
        .await?;
    Ok(Envelope::data(recipes))
}

/// `GET /comunidad/usuario/{usuario_id}`
#[instrument(skip(state))]
pub async fn user_recipes(
    State(state): State<AppState>,
    Path(user): Path<UserId>,
) -> Result<Envelope<Vec<Recipe>>> {
    let recipes = RecipeRepository::new(state.pool())
        .list_for_user(user)
        .await?;
    Ok(Envelope::data(recipes))
}

#[derive(Debug, Deserialize)]
pub struct CreateRecipe {
    pub usuario_id: Option<UserId>,
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub imagen: Option<String>,
}

impl CreateRecipe {
    /// New recipes are published straight away.
    fn validate(self) -> Result<NewRecipe> {
        let text = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let (Some(usuario_id), Some(nombre), Some(descripcion)) =
            (self.usuario_id, text(self.nombre), text(self.descripcion))
        else {
            return Err(AppError::bad_request("Faltan datos"));
        };
        Ok(NewRecipe {
            usuario_id,
            nombre,
            descripcion,
            imagen: self.imagen,
            estado: RecipeStatus::Aprobado,
        })
    }
}

/// `POST /comunidad`
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateRecipe>,
) -> Result<Envelope<Recipe>> {
    let new = body.validate()?;
    let recipe = RecipeRepository::new(state.pool()).create(&new).await?;
    tracing::info!(recipe_id = %recipe.id, usuario_id = %recipe.usuario_id, "Recipe published");
    Ok(Envelope::data(recipe).created())
}

#[derive(Debug, Deserialize)]
pub struct RecipeIdBody {
    pub id: Option<RecipeId>,
}

impl RecipeIdBody {
    fn id(&self) -> Result<RecipeId> {
        self.id
            .ok_or_else(|| AppError::bad_request("El id de la receta es requerido"))
    }
}

/// `POST /comunidad/eliminar`
#[instrument(skip(state, body))]
pub async fn destroy(
    State(state): State<AppState>,
    Json(body): Json<RecipeIdBody>,
) -> Result<Envelope<()>> {
    let id = body.id()?;
    RecipeRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found_as(NOT_FOUND))?;
    Ok(Envelope::message_only("Eliminado correctamente"))
}

async fn moderate(state: &AppState, body: &RecipeIdBody, status: RecipeStatus) -> Result<Recipe> {
    let id = body.id()?;
    let recipe = RecipeRepository::new(state.pool())
        .set_status(id, status)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    tracing::info!(recipe_id = %id, estado = %status, "Recipe moderated");
    Ok(recipe)
}

/// `POST /comunidad/aprobar`
#[instrument(skip(state, body))]
pub async fn approve(
    State(state): State<AppState>,
    Json(body): Json<RecipeIdBody>,
) -> Result<Envelope<Recipe>> {
    let recipe = moderate(&state, &body, RecipeStatus::Aprobado).await?;
    Ok(Envelope::data(recipe))
}

/// `POST /comunidad/rechazar`
#[instrument(skip(state, body))]
pub async fn reject(
    State(state): State<AppState>,
    Json(body): Json<RecipeIdBody>,
) -> Result<Envelope<Recipe>> {
    let recipe = moderate(&state, &body, RecipeStatus::Rechazado).await?;
    Ok(Envelope::data(recipe))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_recipes_are_published() {
        let body: CreateRecipe = serde_json::from_str(
            r#"{"usuario_id": "6f1c2a34-0b4e-4d8e-9a57-2b1f0e6c9d10",
                "nombre": "Frappé de taro", "descripcion": "Con perlas extra"}"#,
        )
        .unwrap();
        let new = body.validate().unwrap();
        assert_eq!(new.estado, RecipeStatus::Aprobado);
        assert!(new.imagen.is_none());
    }

    #[test]
    fn test_missing_fields_rejected() {
        let body: CreateRecipe = serde_json::from_str(r#"{"nombre": "Sin autor"}"#).unwrap();
        let err = body.validate().unwrap_err();
        assert_eq!(err.to_string(), "Bad request: Faltan datos");
    }

    #[test]
    fn test_recipe_id_required() {
        let body = RecipeIdBody { id: None };
        assert!(matches!(body.id(), Err(AppError::BadRequest(_))));
        let body = RecipeIdBody {
            id: Some(RecipeId::new(9)),
        };
        assert_eq!(body.id().unwrap(), RecipeId::new(9));
    }
}
