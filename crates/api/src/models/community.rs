//! Community recipes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use sqlx::types::Json;

use dengo_core::{RecipeId, RecipeStatus, UserId};

use super::UserNameRef;

/// A customer-submitted product variant.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Recipe {
    pub id: RecipeId,
    pub usuario_id: UserId,
    pub nombre: String,
    pub descripcion: String,
    pub imagen: Option<String>,
    pub estado: RecipeStatus,
    pub creado_en: DateTime<Utc>,
}

/// A recipe with its author's name embedded.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecipeListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub recipe: Recipe,
    pub usuarios: Option<Json<UserNameRef>>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub usuario_id: UserId,
    pub nombre: String,
    pub descripcion: String,
    pub imagen: Option<String>,
    pub estado: RecipeStatus,
}
