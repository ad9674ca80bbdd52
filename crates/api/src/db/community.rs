//! Community recipe repository.

use sqlx::PgPool;

use dengo_core::{RecipeId, RecipeStatus, UserId};

use super::RepositoryError;
use crate::models::community::{NewRecipe, Recipe, RecipeListing};

const RECIPE_COLUMNS: &str = "id, usuario_id, nombre, descripcion, imagen, estado, creado_en";

/// Repository for `recetas_comunidad`.
pub struct RecipeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RecipeRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Recipes in one moderation state with the author's name, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_status(
        &self,
        status: RecipeStatus,
    ) -> Result<Vec<RecipeListing>, RepositoryError> {
        let recipes = sqlx::query_as::<_, RecipeListing>(
            "SELECT r.id, r.usuario_id, r.nombre, r.descripcion, r.imagen, r.estado, r.creado_en, \
                 (SELECT json_build_object('nombre', u.nombre) \
                    FROM usuarios u WHERE u.id = r.usuario_id) AS usuarios \
             FROM recetas_comunidad r \
             WHERE r.estado = $1 \
             ORDER BY r.creado_en DESC",
        )
        .bind(status)
        .fetch_all(self.pool)
        .await?;
        Ok(recipes)
    }

    /// Every recipe a user submitted, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Recipe>, RepositoryError> {
        let recipes = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recetas_comunidad WHERE usuario_id = $1 \
             ORDER BY creado_en DESC"
        ))
        .bind(user)
        .fetch_all(self.pool)
        .await?;
        Ok(recipes)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the author does not exist.
    pub async fn create(&self, new: &NewRecipe) -> Result<Recipe, RepositoryError> {
        sqlx::query_as::<_, Recipe>(&format!(
            "INSERT INTO recetas_comunidad (usuario_id, nombre, descripcion, imagen, estado) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(new.usuario_id)
        .bind(&new.nombre)
        .bind(&new.descripcion)
        .bind(new.imagen.as_deref())
        .bind(new.estado)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "recipe"))
    }

    /// Move a recipe to another moderation state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_status(
        &self,
        id: RecipeId,
        status: RecipeStatus,
    ) -> Result<Option<Recipe>, RepositoryError> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "UPDATE recetas_comunidad SET estado = $2 WHERE id = $1 RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?;
        Ok(recipe)
    }

    /// Delete a recipe. Favorites pointing at it lose their recipe reference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no recipe has this id, and
    /// `RepositoryError::Conflict` if an order line still references it.
    pub async fn delete(&self, id: RecipeId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM recetas_comunidad WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "recipe"))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
