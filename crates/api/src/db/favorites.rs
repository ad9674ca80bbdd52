//! Favorite repository.

use sqlx::PgPool;

use dengo_core::{FavoriteId, ProductId, RecipeId, UserId};

use super::RepositoryError;
use crate::models::catalog::{Favorite, FavoriteListing};

/// Repository for user favorites.
pub struct FavoriteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FavoriteRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Mark a product (optionally a community variant) as favorite.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user, product or recipe does
    /// not exist.
    pub async fn add(
        &self,
        user: UserId,
        product: ProductId,
        recipe: Option<RecipeId>,
    ) -> Result<Favorite, RepositoryError> {
        sqlx::query_as::<_, Favorite>(
            "INSERT INTO favoritos_usuario (usuario_id, producto_id, receta_id) \
             VALUES ($1, $2, $3) \
             RETURNING id, usuario_id, producto_id, receta_id, creado_en",
        )
        .bind(user)
        .bind(product)
        .bind(recipe)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "favorite"))
    }

    /// A user's favorites with product and recipe, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<FavoriteListing>, RepositoryError> {
        let favorites = sqlx::query_as::<_, FavoriteListing>(
            "SELECT f.id, f.usuario_id, f.producto_id, f.receta_id, f.creado_en, \
                 (SELECT json_build_object('id', p.id, 'nombre', p.nombre, 'precio', p.precio) \
                    FROM productos p WHERE p.id = f.producto_id) AS productos, \
                 (SELECT json_build_object('id', r.id, 'nombre', r.nombre) \
                    FROM recetas_comunidad r WHERE r.id = f.receta_id) AS recetas_comunidad \
             FROM favoritos_usuario f \
             WHERE f.usuario_id = $1 \
             ORDER BY f.creado_en DESC",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;
        Ok(favorites)
    }

    /// Remove a favorite.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no favorite has this id.
    pub async fn remove(&self, id: FavoriteId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM favoritos_usuario WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
