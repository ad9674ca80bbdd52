//! Ingredient repository.

use sqlx::PgPool;

use dengo_core::{CategoryId, IngredientId, ProductId};

use super::{Assignments, RepositoryError};
use crate::models::catalog::{Ingredient, IngredientFields, NewIngredient};

const INGREDIENT_COLUMNS: &str = "id, nombre, descripcion, tipo, categoria_id, activo, creado_en";

/// Repository for ingredient database operations.
pub struct IngredientRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> IngredientRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All ingredients, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Ingredient>, RepositoryError> {
        let ingredients = sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredientes ORDER BY creado_en DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(ingredients)
    }

    /// Enabled ingredients, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Ingredient>, RepositoryError> {
        let ingredients = sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredientes WHERE activo ORDER BY nombre ASC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(ingredients)
    }

    /// Enabled ingredients of a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<Ingredient>, RepositoryError> {
        let ingredients = sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredientes \
             WHERE categoria_id = $1 AND activo ORDER BY nombre ASC"
        ))
        .bind(category)
        .fetch_all(self.pool)
        .await?;
        Ok(ingredients)
    }

    /// Enabled ingredients linked to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product: ProductId,
    ) -> Result<Vec<Ingredient>, RepositoryError> {
        let ingredients = sqlx::query_as::<_, Ingredient>(
            "SELECT i.id, i.nombre, i.descripcion, i.tipo, i.categoria_id, i.activo, i.creado_en \
             FROM ingredientes i \
             JOIN producto_ingredientes pi ON pi.ingrediente_id = i.id \
             WHERE pi.producto_id = $1 AND i.activo \
             ORDER BY i.nombre ASC",
        )
        .bind(product)
        .fetch_all(self.pool)
        .await?;
        Ok(ingredients)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: IngredientId) -> Result<Option<Ingredient>, RepositoryError> {
        let ingredient = sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredientes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(ingredient)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the category does not exist.
    pub async fn create(&self, new: &NewIngredient) -> Result<Ingredient, RepositoryError> {
        sqlx::query_as::<_, Ingredient>(&format!(
            "INSERT INTO ingredientes (nombre, descripcion, tipo, categoria_id, activo) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {INGREDIENT_COLUMNS}"
        ))
        .bind(&new.nombre)
        .bind(&new.descripcion)
        .bind(&new.tipo)
        .bind(new.categoria_id)
        .bind(new.activo)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "ingredient"))
    }

    /// Apply a partial update. Returns the current row when nothing is set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        id: IngredientId,
        fields: IngredientFields,
    ) -> Result<Option<Ingredient>, RepositoryError> {
        let mut update = Assignments::new("ingredientes");
        update
            .set("nombre", fields.nombre)
            .set("descripcion", fields.descripcion)
            .set("tipo", fields.tipo)
            .set("categoria_id", fields.categoria_id)
            .set("activo", fields.activo);
        if update.is_empty() {
            return self.get(id).await;
        }

        let mut query = update.where_id(id);
        query.push(format!(" RETURNING {INGREDIENT_COLUMNS}"));
        query
            .build_query_as::<Ingredient>()
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "ingredient"))
    }

    /// Set the `activo` flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_active(
        &self,
        id: IngredientId,
        active: bool,
    ) -> Result<Option<Ingredient>, RepositoryError> {
        let ingredient = sqlx::query_as::<_, Ingredient>(&format!(
            "UPDATE ingredientes SET activo = $2 WHERE id = $1 RETURNING {INGREDIENT_COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(self.pool)
        .await?;
        Ok(ingredient)
    }
}
