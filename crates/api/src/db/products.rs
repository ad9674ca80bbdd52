//! Product repository.
//!
//! Every query excludes soft-deleted rows (`eliminado = TRUE`).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use dengo_core::{CategoryId, ProductId};

use super::{Assignments, RepositoryError};
use crate::models::catalog::{NewProduct, Product, ProductFields, ProductListing};
use crate::models::embed;

const PRODUCT_COLUMNS: &str = "p.id, p.nombre, p.descripcion, p.precio, p.url_imagen, \
     p.categoria_id, p.creado_por, p.activo, p.eliminado, p.deshabilitado_hasta, \
     p.razon_deshabilitacion_temporal, p.creado_en, p.actualizado_en";

const RETURNING_PRODUCT: &str = " RETURNING id, nombre, descripcion, precio, url_imagen, \
     categoria_id, creado_por, activo, eliminado, deshabilitado_hasta, \
     razon_deshabilitacion_temporal, creado_en, actualizado_en";

fn listing_select() -> String {
    format!(
        "SELECT {PRODUCT_COLUMNS}, {}, {} FROM productos p",
        embed::PRODUCT_CATEGORY,
        embed::PRODUCT_CREATOR
    )
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<ProductListing>, RepositoryError> {
        let products = sqlx::query_as::<_, ProductListing>(&format!(
            "{} WHERE p.activo AND NOT p.eliminado ORDER BY p.creado_en DESC",
            listing_select()
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Active products that are not under a temporary suspension at `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_available(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProductListing>, RepositoryError> {
        let products = sqlx::query_as::<_, ProductListing>(&format!(
            "{} WHERE p.activo AND NOT p.eliminado \
               AND (p.deshabilitado_hasta IS NULL OR p.deshabilitado_hasta < $1) \
             ORDER BY p.creado_en DESC",
            listing_select()
        ))
        .bind(now)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Active products in a category, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<ProductListing>, RepositoryError> {
        let products = sqlx::query_as::<_, ProductListing>(&format!(
            "{} WHERE p.categoria_id = $1 AND p.activo AND NOT p.eliminado \
             ORDER BY p.nombre ASC",
            listing_select()
        ))
        .bind(category)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Get a product that has not been deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<ProductListing>, RepositoryError> {
        let product = sqlx::query_as::<_, ProductListing>(&format!(
            "{} WHERE p.id = $1 AND NOT p.eliminado",
            listing_select()
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the category or creator does not
    /// exist, `RepositoryError::Database` for other failures.
    pub async fn create(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO productos (nombre, descripcion, precio, url_imagen, categoria_id, creado_por) \
             VALUES ($1, $2, $3, $4, $5, $6){RETURNING_PRODUCT}"
        ))
        .bind(&new.nombre)
        .bind(new.descripcion.as_deref())
        .bind(new.precio)
        .bind(new.url_imagen.as_deref())
        .bind(new.categoria_id)
        .bind(new.creado_por)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product"))
    }

    /// Apply a partial update and bump `actualizado_en`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        id: ProductId,
        fields: ProductFields,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut update = Assignments::new("productos");
        update
            .touch("actualizado_en", "NOW()")
            .set("nombre", fields.nombre)
            .set("descripcion", fields.descripcion)
            .set("precio", fields.precio)
            .set("url_imagen", fields.url_imagen)
            .set("categoria_id", fields.categoria_id)
            .set("activo", fields.activo);

        let mut query = update.where_id(id);
        query.push(" AND NOT eliminado").push(RETURNING_PRODUCT);
        query
            .build_query_as::<Product>()
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "product"))
    }

    /// Suspend a product, optionally until a given time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn disable(
        &self,
        id: ProductId,
        reason: Option<&str>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE productos SET activo = FALSE, razon_deshabilitacion_temporal = $2, \
                 deshabilitado_hasta = $3, actualizado_en = NOW() \
             WHERE id = $1 AND NOT eliminado{RETURNING_PRODUCT}"
        ))
        .bind(id)
        .bind(reason)
        .bind(until)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Lift a suspension and clear its reason.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn enable(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE productos SET activo = TRUE, razon_deshabilitacion_temporal = NULL, \
                 deshabilitado_hasta = NULL, actualizado_en = NOW() \
             WHERE id = $1 AND NOT eliminado{RETURNING_PRODUCT}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Soft-delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn soft_delete(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE productos SET eliminado = TRUE, activo = FALSE, actualizado_en = NOW() \
             WHERE id = $1 AND NOT eliminado{RETURNING_PRODUCT}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }
}
