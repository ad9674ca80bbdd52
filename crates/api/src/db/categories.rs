//! Category repository.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::catalog::Category;

/// Repository for product categories.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, nombre FROM categorias ORDER BY nombre ASC")
                .fetch_all(self.pool)
                .await?;
        Ok(categories)
    }
}
