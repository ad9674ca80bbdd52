//! Loyalty tier repository.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::user::Tier;

/// Repository for `niveles_cuenta`.
pub struct TierRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TierRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All tiers, lowest threshold first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Tier>, RepositoryError> {
        let tiers = sqlx::query_as::<_, Tier>(
            "SELECT id, codigo_nivel, descripcion, visitas_minimas \
             FROM niveles_cuenta ORDER BY visitas_minimas ASC, id ASC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(tiers)
    }

    /// Insert or refresh a tier by code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert(
        &self,
        code: &str,
        description: &str,
        min_visits: i32,
    ) -> Result<Tier, RepositoryError> {
        let tier = sqlx::query_as::<_, Tier>(
            "INSERT INTO niveles_cuenta (codigo_nivel, descripcion, visitas_minimas) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (codigo_nivel) DO UPDATE \
               SET descripcion = EXCLUDED.descripcion, visitas_minimas = EXCLUDED.visitas_minimas \
             RETURNING id, codigo_nivel, descripcion, visitas_minimas",
        )
        .bind(code)
        .bind(description)
        .bind(min_visits)
        .fetch_one(self.pool)
        .await?;
        Ok(tier)
    }
}
