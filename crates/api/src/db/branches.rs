//! Branch repository.

use sqlx::PgPool;

use dengo_core::BranchId;

use super::{Assignments, RepositoryError};
use crate::models::branch::{Branch, BranchFields};

const BRANCH_COLUMNS: &str =
    "id, nombre, direccion, latitud, longitud, telefono, horario_apertura, activa, creado_en";

/// Repository for branch database operations.
pub struct BranchRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BranchRepository<'a> {
    /// Create a new branch repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every branch, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Branch>, RepositoryError> {
        let branches = sqlx::query_as::<_, Branch>(&format!(
            "SELECT {BRANCH_COLUMNS} FROM sucursales ORDER BY creado_en ASC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(branches)
    }

    /// Get a branch by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BranchId) -> Result<Option<Branch>, RepositoryError> {
        let branch = sqlx::query_as::<_, Branch>(&format!(
            "SELECT {BRANCH_COLUMNS} FROM sucursales WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(branch)
    }

    /// Create a branch. It starts active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, nombre: &str, fields: &BranchFields) -> Result<Branch, RepositoryError> {
        let branch = sqlx::query_as::<_, Branch>(&format!(
            "INSERT INTO sucursales (nombre, direccion, latitud, longitud, telefono, horario_apertura) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {BRANCH_COLUMNS}"
        ))
        .bind(nombre)
        .bind(fields.direccion.as_deref())
        .bind(fields.latitud)
        .bind(fields.longitud)
        .bind(fields.telefono.as_deref())
        .bind(fields.horario_apertura.as_deref())
        .fetch_one(self.pool)
        .await?;
        Ok(branch)
    }

    /// Apply a partial update.
    ///
    /// Returns `Ok(None)` when the branch does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        id: BranchId,
        fields: BranchFields,
    ) -> Result<Option<Branch>, RepositoryError> {
        let mut update = Assignments::new("sucursales");
        update
            .set("nombre", fields.nombre)
            .set("direccion", fields.direccion)
            .set("latitud", fields.latitud)
            .set("longitud", fields.longitud)
            .set("telefono", fields.telefono)
            .set("horario_apertura", fields.horario_apertura);
        if update.is_empty() {
            return self.get(id).await;
        }

        let mut query = update.where_id(id);
        query.push(format!(" RETURNING {BRANCH_COLUMNS}"));
        let branch = query
            .build_query_as::<Branch>()
            .fetch_optional(self.pool)
            .await?;
        Ok(branch)
    }

    /// Activate or deactivate a branch.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_active(
        &self,
        id: BranchId,
        active: bool,
    ) -> Result<Option<Branch>, RepositoryError> {
        let branch = sqlx::query_as::<_, Branch>(&format!(
            "UPDATE sucursales SET activa = $2 WHERE id = $1 RETURNING {BRANCH_COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(self.pool)
        .await?;
        Ok(branch)
    }
}
