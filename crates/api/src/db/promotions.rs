//! Promotion repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use dengo_core::{PromotionId, TierId};

use super::{Assignments, RepositoryError};
use crate::models::promotion::{NewPromotion, Promotion, PromotionFields, PromotionListing};

const PROMOTION_COLUMNS: &str = "id, titulo, descripcion, tipo_promocion, porcentaje_descuento, \
     monto_descuento, inicia_en, termina_en, nivel_objetivo_id, creada_por, activa, creado_en";

const LISTING_SELECT: &str = "SELECT pr.id, pr.titulo, pr.descripcion, pr.tipo_promocion, \
         pr.porcentaje_descuento, pr.monto_descuento, pr.inicia_en, pr.termina_en, \
         pr.nivel_objetivo_id, pr.creada_por, pr.activa, pr.creado_en, \
         (SELECT json_build_object('id', u.id, 'nombre', u.nombre, 'apellidos', u.apellidos, \
                 'email', u.email) \
            FROM usuarios u WHERE u.id = pr.creada_por) AS usuariocr, \
         (SELECT json_build_object('id', n.id, 'codigo_nivel', n.codigo_nivel, \
                 'descripcion', n.descripcion, 'visitas_minimas', n.visitas_minimas) \
            FROM niveles_cuenta n WHERE n.id = pr.nivel_objetivo_id) AS niveles_cuenta \
     FROM promociones pr";

/// Repository for promotion database operations.
pub struct PromotionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PromotionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn listing(
        &self,
        condition: &str,
    ) -> Result<Vec<PromotionListing>, RepositoryError> {
        let promotions = sqlx::query_as::<_, PromotionListing>(&format!(
            "{LISTING_SELECT} {condition} ORDER BY pr.creado_en DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(promotions)
    }

    /// Every promotion, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<PromotionListing>, RepositoryError> {
        self.listing("").await
    }

    /// Enabled promotions, regardless of their window.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<PromotionListing>, RepositoryError> {
        self.listing("WHERE pr.activa").await
    }

    /// Enabled promotions whose window contains `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_current(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PromotionListing>, RepositoryError> {
        let promotions = sqlx::query_as::<_, PromotionListing>(&format!(
            "{LISTING_SELECT} WHERE pr.activa AND pr.inicia_en <= $1 AND pr.termina_en >= $1 \
             ORDER BY pr.creado_en DESC"
        ))
        .bind(now)
        .fetch_all(self.pool)
        .await?;
        Ok(promotions)
    }

    /// Enabled promotions of one type.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_type(&self, kind: &str) -> Result<Vec<PromotionListing>, RepositoryError> {
        let promotions = sqlx::query_as::<_, PromotionListing>(&format!(
            "{LISTING_SELECT} WHERE pr.tipo_promocion = $1 AND pr.activa \
             ORDER BY pr.creado_en DESC"
        ))
        .bind(kind)
        .fetch_all(self.pool)
        .await?;
        Ok(promotions)
    }

    /// Enabled promotions aimed at one tier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_tier(&self, tier: TierId) -> Result<Vec<PromotionListing>, RepositoryError> {
        let promotions = sqlx::query_as::<_, PromotionListing>(&format!(
            "{LISTING_SELECT} WHERE pr.nivel_objetivo_id = $1 AND pr.activa \
             ORDER BY pr.creado_en DESC"
        ))
        .bind(tier)
        .fetch_all(self.pool)
        .await?;
        Ok(promotions)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: PromotionId) -> Result<Option<PromotionListing>, RepositoryError> {
        let promotion =
            sqlx::query_as::<_, PromotionListing>(&format!("{LISTING_SELECT} WHERE pr.id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(promotion)
    }

    /// Raw row, used to check the current window and flag before updates.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_plain(&self, id: PromotionId) -> Result<Option<Promotion>, RepositoryError> {
        let promotion = sqlx::query_as::<_, Promotion>(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promociones WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(promotion)
    }

    /// Insert a promotion and return it with its relations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the creator or tier does not
    /// exist or a table constraint rejects the values.
    pub async fn create(&self, new: &NewPromotion) -> Result<PromotionListing, RepositoryError> {
        let id = sqlx::query_scalar::<_, PromotionId>(
            "INSERT INTO promociones (titulo, descripcion, tipo_promocion, porcentaje_descuento, \
                 monto_descuento, inicia_en, termina_en, nivel_objetivo_id, creada_por) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .bind(&new.titulo)
        .bind(&new.descripcion)
        .bind(&new.tipo_promocion)
        .bind(new.porcentaje_descuento)
        .bind(new.monto_descuento)
        .bind(new.inicia_en)
        .bind(new.termina_en)
        .bind(new.nivel_objetivo_id)
        .bind(new.creada_por)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "promotion"))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial update and return the row with its relations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a constraint rejects the values.
    pub async fn update(
        &self,
        id: PromotionId,
        fields: PromotionFields,
    ) -> Result<Option<PromotionListing>, RepositoryError> {
        let mut update = Assignments::new("promociones");
        update
            .set("titulo", fields.titulo)
            .set("descripcion", fields.descripcion)
            .set("tipo_promocion", fields.tipo_promocion)
            .set("porcentaje_descuento", fields.porcentaje_descuento)
            .set("monto_descuento", fields.monto_descuento)
            .set("inicia_en", fields.inicia_en)
            .set("termina_en", fields.termina_en)
            .set("nivel_objetivo_id", fields.nivel_objetivo_id)
            .set("activa", fields.activa);
        if update.is_empty() {
            return self.get(id).await;
        }

        let mut query = update.where_id(id);
        query.push(" RETURNING id");
        let updated = query
            .build_query_scalar::<PromotionId>()
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "promotion"))?;

        match updated {
            Some(id) => self.get(id).await,
            None => Ok(None),
        }
    }

    /// Set the `activa` flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_active(
        &self,
        id: PromotionId,
        active: bool,
    ) -> Result<Option<Promotion>, RepositoryError> {
        let promotion = sqlx::query_as::<_, Promotion>(&format!(
            "UPDATE promociones SET activa = $2 WHERE id = $1 RETURNING {PROMOTION_COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(self.pool)
        .await?;
        Ok(promotion)
    }
}
