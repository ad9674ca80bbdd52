//! Promotion rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use dengo_core::{PromotionId, TierId, UserId};

use super::{TierRef, UserRef};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Promotion {
    pub id: PromotionId,
    pub titulo: String,
    pub descripcion: String,
    pub tipo_promocion: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub porcentaje_descuento: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub monto_descuento: Option<Decimal>,
    pub inicia_en: DateTime<Utc>,
    pub termina_en: DateTime<Utc>,
    pub nivel_objetivo_id: Option<TierId>,
    pub creada_por: UserId,
    pub activa: bool,
    pub creado_en: DateTime<Utc>,
}

/// A promotion with its creator (`usuariocr`) and target tier embedded.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PromotionListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub promotion: Promotion,
    pub usuariocr: Option<Json<UserRef>>,
    pub niveles_cuenta: Option<Json<TierRef>>,
}

/// Values for a new promotion, already validated.
#[derive(Debug, Clone)]
pub struct NewPromotion {
    pub titulo: String,
    pub descripcion: String,
    pub tipo_promocion: String,
    pub porcentaje_descuento: Option<Decimal>,
    pub monto_descuento: Option<Decimal>,
    pub inicia_en: DateTime<Utc>,
    pub termina_en: DateTime<Utc>,
    pub nivel_objetivo_id: Option<TierId>,
    pub creada_por: UserId,
}

/// Editable promotion fields. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromotionFields {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub tipo_promocion: Option<String>,
    pub porcentaje_descuento: Option<Decimal>,
    pub monto_descuento: Option<Decimal>,
    pub inicia_en: Option<DateTime<Utc>>,
    pub termina_en: Option<DateTime<Utc>>,
    pub nivel_objetivo_id: Option<TierId>,
    pub activa: Option<bool>,
}

impl PromotionFields {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.titulo.is_none()
            && self.descripcion.is_none()
            && self.tipo_promocion.is_none()
            && self.porcentaje_descuento.is_none()
            && self.monto_descuento.is_none()
            && self.inicia_en.is_none()
            && self.termina_en.is_none()
            && self.nivel_objetivo_id.is_none()
            && self.activa.is_none()
    }
}
