//! Promotion (promocion) route handlers.

use axum::extract::State;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use dengo_core::promotion::{validate_discount, validate_window};
use dengo_core::{PromotionId, TierId, UserId};

use crate::db::PromotionRepository;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::models::promotion::{NewPromotion, Promotion, PromotionFields, PromotionListing};
use crate::response::Envelope;
use crate::state::AppState;

const NOT_FOUND: &str = "Promoción no encontrada";

/// `GET /promociones`
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Envelope<Vec<PromotionListing>>> {
    let promotions = PromotionRepository::new(state.pool()).list().await?;
    Ok(Envelope::data(promotions))
}

/// `GET /promociones/activas`
#[instrument(skip(state))]
pub async fn active(State(state): State<AppState>) -> Result<Envelope<Vec<PromotionListing>>> {
    let promotions = PromotionRepository::new(state.pool()).list_active().await?;
    Ok(Envelope::data(promotions))
}

/// `GET /promociones/vigentes`: active and inside their window right now.
#[instrument(skip(state))]
pub async fn current(State(state): State<AppState>) -> Result<Envelope<Vec<PromotionListing>>> {
    let promotions = PromotionRepository::new(state.pool())
        .list_current(Utc::now())
        .await?;
    Ok(Envelope::list(promotions))
}

/// `GET /promociones/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<PromotionId>,
) -> Result<Envelope<PromotionListing>> {
    let promotion = PromotionRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::data(promotion))
}

/// `GET /promociones/tipo/{tipo}`
#[instrument(skip(state))]
pub async fn by_type(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Envelope<Vec<PromotionListing>>> {
    let promotions = PromotionRepository::new(state.pool())
        .list_by_type(&kind)
        .await?;
    Ok(Envelope::list(promotions))
}

/// `GET /promociones/nivel/{nivel_id}`
#[instrument(skip(state))]
pub async fn by_tier(
    State(state): State<AppState>,
    Path(tier): Path<TierId>,
) -> Result<Envelope<Vec<PromotionListing>>> {
    let promotions = PromotionRepository::new(state.pool())
        .list_by_tier(tier)
        .await?;
    Ok(Envelope::list(promotions))
}

#[derive(Debug, Deserialize)]
pub struct CreatePromotion {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub tipo_promocion: Option<String>,
    pub porcentaje_descuento: Option<Decimal>,
    pub monto_descuento: Option<Decimal>,
    pub inicia_en: Option<DateTime<Utc>>,
    pub termina_en: Option<DateTime<Utc>>,
    pub nivel_objetivo_id: Option<TierId>,
    pub creada_por: Option<UserId>,
}

impl CreatePromotion {
    fn validate(self) -> Result<NewPromotion> {
        let text = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let (
            Some(titulo),
            Some(descripcion),
            Some(tipo_promocion),
            Some(inicia_en),
            Some(termina_en),
            Some(creada_por),
        ) = (
            text(self.titulo),
            text(self.descripcion),
            text(self.tipo_promocion),
            self.inicia_en,
            self.termina_en,
            self.creada_por,
        ) else {
            return Err(AppError::bad_request(
                "Los campos titulo, descripcion, tipo_promocion, inicia_en, termina_en y creada_por son obligatorios",
            ));
        };

        validate_discount(self.porcentaje_descuento, self.monto_descuento)?;
        validate_window(inicia_en, termina_en)?;

        Ok(NewPromotion {
            titulo,
            descripcion,
            tipo_promocion,
            porcentaje_descuento: self.porcentaje_descuento,
            monto_descuento: self.monto_descuento,
            inicia_en,
            termina_en,
            nivel_objetivo_id: self.nivel_objetivo_id,
            creada_por,
        })
    }
}

/// `POST /promociones`
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreatePromotion>,
) -> Result<Envelope<PromotionListing>> {
    let new = body.validate()?;
    let promotion = PromotionRepository::new(state.pool()).create(&new).await?;
    tracing::info!(promotion_id = %promotion.promotion.id, "Promotion created");

    Ok(Envelope::data(promotion)
        .message("Promoción creada correctamente")
        .created())
}

/// Validate the parts of a partial update that can be checked on their own.
fn validate_fields(existing: &Promotion, fields: &PromotionFields) -> Result<()> {
    if !existing.activa && fields.activa == Some(true) {
        return Err(AppError::bad_request(
            "No se puede volver a habilitar una promoción deshabilitada",
        ));
    }
    if fields.is_empty() {
        return Err(AppError::bad_request(
            "No se enviaron campos para actualizar",
        ));
    }
    if let (Some(starts), Some(ends)) = (fields.inicia_en, fields.termina_en) {
        validate_window(starts, ends)?;
    }
    if fields.porcentaje_descuento.is_some() || fields.monto_descuento.is_some() {
        validate_discount(fields.porcentaje_descuento, fields.monto_descuento)?;
    }
    Ok(())
}

/// `PUT /promociones/{id}`
#[instrument(skip(state, fields))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<PromotionId>,
    Json(fields): Json<PromotionFields>,
) -> Result<Envelope<PromotionListing>> {
    let repo = PromotionRepository::new(state.pool());
    let existing = repo
        .get_plain(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    validate_fields(&existing, &fields)?;

    let promotion = repo
        .update(id, fields)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::data(promotion).message("Promoción actualizada correctamente"))
}

/// `PATCH /promociones/{id}/habilitar`
#[instrument(skip(state))]
pub async fn enable(
    State(state): State<AppState>,
    Path(id): Path<PromotionId>,
) -> Result<Envelope<Promotion>> {
    let repo = PromotionRepository::new(state.pool());
    let existing = repo
        .get_plain(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    if existing.activa {
        return Err(AppError::bad_request("La promoción ya está habilitada"));
    }

    let promotion = repo
        .set_active(id, true)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::data(promotion).message("Promoción habilitada correctamente"))
}

/// `DELETE /promociones/{id}`: soft delete.
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<PromotionId>,
) -> Result<Envelope<()>> {
    PromotionRepository::new(state.pool())
        .set_active(id, false)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::message_only(
        "Promoción eliminada (inactivada) correctamente",
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 0, 0, 0).unwrap()
    }

    fn request() -> CreatePromotion {
        CreatePromotion {
            titulo: Some("2x1 en frappés".to_string()),
            descripcion: Some("Todos los martes".to_string()),
            tipo_promocion: Some("descuento".to_string()),
            porcentaje_descuento: Some(Decimal::new(15, 0)),
            monto_descuento: None,
            inicia_en: Some(at(1)),
            termina_en: Some(at(30)),
            nivel_objetivo_id: None,
            creada_por: Some(UserId::new(uuid::Uuid::nil())),
        }
    }

    fn existing(activa: bool) -> Promotion {
        Promotion {
            id: PromotionId::new(1),
            titulo: "Promo".to_string(),
            descripcion: "Desc".to_string(),
            tipo_promocion: "descuento".to_string(),
            porcentaje_descuento: Some(Decimal::new(10, 0)),
            monto_descuento: None,
            inicia_en: at(1),
            termina_en: at(30),
            nivel_objetivo_id: None,
            creada_por: UserId::new(uuid::Uuid::nil()),
            activa,
            creado_en: at(1),
        }
    }

    #[test]
    fn test_create_validation() {
        assert!(request().validate().is_ok());

        let missing = CreatePromotion {
            creada_por: None,
            ..request()
        };
        assert!(matches!(missing.validate(), Err(AppError::BadRequest(_))));

        let no_discount = CreatePromotion {
            porcentaje_descuento: None,
            ..request()
        };
        let err = no_discount.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bad request: Debe especificar al menos porcentaje_descuento o monto_descuento"
        );

        let backwards = CreatePromotion {
            inicia_en: Some(at(30)),
            termina_en: Some(at(1)),
            ..request()
        };
        assert!(matches!(backwards.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_update_rules() {
        let reenable = PromotionFields {
            activa: Some(true),
            ..PromotionFields::default()
        };
        assert!(validate_fields(&existing(false), &reenable).is_err());
        assert!(validate_fields(&existing(true), &reenable).is_ok());

        assert!(validate_fields(&existing(true), &PromotionFields::default()).is_err());

        let bad_window = PromotionFields {
            inicia_en: Some(at(20)),
            termina_en: Some(at(10)),
            ..PromotionFields::default()
        };
        assert!(validate_fields(&existing(true), &bad_window).is_err());
    }
}
