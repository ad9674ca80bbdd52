//! Points (puntos) route handlers.
//!
//! The register flow is what the mobile app calls after scanning a voucher
//! QR, so its body uses the app's camelCase keys.

use axum::extract::State;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use dengo_core::UserId;
use dengo_core::loyalty::PointsVoucher;

use crate::db::{RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::services::loyalty::apply_visit;
use crate::services::qr;
use crate::state::AppState;

const USER_NOT_FOUND: &str = "Usuario no encontrado";

#[derive(Debug, Deserialize)]
pub struct VoucherRequest {
    pub total: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherResponse {
    pub success: bool,
    pub message: &'static str,
    pub puntos: i32,
    pub qr_data: String,
    pub qr_image: String,
}

/// `POST /puntos`: issue a points voucher for a purchase total.
#[instrument(skip(body))]
pub async fn issue_voucher(Json(body): Json<VoucherRequest>) -> Result<Json<VoucherResponse>> {
    let Some(total) = body.total else {
        return Err(AppError::bad_request("Falta el total de la venta."));
    };

    let voucher = PointsVoucher::issue(total, Utc::now());
    let qr_data = serde_json::to_string(&voucher)
        .map_err(|e| AppError::Internal(format!("voucher serialization: {e}")))?;
    let qr_image =
        qr::data_url(&qr_data).map_err(|e| AppError::Internal(format!("QR rendering: {e}")))?;

    Ok(Json(VoucherResponse {
        success: true,
        message: "QR generado exitosamente",
        puntos: voucher.puntos,
        qr_data,
        qr_image,
    }))
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub success: bool,
    pub message: &'static str,
    pub puntos: i32,
    pub visitas: i32,
    pub nivel: String,
}

/// `GET /puntos/usuario/{usuario_id}`
#[instrument(skip(state))]
pub async fn balance(
    State(state): State<AppState>,
    Path(user): Path<UserId>,
) -> Result<Json<BalanceResponse>> {
    let balance = UserRepository::new(state.pool())
        .points_balance(user)
        .await?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

    Ok(Json(BalanceResponse {
        success: true,
        message: "Puntos obtenidos correctamente",
        puntos: balance.puntos,
        visitas: balance.visitas,
        nivel: balance
            .codigo_nivel
            .unwrap_or_else(|| "Desconocido".to_string()),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub id_usuario: Option<UserId>,
    pub puntos: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub nuevos_puntos: i32,
    pub nuevas_visitas: i32,
}

/// `POST /puntos/registrar`: credit a scanned voucher and count the visit.
#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    let (Some(user), Some(points)) = (body.id_usuario, body.puntos.filter(|p| *p > 0)) else {
        return Err(AppError::bad_request("Faltan datos (idUsuario o puntos)"));
    };

    let tiers = state.tiers().thresholds(state.pool()).await?;
    let mut tx = state.pool().begin().await.map_err(RepositoryError::from)?;
    let loyalty = apply_visit(&mut tx, user, points, &tiers)
        .await?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;
    tx.commit().await.map_err(RepositoryError::from)?;

    info!(%user, points, visitas = loyalty.visitas, "Voucher points registered");

    Ok(Json(RegisterResponse {
        success: true,
        message: "Puntos registrados correctamente",
        nuevos_puntos: loyalty.puntos,
        nuevas_visitas: loyalty.visitas,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_voucher() {
        let body = VoucherRequest {
            total: Some(Decimal::new(12550, 2)),
        };
        let Json(response) = issue_voucher(Json(body)).await.unwrap();
        assert_eq!(response.puntos, 12);
        assert!(response.qr_image.starts_with("data:image/svg+xml;base64,"));

        let voucher: PointsVoucher = serde_json::from_str(&response.qr_data).unwrap();
        assert_eq!(voucher.puntos, 12);
    }

    #[tokio::test]
    async fn test_issue_voucher_requires_total() {
        let result = issue_voucher(Json(VoucherRequest { total: None })).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_register_wire_names() {
        let request: RegisterRequest =
            serde_json::from_str(r#"{"idUsuario": "6f1c2a34-0b4e-4d8e-9a57-2b1f0e6c9d10", "puntos": 12}"#)
                .unwrap();
        assert!(request.id_usuario.is_some());
        assert_eq!(request.puntos, Some(12));

        let body = serde_json::to_value(RegisterResponse {
            success: true,
            message: "Puntos registrados correctamente",
            nuevos_puntos: 40,
            nuevas_visitas: 5,
        })
        .unwrap();
        assert_eq!(body["nuevosPuntos"], 40);
        assert_eq!(body["nuevasVisitas"], 5);
    }
}
