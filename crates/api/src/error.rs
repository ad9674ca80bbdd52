//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding. Every error reaches clients as
//! `{"success": false, "error": "..."}`. All route handlers return
//! `Result<T, AppError>`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use dengo_core::pricing::PricingError;
use dengo_core::promotion::PromotionError;

use crate::db::RepositoryError;
use crate::services::stripe::StripeError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Payment gateway call failed.
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] StripeError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with existing data.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A sale tried to redeem more points than the customer holds.
    #[error("Insufficient points: {available} available, {required} required")]
    InsufficientPoints { available: i32, required: i32 },

    /// A feature whose configuration is missing was requested.
    #[error("Not configured: {0}")]
    NotConfigured(&'static str),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a 400 with a client-facing message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Shorthand for a 404 with a client-facing message.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(RepositoryError::Database(_))
                | Self::Gateway(_)
                | Self::NotConfigured(_)
                | Self::Internal(_)
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::NotConfigured(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) | Self::InsufficientPoints { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// The response body. Internal details never leave the server.
    fn body(&self) -> Value {
        let message = match self {
            Self::Database(RepositoryError::NotFound) => "Recurso no encontrado".to_string(),
            Self::Database(RepositoryError::Conflict(_)) => {
                "El registro entra en conflicto con datos existentes".to_string()
            }
            Self::Database(_) | Self::Internal(_) => "Error interno del servidor".to_string(),
            Self::Gateway(_) => "Error al comunicarse con el proveedor de pagos".to_string(),
            Self::NotConfigured(feature) => format!("{feature} no está configurado"),
            Self::InsufficientPoints {
                available,
                required,
            } => {
                return json!({
                    "success": false,
                    "error": "El usuario no tiene suficientes puntos",
                    "puntos_disponibles": available,
                    "puntos_requeridos": required,
                });
            }
            Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg) => msg.clone(),
        };
        json!({ "success": false, "error": message })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), axum::Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Cuerpo JSON inválido: {}", rejection.body_text()))
    }
}

impl From<PromotionError> for AppError {
    fn from(err: PromotionError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(format!("Parámetros inválidos: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(format!("Ruta inválida: {}", rejection.body_text()))
    }
}

/// Map a repository `NotFound` to a 404 with a resource-specific message.
///
/// ```rust,ignore
/// repo.remove(id).await.map_err(not_found_as("Favorito no encontrado"))?;
/// ```
pub fn not_found_as(message: &'static str) -> impl FnOnce(RepositoryError) -> AppError {
    move |err| match err {
        RepositoryError::NotFound => AppError::NotFound(message.to_string()),
        other => AppError::Database(other),
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for a business step.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of steps
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb
            .data
            .insert((*key).to_string(), Value::String(value.clone()));
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Producto no encontrado".to_string());
        assert_eq!(err.to_string(), "Not found: Producto no encontrado");

        let err = AppError::BadRequest("Faltan datos".to_string());
        assert_eq!(err.to_string(), "Bad request: Faltan datos");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::not_found("x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::bad_request("x")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Conflict("x".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict("dup".into()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::NotConfigured("Stripe")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Internal("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_envelope_hides_internal_details() {
        let (status, body) = body_json(AppError::Internal("pool exhausted".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Error interno del servidor");
    }

    #[tokio::test]
    async fn test_insufficient_points_body() {
        let (status, body) = body_json(AppError::InsufficientPoints {
            available: 12,
            required: 50,
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "El usuario no tiene suficientes puntos");
        assert_eq!(body["puntos_disponibles"], 12);
        assert_eq!(body["puntos_requeridos"], 50);
    }

    #[tokio::test]
    async fn test_client_message_is_passed_through() {
        let (_, body) = body_json(AppError::bad_request("La sucursal es requerida")).await;
        assert_eq!(body, json!({"success": false, "error": "La sucursal es requerida"}));
    }
}
