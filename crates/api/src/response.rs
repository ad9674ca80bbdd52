//! The `{success, message, data, total}` success envelope.

use std::borrow::Cow;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Success body shared by most resources.
///
/// `message` and `total` are omitted when unset.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<Cow<'static, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<usize>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T> Envelope<T> {
    /// `{success: true, data}`.
    pub const fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            total: None,
            status: StatusCode::OK,
        }
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub const fn total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    /// Respond with `201 Created`.
    #[must_use]
    pub const fn created(mut self) -> Self {
        self.status = StatusCode::CREATED;
        self
    }
}

impl<T: Serialize> Envelope<Vec<T>> {
    /// `{success: true, data, total}` for a list.
    pub fn list(items: Vec<T>) -> Self {
        let total = items.len();
        Self::data(items).total(total)
    }
}

impl Envelope<()> {
    /// `{success: true, message}` without a payload.
    pub fn message_only(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            total: None,
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.status, axum::Json(&self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_omits_unset_fields() {
        let body = serde_json::to_value(Envelope::data(vec![1, 2])).unwrap_or_default();
        assert_eq!(body, serde_json::json!({"success": true, "data": [1, 2]}));
    }

    #[test]
    fn test_envelope_list_counts_items() {
        let body = serde_json::to_value(Envelope::list(vec!["a", "b", "c"]).message("ok"))
            .unwrap_or_default();
        assert_eq!(body["total"], 3);
        assert_eq!(body["message"], "ok");
    }

    #[test]
    fn test_message_only_has_no_data() {
        let envelope = Envelope::message_only("Evento eliminado (inactivado) exitosamente");
        let body = serde_json::to_value(&envelope).unwrap_or_default();
        assert!(body.get("data").is_none());
        assert_eq!(envelope.into_response().status(), StatusCode::OK);
    }

    #[test]
    fn test_created_status() {
        let response = Envelope::data(1).created().into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
