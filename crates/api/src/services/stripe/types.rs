//! Stripe API objects, reduced to the fields the API reads.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EphemeralKey {
    pub id: String,
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Error object returned with non-2xx responses.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// A webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// The `id` of the object the event is about.
    #[must_use]
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(serde_json::Value::as_str)
    }
}

/// Inputs for a new payment intent.
#[derive(Debug, Clone)]
pub struct PaymentIntentRequest<'a> {
    /// Amount in the currency's minor unit.
    pub amount: i64,
    pub currency: &'a str,
    pub customer: Option<&'a str>,
    /// Written to `metadata[usuario_id]`.
    pub usuario_id: &'a str,
}
