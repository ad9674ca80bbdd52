//! Stripe REST API client.
//!
//! Stripe takes form-encoded requests and answers with JSON. Only the calls
//! the payment sheet flow needs are implemented.

use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use tracing::{debug, error, instrument};

use super::error::StripeError;
use super::types::{
    Customer, EphemeralKey, ErrorEnvelope, PaymentIntent, PaymentIntentRequest, WebhookEvent,
};
use crate::config::StripeConfig;

/// Stripe API base URL.
const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// API version the mobile SDK expects for ephemeral keys.
const EPHEMERAL_KEY_API_VERSION: &str = "2024-11-20.acacia";

/// Maximum age of a webhook signature, in seconds.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    /// HTTP client.
    client: Client,
    /// Secret API key.
    secret_key: SecretString,
    /// Webhook endpoint signing secret.
    webhook_secret: Option<SecretString>,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("secret_key", &"[REDACTED]")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a new Stripe client.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::new(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
        api_version: Option<&str>,
    ) -> Result<T, StripeError> {
        let mut request = self
            .client
            .post(format!("{STRIPE_API_BASE}/{path}"))
            .bearer_auth(self.secret_key.expose_secret())
            .form(form);
        if let Some(version) = api_version {
            request = request.header("Stripe-Version", version);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StripeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body).map_or(body, |envelope| {
                let kind = envelope.error.kind.unwrap_or_default();
                let message = envelope.error.message.unwrap_or_default();
                format!("{kind}: {message}")
            });
            error!(status = status.as_u16(), path, "Stripe API error");
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StripeError::Response(e.to_string()))
    }

    /// Create a customer tagged with the local user id.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Stripe rejects it.
    #[instrument(skip(self, email, name))]
    pub async fn create_customer(
        &self,
        email: &str,
        name: &str,
        usuario_id: &str,
    ) -> Result<Customer, StripeError> {
        let form = [
            ("email", email.to_string()),
            ("name", name.to_string()),
            ("metadata[usuario_id]", usuario_id.to_string()),
        ];
        let customer: Customer = self.post_form("customers", &form, None).await?;
        debug!(customer = %customer.id, "Stripe customer created");
        Ok(customer)
    }

    /// Create an ephemeral key so the mobile payment sheet can act for a
    /// customer.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Stripe rejects it.
    #[instrument(skip(self))]
    pub async fn create_ephemeral_key(&self, customer: &str) -> Result<EphemeralKey, StripeError> {
        let form = [("customer", customer.to_string())];
        self.post_form("ephemeral_keys", &form, Some(EPHEMERAL_KEY_API_VERSION))
            .await
    }

    /// Create a payment intent with automatic payment methods enabled.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Stripe rejects it.
    #[instrument(skip(self), fields(amount = request.amount, currency = %request.currency))]
    pub async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest<'_>,
    ) -> Result<PaymentIntent, StripeError> {
        let mut form = vec![
            ("amount", request.amount.to_string()),
            ("currency", request.currency.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[usuario_id]", request.usuario_id.to_string()),
        ];
        if let Some(customer) = request.customer {
            form.push(("customer", customer.to_string()));
        }

        let intent: PaymentIntent = self.post_form("payment_intents", &form, None).await?;
        debug!(payment_intent = %intent.id, "Payment intent created");
        Ok(intent)
    }

    /// Verify a webhook delivery and parse its event.
    ///
    /// This implements Stripe's signature scheme:
    /// <https://docs.stripe.com/webhooks#verify-manually>
    ///
    /// # Arguments
    ///
    /// * `payload` - The raw request body
    /// * `signature_header` - The `Stripe-Signature` header value
    ///
    /// # Errors
    ///
    /// Returns error if no webhook secret is configured, the signature does
    /// not verify, or the body is not an event.
    #[instrument(skip(self, payload, signature_header))]
    pub fn construct_event(
        &self,
        payload: &str,
        signature_header: &str,
    ) -> Result<WebhookEvent, StripeError> {
        let secret = self
            .webhook_secret
            .as_ref()
            .ok_or_else(|| StripeError::Config("STRIPE_WEBHOOK_SECRET is not set".to_string()))?;

        verify_signature(
            secret.expose_secret().as_bytes(),
            payload,
            signature_header,
            chrono::Utc::now().timestamp(),
        )?;

        let event: WebhookEvent = serde_json::from_str(payload)
            .map_err(|e| StripeError::InvalidPayload(e.to_string()))?;
        debug!(event = %event.id, kind = %event.kind, "Stripe webhook verified");
        Ok(event)
    }
}

/// Check a `t=<unix>,v1=<hex>[,v1=<hex>...]` header against the payload.
fn verify_signature(
    secret: &[u8],
    payload: &str,
    header: &str,
    now: i64,
) -> Result<(), StripeError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| StripeError::InvalidSignature("Missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(StripeError::InvalidSignature(
            "No v1 signature found".to_string(),
        ));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| StripeError::InvalidSignature("Invalid timestamp".to_string()))?;
    if now.abs_diff(ts) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(StripeError::InvalidSignature(
            "Timestamp outside the tolerance zone".to_string(),
        ));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .map_err(|e| StripeError::InvalidSignature(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    // Constant-time comparison
    if !signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate))
    {
        return Err(StripeError::InvalidSignature(
            "Signature mismatch".to_string(),
        ));
    }

    Ok(())
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"whsec_test_secret";
    const NOW: i64 = 1_735_689_600;

    fn sign(payload: &str, timestamp: i64) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET).unwrap();
        mac.update(format!("{timestamp}.{payload}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn client(webhook_secret: Option<&str>) -> StripeClient {
        StripeClient::new(&StripeConfig {
            secret_key: SecretString::from("sk_test_123".to_string()),
            webhook_secret: webhook_secret.map(|s| SecretString::from(s.to_string())),
        })
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_valid_signature() {
        let payload = r#"{"id":"evt_1"}"#;
        let header = format!("t={NOW},v1={}", sign(payload, NOW));
        assert!(verify_signature(SECRET, payload, &header, NOW + 10).is_ok());
    }

    #[test]
    fn test_any_v1_signature_may_match() {
        let payload = "{}";
        let header = format!("t={NOW},v1=deadbeef,v1={},v0=ignored", sign(payload, NOW));
        assert!(verify_signature(SECRET, payload, &header, NOW).is_ok());
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let header = format!("t={NOW},v1={}", sign(r#"{"amount":100}"#, NOW));
        let result = verify_signature(SECRET, r#"{"amount":1}"#, &header, NOW);
        assert!(matches!(result, Err(StripeError::InvalidSignature(_))));
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        let payload = "{}";
        let header = format!("t={NOW},v1={}", sign(payload, NOW));
        let result = verify_signature(SECRET, payload, &header, NOW + SIGNATURE_TOLERANCE_SECS + 1);
        assert!(matches!(result, Err(StripeError::InvalidSignature(_))));
    }

    #[test]
    fn test_malformed_headers_are_rejected() {
        let timestamp_only = format!("t={NOW}");
        let extreme_past = format!("t={},v1=aa", i64::MIN);
        let extreme_future = format!("t={},v1=aa", i64::MAX);
        let headers: [&str; 6] = [
            "",
            "v1=abc",
            "t=now,v1=abc",
            timestamp_only.as_str(),
            extreme_past.as_str(),
            extreme_future.as_str(),
        ];
        for header in headers {
            let result = verify_signature(SECRET, "{}", header, NOW);
            assert!(
                matches!(result, Err(StripeError::InvalidSignature(_))),
                "header {header:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_construct_event_requires_secret() {
        let result = client(None).construct_event("{}", "t=1,v1=abc");
        assert!(matches!(result, Err(StripeError::Config(_))));
    }

    #[test]
    fn test_construct_event_parses_verified_body() {
        let secret = std::str::from_utf8(SECRET).unwrap();
        let now = chrono::Utc::now().timestamp();
        let payload = r#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_1"}}}"#;
        let header = format!("t={now},v1={}", sign(payload, now));

        let event = client(Some(secret)).construct_event(payload, &header).unwrap();
        assert_eq!(event.kind, "payment_intent.succeeded");
        assert_eq!(event.object_id(), Some("pi_1"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", client(Some("whsec_abc")));
        assert!(!debug.contains("sk_test_123"));
        assert!(!debug.contains("whsec_abc"));
    }
}
