//! Stripe payment sheet and webhook handlers.

use axum::extract::State;
use axum::http::HeaderMap;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use dengo_core::UserId;

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::services::stripe::{PaymentIntentRequest, StripeClient, StripeError, WebhookEvent};
use crate::state::AppState;

const DEFAULT_CURRENCY: &str = "mxn";
const GUEST: &str = "guest";
const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[derive(Debug, Deserialize)]
pub struct PaymentIntentBody {
    /// Amount in minor units (centavos).
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub usuario_id: Option<UserId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSheet {
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
    pub customer: Option<String>,
    pub ephemeral_key: Option<String>,
}

/// Validate and round the requested amount to whole minor units.
fn minor_units(amount: Option<Decimal>) -> Result<i64> {
    amount
        .filter(|a| *a > Decimal::ZERO)
        .and_then(|a| a.round().to_i64())
        .filter(|a| *a > 0)
        .ok_or_else(|| AppError::bad_request("Monto inválido"))
}

/// Reuse the user's gateway customer or create one and remember it.
///
/// Returns `None` for unknown users, who pay as guests.
async fn customer_for(
    state: &AppState,
    stripe: &StripeClient,
    user: UserId,
) -> Result<Option<String>> {
    let repo = UserRepository::new(state.pool());
    let Some(profile) = repo.billing_profile(user).await? else {
        warn!(%user, "Payment intent for unknown user, continuing as guest");
        return Ok(None);
    };
    if let Some(existing) = profile.stripe_customer_id.clone() {
        return Ok(Some(existing));
    }

    let customer = stripe
        .create_customer(&profile.email, &profile.display_name(), &user.to_string())
        .await?;
    repo.set_stripe_customer(user, &customer.id).await?;
    info!(%user, customer = %customer.id, "Stripe customer linked");
    Ok(Some(customer.id))
}

/// `POST /stripe/create-payment-intent`
#[instrument(skip(state, body))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(body): Json<PaymentIntentBody>,
) -> Result<Json<PaymentSheet>> {
    let amount = minor_units(body.amount)?;
    let currency = body
        .currency
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map_or_else(|| DEFAULT_CURRENCY.to_string(), str::to_lowercase);
    let stripe = state.stripe()?;

    let customer = match body.usuario_id {
        Some(user) => customer_for(&state, stripe, user).await?,
        None => None,
    };
    let ephemeral_key = match customer.as_deref() {
        Some(customer) => Some(stripe.create_ephemeral_key(customer).await?.secret),
        None => None,
    };

    let usuario_id = body
        .usuario_id
        .map_or_else(|| GUEST.to_string(), |user| user.to_string());
    let intent = stripe
        .create_payment_intent(&PaymentIntentRequest {
            amount,
            currency: &currency,
            customer: customer.as_deref(),
            usuario_id: &usuario_id,
        })
        .await?;

    Ok(Json(PaymentSheet {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
        customer,
        ephemeral_key,
    }))
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

fn log_event(event: &WebhookEvent) {
    let object = event.object_id().unwrap_or_default();
    match event.kind.as_str() {
        "payment_intent.succeeded" => info!(payment_intent = object, "Payment succeeded"),
        "payment_intent.payment_failed" => error!(payment_intent = object, "Payment failed"),
        "payment_intent.canceled" => info!(payment_intent = object, "Payment canceled"),
        other => info!(kind = other, "Unhandled Stripe event"),
    }
}

/// `POST /stripe/webhook`
///
/// The body must reach the handler unparsed; the signature covers the raw
/// bytes.
#[instrument(skip(state, headers, body))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::bad_request("Webhook Error: falta el encabezado Stripe-Signature"))?;

    let event = state
        .stripe()?
        .construct_event(&body, signature)
        .map_err(|e| match e {
            StripeError::InvalidSignature(_) | StripeError::InvalidPayload(_) => {
                warn!(error = %e, "Webhook rejected");
                AppError::bad_request(format!("Webhook Error: {e}"))
            }
            StripeError::Config(_) => AppError::NotConfigured("Stripe webhook"),
            other => AppError::Gateway(other),
        })?;

    log_event(&event);
    Ok(Json(WebhookAck { received: true }))
}
