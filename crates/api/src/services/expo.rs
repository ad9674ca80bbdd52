//! Expo push notification client.
//!
//! Sends order status updates to the customer's device through Expo's push
//! service.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use dengo_core::{OrderId, OrderStatus};

/// Expo push send endpoint.
const PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

/// Screen the app opens when the notification is tapped.
const ORDER_DETAIL_SCREEN: &str = "DetallePedido";

/// Errors that can occur when sending push notifications.
#[derive(Debug, Error)]
pub enum ExpoError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Expo rejected the message.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Check the `ExponentPushToken[...]` / `ExpoPushToken[...]` shape.
#[must_use]
pub fn is_expo_push_token(token: &str) -> bool {
    ["ExponentPushToken[", "ExpoPushToken["]
        .iter()
        .any(|prefix| {
            token
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(']'))
                .is_some_and(|inner| !inner.is_empty())
        })
}

/// Extra data delivered with an order notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPushData {
    #[serde(rename = "pedidoId")]
    pub pedido_id: OrderId,
    pub pantalla: &'static str,
}

/// A push message in Expo's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub to: String,
    pub sound: &'static str,
    pub title: String,
    pub body: String,
    pub data: OrderPushData,
}

impl PushMessage {
    /// The notification sent when an order moves to `status`.
    #[must_use]
    pub fn order_status(to: &str, order: OrderId, status: OrderStatus) -> Self {
        let (title, body) = match status {
            OrderStatus::Preparando => (
                "¡Tu pedido está en preparación!".to_string(),
                "Estamos preparando tu pedido.".to_string(),
            ),
            OrderStatus::Listo => (
                "¡Tu pedido está listo!".to_string(),
                "Ya puedes pasar a recogerlo.".to_string(),
            ),
            OrderStatus::Cancelado => (
                "Hemos cancelado tu pedido".to_string(),
                format!("Tu pedido ahora está: {status}"),
            ),
            OrderStatus::Recibido | OrderStatus::Entregado => (
                "Actualización de pedido! ".to_string(),
                format!("Tu pedido ahora está: {status}"),
            ),
        };

        Self {
            to: to.to_string(),
            sound: "default",
            title,
            body,
            data: OrderPushData {
                pedido_id: order,
                pantalla: ORDER_DETAIL_SCREEN,
            },
        }
    }
}

/// Expo push API client.
#[derive(Clone)]
pub struct ExpoClient {
    client: reqwest::Client,
    access_token: Option<SecretString>,
}

impl std::fmt::Debug for ExpoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpoClient")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl ExpoClient {
    /// Create a new Expo client. The access token is only needed when push
    /// security is enabled on the Expo project.
    #[must_use]
    pub fn new(access_token: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
        }
    }

    /// Send one push message.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Expo answers with a non-2xx
    /// status.
    #[instrument(skip(self, message), fields(pedido_id = %message.data.pedido_id))]
    pub async fn send(&self, message: &PushMessage) -> Result<(), ExpoError> {
        let mut request = self.client.post(PUSH_URL).json(&[message]);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExpoError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Push notification sent");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_expo_push_token() {
        assert!(is_expo_push_token("ExponentPushToken[xxxxxxxxxxxxxxxxxxxxxx]"));
        assert!(is_expo_push_token("ExpoPushToken[abc]"));
        assert!(!is_expo_push_token("ExponentPushToken[]"));
        assert!(!is_expo_push_token("ExponentPushToken[abc"));
        assert!(!is_expo_push_token("fcm:abc"));
        assert!(!is_expo_push_token(""));
    }

    #[test]
    fn test_order_status_messages() {
        let order = OrderId::new(42);
        let token = "ExpoPushToken[abc]";

        let ready = PushMessage::order_status(token, order, OrderStatus::Listo);
        assert_eq!(ready.title, "¡Tu pedido está listo!");
        assert_eq!(ready.body, "Ya puedes pasar a recogerlo.");

        let preparing = PushMessage::order_status(token, order, OrderStatus::Preparando);
        assert_eq!(preparing.title, "¡Tu pedido está en preparación!");

        let cancelled = PushMessage::order_status(token, order, OrderStatus::Cancelado);
        assert_eq!(cancelled.title, "Hemos cancelado tu pedido");
        assert_eq!(cancelled.body, "Tu pedido ahora está: cancelado");

        let delivered = PushMessage::order_status(token, order, OrderStatus::Entregado);
        assert_eq!(delivered.title, "Actualización de pedido! ");
        assert_eq!(delivered.body, "Tu pedido ahora está: entregado");
    }

    #[test]
    fn test_push_message_wire_format() {
        let message =
            PushMessage::order_status("ExpoPushToken[abc]", OrderId::new(7), OrderStatus::Listo);
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["to"], "ExpoPushToken[abc]");
        assert_eq!(value["sound"], "default");
        assert_eq!(value["data"]["pedidoId"], 7);
        assert_eq!(value["data"]["pantalla"], "DetallePedido");
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = ExpoClient::new(Some(SecretString::from("expo-secret".to_string())));
        assert!(!format!("{client:?}").contains("expo-secret"));
    }
}
