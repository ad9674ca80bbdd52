//! Status enums for orders and community recipes.
//!
//! Both map to `PostgreSQL` enum types (`estado_pedido`, `estado_receta`)
//! when the `postgres` feature is enabled. Their wire form is the lowercase
//! Spanish label clients already send.

use serde::{Deserialize, Serialize};

/// Delivery method assumed when an order does not specify one.
pub const DEFAULT_DELIVERY_METHOD: &str = "en_local";

/// Payment method assumed when a sale does not specify one.
pub const DEFAULT_PAYMENT_METHOD: &str = "tarjeta";

/// Lifecycle of an order.
///
/// ```text
/// recibido -> preparando -> listo -> entregado
///     \___________\___________\______> cancelado
/// ```
///
/// Skipping forward (e.g. `recibido -> listo`) is allowed; moving backwards
/// or out of a terminal state is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "estado_pedido", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Recibido,
    Preparando,
    Listo,
    Entregado,
    Cancelado,
}

impl OrderStatus {
    /// Every status in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Recibido,
        Self::Preparando,
        Self::Listo,
        Self::Entregado,
        Self::Cancelado,
    ];

    /// Position along the happy path; `cancelado` sits outside it.
    const fn rank(self) -> Option<u8> {
        match self {
            Self::Recibido => Some(0),
            Self::Preparando => Some(1),
            Self::Listo => Some(2),
            Self::Entregado => Some(3),
            Self::Cancelado => None,
        }
    }

    /// Wire and database label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recibido => "recibido",
            Self::Preparando => "preparando",
            Self::Listo => "listo",
            Self::Entregado => "entregado",
            Self::Cancelado => "cancelado",
        }
    }

    /// Delivered and cancelled orders accept no further changes.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Entregado | Self::Cancelado)
    }

    /// Whether the cancel endpoint may act on an order in this state.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        !self.is_terminal()
    }

    /// Whether an order may move from `self` to `next`.
    ///
    /// Re-applying the current status is accepted so status updates stay
    /// idempotent for clients that retry.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return !self.is_terminal();
        }
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("estado de pedido no válido: {s}"))
    }
}

/// Moderation state of a community recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "estado_receta", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum RecipeStatus {
    #[default]
    Pendiente,
    Aprobado,
    Rechazado,
}

impl std::fmt::Display for RecipeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pendiente => write!(f, "pendiente"),
            Self::Aprobado => write!(f, "aprobado"),
            Self::Rechazado => write!(f, "rechazado"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_round_trips_labels() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("enviado".parse::<OrderStatus>().is_err());
        assert!("Recibido".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_status_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Preparando).unwrap(),
            "\"preparando\""
        );
        let parsed: OrderStatus = serde_json::from_str("\"listo\"").unwrap();
        assert_eq!(parsed, OrderStatus::Listo);
    }

    #[test]
    fn test_forward_transitions_allowed() {
        use OrderStatus::{Entregado, Listo, Preparando, Recibido};
        assert!(Recibido.can_transition_to(Preparando));
        assert!(Preparando.can_transition_to(Listo));
        assert!(Listo.can_transition_to(Entregado));
        assert!(Recibido.can_transition_to(Entregado));
    }

    #[test]
    fn test_backward_transitions_rejected() {
        use OrderStatus::{Listo, Preparando, Recibido};
        assert!(!Listo.can_transition_to(Preparando));
        assert!(!Preparando.can_transition_to(Recibido));
    }

    #[test]
    fn test_cancel_from_any_open_state() {
        for status in [
            OrderStatus::Recibido,
            OrderStatus::Preparando,
            OrderStatus::Listo,
        ] {
            assert!(status.can_transition_to(OrderStatus::Cancelado));
            assert!(status.is_cancellable());
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [OrderStatus::Entregado, OrderStatus::Cancelado] {
            assert!(terminal.is_terminal());
            assert!(!terminal.is_cancellable());
            for next in OrderStatus::ALL {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_same_status_is_idempotent_for_open_orders() {
        assert!(OrderStatus::Preparando.can_transition_to(OrderStatus::Preparando));
    }

    #[test]
    fn test_recipe_status_labels() {
        assert_eq!(RecipeStatus::Aprobado.to_string(), "aprobado");
        assert_eq!(RecipeStatus::default(), RecipeStatus::Pendiente);
        let parsed: RecipeStatus = serde_json::from_str("\"rechazado\"").unwrap();
        assert_eq!(parsed, RecipeStatus::Rechazado);
    }
}
