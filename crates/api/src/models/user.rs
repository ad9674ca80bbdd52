//! Users, roles, and loyalty tiers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use dengo_core::{BranchId, Email, RoleId, TierId, UserId};

use super::{BranchRef, RoleRef, TierRef};

/// Account type assigned to self-registered users.
pub const DEFAULT_ACCOUNT_TYPE: &str = "personal";

/// A customer or staff account.
///
/// Gateway and push identifiers are read through dedicated repository
/// methods and never serialized.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub nombre: String,
    pub apellidos: Option<String>,
    pub email: String,
    pub telefono: Option<String>,
    pub genero: Option<String>,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub rol_id: Option<RoleId>,
    pub nivel_id: Option<TierId>,
    pub sucursal_personal_id: Option<BranchId>,
    pub tipo_cuenta: String,
    pub puntos: i32,
    pub visitas: i32,
    pub activo: bool,
    pub creado_en: DateTime<Utc>,
}

/// A user with role, tier, and home branch embedded.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: User,
    pub roles: Option<Json<RoleRef>>,
    pub niveles_cuenta: Option<Json<TierRef>>,
    pub sucursales: Option<Json<BranchRef>>,
}

/// Values for a new user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub nombre: String,
    pub apellidos: Option<String>,
    pub email: Email,
    pub telefono: Option<String>,
    pub genero: Option<String>,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub rol_id: Option<RoleId>,
    pub nivel_id: Option<TierId>,
    pub sucursal_personal_id: Option<BranchId>,
    pub password_hash: String,
}

/// Editable user fields. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFields {
    pub nombre: Option<String>,
    pub apellidos: Option<String>,
    pub genero: Option<String>,
    pub tipo_cuenta: Option<String>,
    pub rol_id: Option<RoleId>,
    pub sucursal_personal_id: Option<BranchId>,
    pub telefono: Option<String>,
    pub nivel_id: Option<TierId>,
}

impl UserFields {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nombre.is_none()
            && self.apellidos.is_none()
            && self.genero.is_none()
            && self.tipo_cuenta.is_none()
            && self.rol_id.is_none()
            && self.sucursal_personal_id.is_none()
            && self.telefono.is_none()
            && self.nivel_id.is_none()
    }
}

/// What the payment flow needs to know about a customer.
#[derive(Debug, Clone, FromRow)]
pub struct BillingProfile {
    pub nombre: String,
    pub apellidos: Option<String>,
    pub email: String,
    pub stripe_customer_id: Option<String>,
}

impl BillingProfile {
    /// Full name as shown on receipts.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.nombre,
            self.apellidos.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }
}

/// Loyalty counters of a user.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct LoyaltyState {
    pub puntos: i32,
    pub visitas: i32,
    pub nivel_id: Option<TierId>,
}

/// Points balance with the tier code resolved.
#[derive(Debug, Clone, FromRow)]
pub struct PointsBalance {
    pub puntos: i32,
    pub visitas: i32,
    pub codigo_nivel: Option<String>,
}

/// A loyalty tier.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tier {
    pub id: TierId,
    pub codigo_nivel: String,
    pub descripcion: Option<String>,
    pub visitas_minimas: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_display_name() {
        let mut profile = BillingProfile {
            nombre: "Ana".to_string(),
            apellidos: Some("López".to_string()),
            email: "ana@dengo.mx".to_string(),
            stripe_customer_id: None,
        };
        assert_eq!(profile.display_name(), "Ana López");

        profile.apellidos = None;
        assert_eq!(profile.display_name(), "Ana");
    }
}
