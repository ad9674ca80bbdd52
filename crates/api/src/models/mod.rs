//! Row types returned by the repositories and serialized by the routes.
//!
//! Field names are the column names, which are also the JSON names mobile
//! clients read. Related rows are embedded as small `*Ref` objects built
//! with `json_build_object` in SQL and decoded through `sqlx::types::Json`.

pub mod branch;
pub mod catalog;
pub mod community;
pub mod event;
pub mod order;
pub mod promotion;
pub mod user;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dengo_core::{BranchId, CategoryId, ProductId, RecipeId, RoleId, TierId, UserId};

/// `{id, nombre}` of a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub nombre: String,
}

/// Public identity of a user embedded in other resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub nombre: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apellidos: Option<String>,
    pub email: String,
}

/// Just the display name of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserNameRef {
    pub nombre: String,
}

/// `{id, nombre, direccion}` of a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRef {
    pub id: BranchId,
    pub nombre: String,
    #[serde(default)]
    pub direccion: Option<String>,
}

/// Tier summary embedded in users and promotions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierRef {
    pub id: TierId,
    pub codigo_nivel: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    pub visitas_minimas: i32,
}

/// `{id, rol}` of a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: RoleId,
    pub rol: String,
}

/// `{id, nombre, precio}` of a product.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductRef {
    pub id: ProductId,
    pub nombre: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub precio: Decimal,
}

/// `{id, nombre}` of a community recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeRef {
    pub id: RecipeId,
    pub nombre: String,
}

/// SQL fragments that build the `*Ref` objects above from a table alias.
pub(crate) mod embed {
    /// `categorias` object for `productos` aliased as `p`.
    pub const PRODUCT_CATEGORY: &str = "(SELECT json_build_object('id', c.id, 'nombre', c.nombre) \
         FROM categorias c WHERE c.id = p.categoria_id) AS categorias";

    /// `creador` object for `productos` aliased as `p`.
    pub const PRODUCT_CREATOR: &str = "(SELECT json_build_object('id', u.id, 'nombre', u.nombre, 'email', u.email) \
         FROM usuarios u WHERE u.id = p.creado_por) AS creador";
}
