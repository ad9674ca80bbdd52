//! Categories, products, ingredients, and favorites.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use dengo_core::{CategoryId, FavoriteId, IngredientId, ProductId, RecipeId, UserId};

use super::{CategoryRef, ProductRef, RecipeRef, UserRef};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub nombre: String,
}

/// A sellable product.
///
/// `eliminado` marks a soft delete; deleted products never leave the
/// repository. `deshabilitado_hasta` holds a temporary suspension.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: ProductId,
    pub nombre: String,
    pub descripcion: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub precio: Decimal,
    pub url_imagen: Option<String>,
    pub categoria_id: Option<CategoryId>,
    pub creado_por: Option<UserId>,
    pub activo: bool,
    pub eliminado: bool,
    pub deshabilitado_hasta: Option<DateTime<Utc>>,
    pub razon_deshabilitacion_temporal: Option<String>,
    pub creado_en: DateTime<Utc>,
    pub actualizado_en: DateTime<Utc>,
}

/// A product with its category and creator embedded.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub categorias: Option<Json<CategoryRef>>,
    pub creador: Option<Json<UserRef>>,
}

/// Values for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub nombre: String,
    pub descripcion: Option<String>,
    pub precio: Decimal,
    pub url_imagen: Option<String>,
    pub categoria_id: Option<CategoryId>,
    pub creado_por: Option<UserId>,
}

/// Editable product fields. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFields {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub precio: Option<Decimal>,
    pub url_imagen: Option<String>,
    pub categoria_id: Option<CategoryId>,
    pub activo: Option<bool>,
}

impl ProductFields {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nombre.is_none()
            && self.descripcion.is_none()
            && self.precio.is_none()
            && self.url_imagen.is_none()
            && self.categoria_id.is_none()
            && self.activo.is_none()
    }
}

/// An ingredient customers can pick when customizing products.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Ingredient {
    pub id: IngredientId,
    pub nombre: String,
    pub descripcion: String,
    pub tipo: String,
    pub categoria_id: Option<CategoryId>,
    pub activo: bool,
    pub creado_en: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewIngredient {
    pub nombre: String,
    pub descripcion: String,
    pub tipo: String,
    pub categoria_id: Option<CategoryId>,
    pub activo: bool,
}

/// Editable ingredient fields. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngredientFields {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub tipo: Option<String>,
    pub categoria_id: Option<CategoryId>,
    pub activo: Option<bool>,
}

impl IngredientFields {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nombre.is_none()
            && self.descripcion.is_none()
            && self.tipo.is_none()
            && self.categoria_id.is_none()
            && self.activo.is_none()
    }
}

/// A product (optionally a community variant of it) a user marked as favorite.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Favorite {
    pub id: FavoriteId,
    pub usuario_id: UserId,
    pub producto_id: ProductId,
    pub receta_id: Option<RecipeId>,
    pub creado_en: DateTime<Utc>,
}

/// A favorite with its product and recipe embedded.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FavoriteListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub favorite: Favorite,
    pub productos: Option<Json<ProductRef>>,
    pub recetas_comunidad: Option<Json<RecipeRef>>,
}
