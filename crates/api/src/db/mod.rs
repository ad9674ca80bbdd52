//! Database operations for the Dengo `PostgreSQL` database.
//!
//! # Tables
//!
//! - `sucursales` - Branches
//! - `categorias`, `productos`, `ingredientes`, `producto_ingredientes` - Catalog
//! - `usuarios`, `usuario_credenciales`, `roles`, `niveles_cuenta` - Accounts and tiers
//! - `pedidos`, `items_pedido`, `pagos` - Orders, sales, and payments
//! - `promociones` - Promotions
//! - `eventos`, `asistencia_eventos` - Events and attendance
//! - `recetas_comunidad`, `favoritos_usuario` - Community recipes and favorites
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p dengo-cli -- migrate
//! ```
//!
//! Queries are built at runtime (`query_as` and `QueryBuilder`) so the crate
//! compiles without a live database.

pub mod branches;
pub mod categories;
pub mod community;
pub mod events;
pub mod favorites;
pub mod ingredients;
pub mod orders;
pub mod products;
pub mod promotions;
pub mod tiers;
pub mod users;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Encode, PgPool, Postgres, QueryBuilder, Type};
use thiserror::Error;

pub use branches::BranchRepository;
pub use categories::CategoryRepository;
pub use community::RecipeRepository;
pub use events::EventRepository;
pub use favorites::FavoriteRepository;
pub use ingredients::IngredientRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use promotions::PromotionRepository;
pub use tiers::TierRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique and foreign-key violations to [`RepositoryError::Conflict`].
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(format!("{what} already exists"));
            }
            if db_err.is_foreign_key_violation() {
                return Self::Conflict(format!("{what} references a missing record"));
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options().connect(database_url.expose_secret()).await
}

/// Create a pool that connects on first use.
///
/// Used by tests that exercise routes which never reach the database.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL cannot be parsed.
pub fn create_lazy_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options().connect_lazy(database_url.expose_secret())
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
}

/// Builder for partial `UPDATE` statements.
///
/// Only the columns given a value are written, so `PUT` bodies can carry
/// any subset of fields. Column names are always compile-time constants.
pub struct Assignments<'args> {
    builder: QueryBuilder<'args, Postgres>,
    fields: usize,
    separated: bool,
}

impl<'args> Assignments<'args> {
    /// Start an `UPDATE <table> SET` statement.
    #[must_use]
    pub fn new(table: &'static str) -> Self {
        Self {
            builder: QueryBuilder::new(format!("UPDATE {table} SET ")),
            fields: 0,
            separated: false,
        }
    }

    fn separator(&mut self) {
        if self.separated {
            self.builder.push(", ");
        }
        self.separated = true;
    }

    /// Assign `column = value` when `value` is present.
    pub fn set<T>(&mut self, column: &'static str, value: Option<T>) -> &mut Self
    where
        T: 'args + Encode<'args, Postgres> + Type<Postgres>,
    {
        if let Some(value) = value {
            self.separator();
            self.builder.push(column).push(" = ").push_bind(value);
            self.fields += 1;
        }
        self
    }

    /// Assign a SQL expression that does not count as a client field
    /// (e.g. `actualizado_en = NOW()`).
    pub fn touch(&mut self, column: &'static str, expression: &'static str) -> &mut Self {
        self.separator();
        self.builder.push(column).push(" = ").push(expression);
        self
    }

    /// Whether no client-supplied field was assigned.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fields == 0
    }

    /// Append `WHERE id = $n` and hand back the builder for extra filters
    /// and the `RETURNING` clause.
    pub fn where_id<T>(mut self, id: T) -> QueryBuilder<'args, Postgres>
    where
        T: 'args + Encode<'args, Postgres> + Type<Postgres>,
    {
        self.builder.push(" WHERE id = ").push_bind(id);
        self.builder
    }
}

/// Default page size for paginated listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Upper bound on page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// `?pagina=&por_pagina=` query parameters.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct PageParams {
    pub pagina: Option<u32>,
    pub por_pagina: Option<u32>,
}

impl PageParams {
    /// 1-based page number.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.pagina.unwrap_or(1).max(1)
    }

    /// Page size, clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.por_pagina
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page())
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignments_skip_missing_fields() {
        let mut update = Assignments::new("sucursales");
        update.set("nombre", Some("Centro".to_string()));
        update.set::<String>("direccion", None);
        update.set("telefono", Some("555".to_string()));
        assert!(!update.is_empty());

        let sql = update.where_id(3_i32).into_sql();
        assert_eq!(
            sql,
            "UPDATE sucursales SET nombre = $1, telefono = $2 WHERE id = $3"
        );
    }

    #[test]
    fn test_assignments_touch_is_not_a_field() {
        let mut update = Assignments::new("productos");
        update.touch("actualizado_en", "NOW()");
        assert!(update.is_empty());
        update.set("precio", Some(10_i32));
        let sql = update.where_id(1_i32).into_sql();
        assert_eq!(
            sql,
            "UPDATE productos SET actualizado_en = NOW(), precio = $1 WHERE id = $2"
        );
    }

    #[test]
    fn test_page_params_defaults() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), DEFAULT_PAGE_SIZE);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_page_params_offset_and_clamp() {
        let params = PageParams {
            pagina: Some(3),
            por_pagina: Some(20),
        };
        assert_eq!(params.offset(), 40);
        assert_eq!(params.limit(), 20);

        let silly = PageParams {
            pagina: Some(0),
            por_pagina: Some(5000),
        };
        assert_eq!(silly.page(), 1);
        assert_eq!(silly.per_page(), MAX_PAGE_SIZE);
    }
}
