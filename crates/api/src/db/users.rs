//! User repository.
//!
//! Loyalty counter updates are free functions over a `PgConnection` so the
//! sale pipeline can run them inside its transaction.

use sqlx::{PgConnection, PgPool};

use dengo_core::{TierId, UserId};

use super::{Assignments, RepositoryError};
use crate::models::user::{
    BillingProfile, DEFAULT_ACCOUNT_TYPE, LoyaltyState, NewUser, PointsBalance, User, UserFields,
    UserListing,
};

const USER_COLUMNS: &str = "id, nombre, apellidos, email, telefono, genero, fecha_nacimiento, \
     rol_id, nivel_id, sucursal_personal_id, tipo_cuenta, puntos, visitas, activo, creado_en";

const LISTING_SELECT: &str = "SELECT u.id, u.nombre, u.apellidos, u.email, u.telefono, u.genero, \
         u.fecha_nacimiento, u.rol_id, u.nivel_id, u.sucursal_personal_id, u.tipo_cuenta, \
         u.puntos, u.visitas, u.activo, u.creado_en, \
         (SELECT json_build_object('id', r.id, 'rol', r.rol) \
            FROM roles r WHERE r.id = u.rol_id) AS roles, \
         (SELECT json_build_object('id', n.id, 'codigo_nivel', n.codigo_nivel, \
                 'descripcion', n.descripcion, 'visitas_minimas', n.visitas_minimas) \
            FROM niveles_cuenta n WHERE n.id = u.nivel_id) AS niveles_cuenta, \
         (SELECT json_build_object('id', s.id, 'nombre', s.nombre, 'direccion', s.direccion) \
            FROM sucursales s WHERE s.id = u.sucursal_personal_id) AS sucursales \
     FROM usuarios u";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All users with role, tier, and home branch, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<UserListing>, RepositoryError> {
        let users = sqlx::query_as::<_, UserListing>(&format!(
            "{LISTING_SELECT} ORDER BY u.creado_en DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: UserId) -> Result<Option<UserListing>, RepositoryError> {
        let user = sqlx::query_as::<_, UserListing>(&format!("{LISTING_SELECT} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Create a user and its password credential in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewUser) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO usuarios (nombre, apellidos, email, telefono, genero, fecha_nacimiento, \
                 rol_id, nivel_id, sucursal_personal_id, tipo_cuenta) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new.nombre)
        .bind(new.apellidos.as_deref())
        .bind(new.email.as_str())
        .bind(new.telefono.as_deref())
        .bind(new.genero.as_deref())
        .bind(new.fecha_nacimiento)
        .bind(new.rol_id)
        .bind(new.nivel_id)
        .bind(new.sucursal_personal_id)
        .bind(DEFAULT_ACCOUNT_TYPE)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::from_write(e, "user")
        })?;

        sqlx::query("INSERT INTO usuario_credenciales (usuario_id, password_hash) VALUES ($1, $2)")
            .bind(user.id)
            .bind(&new.password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(user)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a referenced role, tier or
    /// branch does not exist.
    pub async fn update(
        &self,
        id: UserId,
        fields: UserFields,
    ) -> Result<Option<User>, RepositoryError> {
        let mut update = Assignments::new("usuarios");
        update
            .set("nombre", fields.nombre)
            .set("apellidos", fields.apellidos)
            .set("genero", fields.genero)
            .set("tipo_cuenta", fields.tipo_cuenta)
            .set("rol_id", fields.rol_id)
            .set("sucursal_personal_id", fields.sucursal_personal_id)
            .set("telefono", fields.telefono)
            .set("nivel_id", fields.nivel_id);
        if update.is_empty() {
            return self.get_plain(id).await;
        }

        let mut query = update.where_id(id);
        query.push(format!(" RETURNING {USER_COLUMNS}"));
        query
            .build_query_as::<User>()
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "user"))
    }

    async fn get_plain(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM usuarios WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Deactivate an account. Orders and sales keep referencing it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn deactivate(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE usuarios SET activo = FALSE WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Store the Expo push token of a device.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_expo_token(&self, id: UserId, token: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE usuarios SET expo_push_token = $2 WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// The Expo push token of a user, if one was registered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn expo_token(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let token: Option<Option<String>> =
            sqlx::query_scalar("SELECT expo_push_token FROM usuarios WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(token.flatten())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn billing_profile(
        &self,
        id: UserId,
    ) -> Result<Option<BillingProfile>, RepositoryError> {
        let profile = sqlx::query_as::<_, BillingProfile>(
            "SELECT nombre, apellidos, email, stripe_customer_id FROM usuarios WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(profile)
    }

    /// Remember the payment gateway customer created for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_stripe_customer(
        &self,
        id: UserId,
        customer_id: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE usuarios SET stripe_customer_id = $2 WHERE id = $1")
            .bind(id)
            .bind(customer_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Points, visits, and tier code of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn points_balance(
        &self,
        id: UserId,
    ) -> Result<Option<PointsBalance>, RepositoryError> {
        let balance = sqlx::query_as::<_, PointsBalance>(
            "SELECT u.puntos, u.visitas, n.codigo_nivel \
             FROM usuarios u LEFT JOIN niveles_cuenta n ON n.id = u.nivel_id \
             WHERE u.id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(balance)
    }
}

/// Lock and read a user's loyalty counters.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn loyalty_state(
    conn: &mut PgConnection,
    id: UserId,
) -> Result<Option<LoyaltyState>, RepositoryError> {
    let state = sqlx::query_as::<_, LoyaltyState>(
        "SELECT puntos, visitas, nivel_id FROM usuarios WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(state)
}

/// Subtract points only if the balance covers them.
///
/// Returns the remaining balance, or `None` when the balance is short or
/// the user does not exist.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn debit_points(
    conn: &mut PgConnection,
    id: UserId,
    points: i32,
) -> Result<Option<i32>, RepositoryError> {
    let remaining = sqlx::query_scalar::<_, i32>(
        "UPDATE usuarios SET puntos = puntos - $2 \
         WHERE id = $1 AND puntos >= $2 RETURNING puntos",
    )
    .bind(id)
    .bind(points)
    .fetch_optional(conn)
    .await?;
    Ok(remaining)
}

/// Credit points and count one visit.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn record_visit(
    conn: &mut PgConnection,
    id: UserId,
    points: i32,
) -> Result<Option<LoyaltyState>, RepositoryError> {
    let state = sqlx::query_as::<_, LoyaltyState>(
        "UPDATE usuarios SET puntos = puntos + $2, visitas = visitas + 1 \
         WHERE id = $1 RETURNING puntos, visitas, nivel_id",
    )
    .bind(id)
    .bind(points)
    .fetch_optional(conn)
    .await?;
    Ok(state)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_tier(
    conn: &mut PgConnection,
    id: UserId,
    tier: TierId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE usuarios SET nivel_id = $2 WHERE id = $1")
        .bind(id)
        .bind(tier)
        .execute(conn)
        .await?;
    Ok(())
}
