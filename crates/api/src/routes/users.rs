//! User (usuario) and push-token route handlers.

use axum::extract::State;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;

use dengo_core::{BranchId, Email, RoleId, UserId};

use crate::db::{RepositoryError, UserRepository};
use crate::error::{AppError, Result, not_found_as};
use crate::extract::{Json, Path};
use crate::models::user::{NewUser, User, UserFields, UserListing};
use crate::response::Envelope;
use crate::services::passwords::{PasswordError, hash_password};
use crate::state::AppState;

const NOT_FOUND: &str = "Usuario no encontrado";

/// `GET /usuarios`
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Envelope<Vec<UserListing>>> {
    let users = UserRepository::new(state.pool()).list().await?;
    Ok(Envelope::data(users))
}

/// `GET /usuarios/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Envelope<UserListing>> {
    let user = UserRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::data(user))
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub nombre: Option<String>,
    pub apellidos: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub genero: Option<String>,
    pub telefono: Option<String>,
    pub rol_id: Option<RoleId>,
    pub sucursal_personal_id: Option<BranchId>,
}

impl std::fmt::Debug for CreateUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUser")
            .field("nombre", &self.nombre)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl CreateUser {
    fn validate(self) -> Result<NewUser> {
        let text = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let (Some(nombre), Some(email), Some(password)) =
            (text(self.nombre), text(self.email), self.password.filter(|p| !p.is_empty()))
        else {
            return Err(AppError::bad_request(
                "Nombre, email y contraseña son requeridos",
            ));
        };

        let email =
            Email::parse(&email).map_err(|e| AppError::bad_request(format!("Email inválido: {e}")))?;
        let password_hash = hash_password(&password).map_err(|e| match e {
            PasswordError::TooShort => AppError::bad_request(e.to_string()),
            PasswordError::Hash => AppError::Internal(e.to_string()),
        })?;

        Ok(NewUser {
            nombre,
            apellidos: self.apellidos,
            email,
            telefono: self.telefono,
            genero: self.genero,
            fecha_nacimiento: self.fecha_nacimiento,
            rol_id: self.rol_id,
            nivel_id: None,
            sucursal_personal_id: self.sucursal_personal_id,
            password_hash,
        })
    }
}

/// `POST /usuarios`: sign-up.
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateUser>,
) -> Result<Envelope<User>> {
    let new = body.validate()?;
    let user = UserRepository::new(state.pool())
        .create(&new)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AppError::Conflict("El email ya está registrado".to_string())
            }
            other => AppError::Database(other),
        })?;
    tracing::info!(user_id = %user.id, "User created");

    Ok(Envelope::data(user)
        .message("Usuario creado exitosamente")
        .created())
}

/// `PUT /usuarios/{id}`
#[instrument(skip(state, fields))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(fields): Json<UserFields>,
) -> Result<Envelope<User>> {
    if fields.is_empty() {
        return Err(AppError::bad_request(
            "No se enviaron campos para actualizar",
        ));
    }

    let user = UserRepository::new(state.pool())
        .update(id, fields)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::data(user).message("Usuario actualizado exitosamente"))
}

/// `DELETE /usuarios/{id}`: soft delete.
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Envelope<()>> {
    UserRepository::new(state.pool())
        .deactivate(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::message_only(
        "Usuario eliminado (inactivado) exitosamente",
    ))
}

#[derive(Debug, Deserialize)]
pub struct ExpoTokenBody {
    pub user_id: Option<UserId>,
    pub expo_token: Option<String>,
}

/// `POST /expo/guardar-expo-token`
#[instrument(skip(state, body))]
pub async fn save_expo_token(
    State(state): State<AppState>,
    Json(body): Json<ExpoTokenBody>,
) -> Result<Envelope<()>> {
    let token = body.expo_token.filter(|t| !t.trim().is_empty());
    let (Some(user), Some(token)) = (body.user_id, token) else {
        return Err(AppError::bad_request("Faltan datos"));
    };

    UserRepository::new(state.pool())
        .set_expo_token(user, token.trim())
        .await
        .map_err(not_found_as(NOT_FOUND))?;
    tracing::debug!(%user, "Push token saved");

    Ok(Envelope::message_only("Token guardado correctamente"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn body(json: &str) -> CreateUser {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_create_user_hashes_password() {
        let new = body(r#"{"nombre": "Ana", "email": "ana@example.com", "password": "secreto1"}"#)
            .validate()
            .unwrap();
        assert_eq!(new.email.as_str(), "ana@example.com");
        assert!(new.password_hash.starts_with("$argon2id$"));
        assert!(!new.password_hash.contains("secreto1"));
    }

    #[test]
    fn test_create_user_validation() {
        let missing = body(r#"{"nombre": "Ana", "email": "ana@example.com"}"#);
        assert!(matches!(missing.validate(), Err(AppError::BadRequest(_))));

        let bad_email = body(r#"{"nombre": "Ana", "email": "ana", "password": "secreto1"}"#);
        assert!(matches!(bad_email.validate(), Err(AppError::BadRequest(_))));

        let short = body(r#"{"nombre": "Ana", "email": "ana@example.com", "password": "abc"}"#);
        let err = short.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bad request: La contraseña debe tener al menos 6 caracteres"
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let request = body(r#"{"nombre": "Ana", "email": "a@b.mx", "password": "secreto1"}"#);
        assert!(!format!("{request:?}").contains("secreto1"));
    }
}
