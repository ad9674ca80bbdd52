//! Event (evento) and attendance route handlers.

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use dengo_core::{BranchId, EventId, UserId};

use crate::db::EventRepository;
use crate::db::events::Registration;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::models::event::{Attendance, AttendanceListing, Event, EventFields, EventListing, NewEvent};
use crate::response::Envelope;
use crate::state::AppState;

const NOT_FOUND: &str = "Evento no encontrado";

/// `GET /eventos`: active events of active branches.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Envelope<Vec<EventListing>>> {
    let events = EventRepository::new(state.pool()).list_visible().await?;
    Ok(Envelope::data(events))
}

/// `GET /eventos/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<Envelope<EventListing>> {
    let event = EventRepository::new(state.pool())
        .get_visible(id)
        .await?
        .ok_or_else(|| AppError::not_found("Evento no encontrado o su sucursal está inactiva"))?;
    Ok(Envelope::data(event))
}

#[derive(Debug, Deserialize)]
pub struct CreateEvent {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub sucursal_id: Option<BranchId>,
    pub inicia_en: Option<DateTime<Utc>>,
    pub termina_en: Option<DateTime<Utc>>,
    pub capacidad: Option<i32>,
    pub img: Option<String>,
}

impl CreateEvent {
    fn validate(self) -> Result<NewEvent> {
        let titulo = self.titulo.filter(|t| !t.trim().is_empty());
        let (Some(titulo), Some(sucursal_id)) = (titulo, self.sucursal_id) else {
            return Err(AppError::bad_request(
                "El título y la sucursal son obligatorios",
            ));
        };
        Ok(NewEvent {
            titulo,
            descripcion: self.descripcion,
            sucursal_id,
            inicia_en: self.inicia_en,
            termina_en: self.termina_en,
            capacidad: self.capacidad,
            img: self.img,
        })
    }
}

/// `POST /eventos`
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateEvent>,
) -> Result<Envelope<Event>> {
    let new = body.validate()?;
    let event = EventRepository::new(state.pool()).create(&new).await?;
    tracing::info!(event_id = %event.id, sucursal_id = %event.sucursal_id, "Event created");

    Ok(Envelope::data(event)
        .message("Evento creado exitosamente")
        .created())
}

/// `PUT /eventos/{id}`
#[instrument(skip(state, fields))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
    Json(fields): Json<EventFields>,
) -> Result<Envelope<Event>> {
    if fields.is_empty() {
        return Err(AppError::bad_request(
            "No se enviaron campos para actualizar",
        ));
    }

    let event = EventRepository::new(state.pool())
        .update(id, fields)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::data(event).message("Evento actualizado exitosamente"))
}

/// `DELETE /eventos/{id}`: soft delete.
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<Envelope<()>> {
    EventRepository::new(state.pool())
        .deactivate(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Envelope::message_only(
        "Evento eliminado (inactivado) exitosamente",
    ))
}

/// `GET /eventos/sucursal/{sucursal_id}`
#[instrument(skip(state))]
pub async fn by_branch(
    State(state): State<AppState>,
    Path(branch): Path<BranchId>,
) -> Result<Envelope<Vec<Event>>> {
    let events = EventRepository::new(state.pool())
        .list_for_branch(branch)
        .await?;
    if events.is_empty() {
        return Err(AppError::not_found(
            "No se encontraron eventos activos para esta sucursal",
        ));
    }
    Ok(Envelope::list(events))
}

#[derive(Debug, Deserialize)]
pub struct AttendanceBody {
    pub usuario_id: Option<UserId>,
}

/// `POST /eventos/{id}/asistencia`
#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
    Json(body): Json<AttendanceBody>,
) -> Result<Envelope<Attendance>> {
    let Some(user) = body.usuario_id else {
        return Err(AppError::bad_request("El usuario es requerido"));
    };

    match EventRepository::new(state.pool()).register(id, user).await? {
        Registration::Registered(attendance) => {
            tracing::info!(event_id = %id, %user, "Attendance registered");
            Ok(Envelope::data(attendance)
                .message("Asistencia registrada exitosamente")
                .created())
        }
        Registration::EventNotFound => Err(AppError::not_found(NOT_FOUND)),
        Registration::AlreadyRegistered => Err(AppError::Conflict(
            "El usuario ya está registrado en este evento".to_string(),
        )),
        Registration::Full => Err(AppError::bad_request("El evento ya no tiene cupo")),
    }
}

/// `GET /eventos/{id}/asistencia`
#[instrument(skip(state))]
pub async fn attendees(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<Envelope<Vec<AttendanceListing>>> {
    let repo = EventRepository::new(state.pool());
    if !repo.exists(id).await? {
        return Err(AppError::not_found(NOT_FOUND));
    }
    let attendees = repo.attendees(id).await?;
    Ok(Envelope::list(attendees))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_title_and_branch() {
        let body: CreateEvent =
            serde_json::from_str(r#"{"titulo": "Noche de juegos", "sucursal_id": 2}"#).unwrap();
        let new = body.validate().unwrap();
        assert_eq!(new.sucursal_id, BranchId::new(2));

        let body: CreateEvent = serde_json::from_str(r#"{"titulo": "  ", "sucursal_id": 2}"#).unwrap();
        assert!(matches!(body.validate(), Err(AppError::BadRequest(_))));

        let body: CreateEvent = serde_json::from_str(r#"{"titulo": "Cata"}"#).unwrap();
        assert!(matches!(body.validate(), Err(AppError::BadRequest(_))));
    }
}
