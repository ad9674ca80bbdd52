//! Events and attendance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use dengo_core::{AttendanceId, BranchId, EventId, UserId};

use super::{BranchRef, UserRef};

/// An in-store event hosted by a branch.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Event {
    pub id: EventId,
    pub titulo: String,
    pub descripcion: Option<String>,
    pub sucursal_id: BranchId,
    pub inicia_en: Option<DateTime<Utc>>,
    pub termina_en: Option<DateTime<Utc>>,
    pub capacidad: Option<i32>,
    pub img: Option<String>,
    pub activo: bool,
    pub creado_en: DateTime<Utc>,
}

/// An event with its branch embedded.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EventListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: Event,
    pub sucursales: Option<Json<BranchRef>>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub titulo: String,
    pub descripcion: Option<String>,
    pub sucursal_id: BranchId,
    pub inicia_en: Option<DateTime<Utc>>,
    pub termina_en: Option<DateTime<Utc>>,
    pub capacidad: Option<i32>,
    pub img: Option<String>,
}

/// Editable event fields. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFields {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub sucursal_id: Option<BranchId>,
    pub inicia_en: Option<DateTime<Utc>>,
    pub termina_en: Option<DateTime<Utc>>,
    pub capacidad: Option<i32>,
    pub img: Option<String>,
    pub activo: Option<bool>,
}

impl EventFields {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.titulo.is_none()
            && self.descripcion.is_none()
            && self.sucursal_id.is_none()
            && self.inicia_en.is_none()
            && self.termina_en.is_none()
            && self.capacidad.is_none()
            && self.img.is_none()
            && self.activo.is_none()
    }
}

/// A user's registration for an event.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Attendance {
    pub id: AttendanceId,
    pub evento_id: EventId,
    pub usuario_id: UserId,
    pub registrado_en: DateTime<Utc>,
}

/// An attendance row with the attendee embedded.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttendanceListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub attendance: Attendance,
    pub usuarios: Option<Json<UserRef>>,
}
