//! Event and attendance repository.

use sqlx::PgPool;

use dengo_core::{BranchId, EventId, UserId};

use super::{Assignments, RepositoryError};
use crate::models::event::{Attendance, AttendanceListing, Event, EventFields, EventListing, NewEvent};

const EVENT_COLUMNS: &str =
    "id, titulo, descripcion, sucursal_id, inicia_en, termina_en, capacidad, img, activo, creado_en";

const LISTING_SELECT: &str = "SELECT e.id, e.titulo, e.descripcion, e.sucursal_id, e.inicia_en, \
         e.termina_en, e.capacidad, e.img, e.activo, e.creado_en, \
         json_build_object('id', s.id, 'nombre', s.nombre, 'direccion', s.direccion) AS sucursales \
     FROM eventos e JOIN sucursales s ON s.id = e.sucursal_id";

/// Outcome of an attendance registration.
#[derive(Debug)]
pub enum Registration {
    Registered(Attendance),
    /// The event is missing or inactive.
    EventNotFound,
    AlreadyRegistered,
    Full,
}

/// Repository for events and their attendance.
pub struct EventRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EventRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active events of active branches, soonest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_visible(&self) -> Result<Vec<EventListing>, RepositoryError> {
        let events = sqlx::query_as::<_, EventListing>(&format!(
            "{LISTING_SELECT} WHERE e.activo AND s.activa ORDER BY e.inicia_en ASC NULLS LAST"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(events)
    }

    /// An active event whose branch is also active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_visible(&self, id: EventId) -> Result<Option<EventListing>, RepositoryError> {
        let event = sqlx::query_as::<_, EventListing>(&format!(
            "{LISTING_SELECT} WHERE e.id = $1 AND e.activo AND s.activa"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(event)
    }

    /// Active events of a branch, whatever the branch state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_branch(&self, branch: BranchId) -> Result<Vec<Event>, RepositoryError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM eventos WHERE sucursal_id = $1 AND activo \
             ORDER BY inicia_en ASC NULLS LAST"
        ))
        .bind(branch)
        .fetch_all(self.pool)
        .await?;
        Ok(events)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the branch does not exist.
    pub async fn create(&self, new: &NewEvent) -> Result<Event, RepositoryError> {
        sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO eventos (titulo, descripcion, sucursal_id, inicia_en, termina_en, capacidad, img) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {EVENT_COLUMNS}"
        ))
        .bind(&new.titulo)
        .bind(new.descripcion.as_deref())
        .bind(new.sucursal_id)
        .bind(new.inicia_en)
        .bind(new.termina_en)
        .bind(new.capacidad)
        .bind(new.img.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "event"))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the branch does not exist.
    pub async fn update(
        &self,
        id: EventId,
        fields: EventFields,
    ) -> Result<Option<Event>, RepositoryError> {
        let mut update = Assignments::new("eventos");
        update
            .set("titulo", fields.titulo)
            .set("descripcion", fields.descripcion)
            .set("sucursal_id", fields.sucursal_id)
            .set("inicia_en", fields.inicia_en)
            .set("termina_en", fields.termina_en)
            .set("capacidad", fields.capacidad)
            .set("img", fields.img)
            .set("activo", fields.activo);
        if update.is_empty() {
            return self.get(id).await;
        }

        let mut query = update.where_id(id);
        query.push(format!(" RETURNING {EVENT_COLUMNS}"));
        query
            .build_query_as::<Event>()
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "event"))
    }

    async fn get(&self, id: EventId) -> Result<Option<Event>, RepositoryError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM eventos WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(event)
    }

    /// Soft-delete an event.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn deactivate(&self, id: EventId) -> Result<Option<Event>, RepositoryError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "UPDATE eventos SET activo = FALSE WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(event)
    }

    /// Register a user for an active event, respecting its capacity.
    ///
    /// The event row is locked for the duration so concurrent registrations
    /// cannot overfill it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user does not exist.
    pub async fn register(
        &self,
        event: EventId,
        user: UserId,
    ) -> Result<Registration, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let capacity: Option<Option<i32>> = sqlx::query_scalar(
            "SELECT capacidad FROM eventos WHERE id = $1 AND activo FOR UPDATE",
        )
        .bind(event)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(capacity) = capacity else {
            return Ok(Registration::EventNotFound);
        };

        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM asistencia_eventos WHERE evento_id = $1 AND usuario_id = $2)",
        )
        .bind(event)
        .bind(user)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Ok(Registration::AlreadyRegistered);
        }

        if let Some(capacity) = capacity {
            let taken: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM asistencia_eventos WHERE evento_id = $1")
                    .bind(event)
                    .fetch_one(&mut *tx)
                    .await?;
            if taken >= i64::from(capacity) {
                return Ok(Registration::Full);
            }
        }

        let attendance = sqlx::query_as::<_, Attendance>(
            "INSERT INTO asistencia_eventos (evento_id, usuario_id) VALUES ($1, $2) \
             RETURNING id, evento_id, usuario_id, registrado_en",
        )
        .bind(event)
        .bind(user)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "attendance"))?;

        tx.commit().await?;
        Ok(Registration::Registered(attendance))
    }

    /// Attendees of an event, in registration order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn attendees(&self, event: EventId) -> Result<Vec<AttendanceListing>, RepositoryError> {
        let attendees = sqlx::query_as::<_, AttendanceListing>(
            "SELECT a.id, a.evento_id, a.usuario_id, a.registrado_en, \
                 (SELECT json_build_object('id', u.id, 'nombre', u.nombre, \
                         'apellidos', u.apellidos, 'email', u.email) \
                    FROM usuarios u WHERE u.id = a.usuario_id) AS usuarios \
             FROM asistencia_eventos a \
             WHERE a.evento_id = $1 \
             ORDER BY a.registrado_en ASC",
        )
        .bind(event)
        .fetch_all(self.pool)
        .await?;
        Ok(attendees)
    }

    /// Whether an event row exists, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: EventId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM eventos WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }
}
