//! Branch (sucursal) rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use dengo_core::BranchId;

/// A physical store location.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Branch {
    pub id: BranchId,
    pub nombre: String,
    pub direccion: Option<String>,
    pub latitud: Option<f64>,
    pub longitud: Option<f64>,
    pub telefono: Option<String>,
    pub horario_apertura: Option<String>,
    pub activa: bool,
    pub creado_en: DateTime<Utc>,
}

/// Editable branch fields. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchFields {
    pub nombre: Option<String>,
    pub direccion: Option<String>,
    pub latitud: Option<f64>,
    pub longitud: Option<f64>,
    pub telefono: Option<String>,
    pub horario_apertura: Option<String>,
}

impl BranchFields {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nombre.is_none()
            && self.direccion.is_none()
            && self.latitud.is_none()
            && self.longitud.is_none()
            && self.telefono.is_none()
            && self.horario_apertura.is_none()
    }
}
