//! Errores de persistencia.
//! Mapea errores de Diesel / conexión a variantes semánticas y las traduce
//! al vocabulario `AlmacenError` que entiende el core.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use mesa_core::AlmacenError;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("violación de unicidad: {0}")]
    UniqueViolation(String),
    #[error("violación de check: {0}")]
    CheckViolation(String),
    #[error("violación de clave foránea: {0}")]
    ForeignKeyViolation(String),
    #[error("no encontrado")]
    NotFound,
    #[error("conflicto de serialización (reintentable)")]
    SerializationConflict,
    #[error("error transitorio de IO / pool de conexiones: {0}")]
    TransientIo(String),
    #[error("error de base de datos desconocido: {0}")]
    Unknown(String),
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(info.message().to_string()),
                DatabaseErrorKind::CheckViolation => Self::CheckViolation(info.message().to_string()),
                DatabaseErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation(info.message().to_string()),
                DatabaseErrorKind::SerializationFailure => Self::SerializationConflict,
                otro => Self::Unknown(format!("db error kind {:?}: {}", otro, info.message())),
            },
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            otro => Self::Unknown(format!("diesel: {otro}")),
        }
    }
}

impl From<PersistenceError> for AlmacenError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound => AlmacenError::NoEncontrado,
            PersistenceError::UniqueViolation(detalle) => AlmacenError::Duplicado(detalle),
            PersistenceError::CheckViolation(detalle) | PersistenceError::ForeignKeyViolation(detalle) => {
                AlmacenError::Conflicto(detalle)
            }
            otro => AlmacenError::Io(otro.to_string()),
        }
    }
}
