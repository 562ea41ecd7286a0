//! Taxonomía de errores del core.
//!
//! Las validaciones y los no-encontrados se detectan antes de cualquier
//! escritura; un fallo de almacenamiento a mitad de una unidad atómica
//! revierte la unidad completa.

use thiserror::Error;

use mesa_domain::DomainError;

use crate::almacen::AlmacenError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Entrada faltante o malformada, con el campo señalado.
    #[error("validación en {campo}: {mensaje}")]
    Validacion { campo: String, mensaje: String },
    /// El recurso pedido no existe.
    #[error("{0} no encontrado")]
    NoEncontrado(String),
    /// Precondición de estado o de integridad no satisfecha.
    #[error("conflicto: {0}")]
    Conflicto(String),
    /// Fallo de almacenamiento; el detalle queda en el log, no se expone.
    #[error("error de almacenamiento: {0}")]
    Almacen(String),
}

impl CoreError {
    pub fn validacion(campo: &str, mensaje: impl Into<String>) -> Self {
        CoreError::Validacion { campo: campo.to_owned(), mensaje: mensaje.into() }
    }
}

impl From<DomainError> for CoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validacion { campo, mensaje } => CoreError::Validacion { campo: campo.to_owned(), mensaje },
        }
    }
}

impl From<AlmacenError> for CoreError {
    fn from(err: AlmacenError) -> Self {
        match err {
            AlmacenError::NoEncontrado => CoreError::NoEncontrado("recurso".to_owned()),
            AlmacenError::Duplicado(detalle) => CoreError::Conflicto(detalle),
            AlmacenError::Conflicto(detalle) => CoreError::Conflicto(detalle),
            AlmacenError::Io(detalle) => CoreError::Almacen(detalle),
        }
    }
}

/// Reetiqueta un `NoEncontrado` genérico del almacén con el error específico
/// del caso de uso; cualquier otro fallo pasa intacto.
pub(crate) fn si_no_existe(err: AlmacenError, como: impl FnOnce() -> CoreError) -> CoreError {
    match err {
        AlmacenError::NoEncontrado => como(),
        otro => otro.into(),
    }
}
