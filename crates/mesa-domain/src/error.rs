use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{campo}: {mensaje}")]
    Validacion { campo: &'static str, mensaje: String },
}

impl DomainError {
    pub fn validacion(campo: &'static str, mensaje: impl Into<String>) -> Self {
        DomainError::Validacion { campo, mensaje: mensaje.into() }
    }
}
