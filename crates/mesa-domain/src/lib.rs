// mesa-domain library entry point
pub mod asunto;
pub mod atencion;
pub mod entrega;
pub mod error;
pub mod estado;
pub mod expediente;
pub mod historial;
pub mod solicitante;

pub use asunto::{Asunto, NuevoAsunto};
pub use atencion::{Atencion, NuevaAtencion};
pub use entrega::{Entrega, NuevaEntrega, TipoRecogida};
pub use error::DomainError;
pub use estado::Estado;
pub use expediente::{CambiosExpediente, Expediente, NuevoExpediente};
pub use historial::{HistorialExpediente, NuevoHistorial};
pub use solicitante::{NuevoSolicitante, Solicitante, TipoSolicitante};
