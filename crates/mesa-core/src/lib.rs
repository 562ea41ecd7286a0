//! mesa-core: ciclo de vida del expediente y sus bitácoras.
//!
//! Aquí viven los cuatro registros (expedientes, historial, entregas y
//! atenciones), la consulta pública por firma de ruta, y el contrato de
//! almacenamiento (`Almacen`/`TxAlmacen`) con su backend en memoria. La
//! implementación Postgres con paridad 1:1 está en `mesa-persistence`.
pub mod almacen;
pub mod atencion;
pub mod constantes;
pub mod consulta;
pub mod entrega;
pub mod error;
pub mod historial;
pub mod modelo;
pub mod registro;
pub mod reloj;

pub use almacen::{Almacen, AlmacenError, AlmacenMemoria, TxAlmacen};
pub use atencion::{RegistroAtenciones, SolicitudAtencion};
pub use consulta::Consulta;
pub use entrega::{resolver_entregador, RegistroEntregas, SolicitudEntrega};
pub use error::CoreError;
pub use historial::{resolver_usuario, EntradaManual, RegistroHistorial};
pub use modelo::{AtencionDetallada, ConsultaExpediente, ConteoAtenciones, EntregaDetallada, ExpedienteDetallado,
                 FiltroEntregas, FiltroExpedientes, HistorialDeExpediente, Identidad, MetricasTiempo};
pub use registro::{RegistroExpedientes, SolicitudRegistro};
pub use reloj::{Reloj, RelojFijo, RelojSistema};
