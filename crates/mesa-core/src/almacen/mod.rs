//! Contrato de almacenamiento.
//!
//! `Almacen::transaccion` delimita la unidad atómica: cada operación que
//! cambia estado (alta, actualización, entrega, reversión) ejecuta todas sus
//! escrituras —registro principal más bitácora— dentro de una sola
//! transacción; si la clausura devuelve `Err`, nada queda escrito. Las
//! implementaciones deben garantizar además que la numeración por año se
//! reserva en serie (`bloquear_numeracion`), porque el cálculo
//! "máximo + 1" es una carrera si dos altas corren a la vez.

use chrono::{DateTime, Utc};
use thiserror::Error;

use mesa_domain::{Asunto, Atencion, CambiosExpediente, Entrega, Expediente, HistorialExpediente, NuevaAtencion,
                  NuevaEntrega, NuevoAsunto, NuevoExpediente, NuevoHistorial, NuevoSolicitante, Solicitante};

use crate::error::CoreError;
use crate::modelo::{AtencionDetallada, ConteoAtenciones, ExpedienteDetallado, FiltroEntregas, FiltroExpedientes};

mod memoria;

pub use memoria::AlmacenMemoria;

/// Vocabulario de fallos del almacén; el core lo traduce a su taxonomía.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlmacenError {
    #[error("registro no encontrado")]
    NoEncontrado,
    #[error("violación de unicidad: {0}")]
    Duplicado(String),
    #[error("conflicto de integridad: {0}")]
    Conflicto(String),
    #[error("fallo de almacenamiento: {0}")]
    Io(String),
}

pub trait Almacen {
    /// Ejecuta `f` como unidad atómica. `Err` revierte todas las escrituras
    /// hechas dentro de la clausura. La clausura debe ser re-ejecutable: una
    /// implementación puede reintentarla completa ante conflictos de
    /// serialización.
    fn transaccion<T>(&self, f: impl Fn(&mut dyn TxAlmacen) -> Result<T, CoreError>) -> Result<T, CoreError>;
}

/// Operaciones disponibles dentro de una transacción.
pub trait TxAlmacen {
    // -- numeración por año ------------------------------------------------
    /// Serializa la asignación de números del año frente a altas concurrentes.
    fn bloquear_numeracion(&mut self, anio: i32) -> Result<(), AlmacenError>;
    /// Mayor secuencia ya usada en el año, si existe alguna.
    fn ultimo_numero(&mut self, anio: i32) -> Result<Option<u32>, AlmacenError>;

    // -- expedientes -------------------------------------------------------
    fn insertar_expediente(&mut self, nuevo: &NuevoExpediente) -> Result<Expediente, AlmacenError>;
    fn actualizar_expediente(&mut self, id: i64, cambios: &CambiosExpediente) -> Result<Expediente, AlmacenError>;
    fn eliminar_expediente(&mut self, id: i64) -> Result<(), AlmacenError>;
    fn expediente(&mut self, id: i64) -> Result<Expediente, AlmacenError>;
    fn expediente_por_firma(&mut self, firma_ruta: &str) -> Result<Expediente, AlmacenError>;
    /// Listado con relaciones resueltas, ordenado por fecha de recepción
    /// descendente.
    fn listar_expedientes(&mut self, filtro: &FiltroExpedientes) -> Result<Vec<ExpedienteDetallado>, AlmacenError>;
    fn tiene_entregas(&mut self, expediente_id: i64) -> Result<bool, AlmacenError>;

    // -- directorios de solicitantes y asuntos -----------------------------
    fn solicitante(&mut self, id: i64) -> Result<Solicitante, AlmacenError>;
    fn asunto(&mut self, id: i64) -> Result<Asunto, AlmacenError>;
    fn insertar_solicitante(&mut self, nuevo: &NuevoSolicitante) -> Result<Solicitante, AlmacenError>;
    fn insertar_asunto(&mut self, nuevo: &NuevoAsunto) -> Result<Asunto, AlmacenError>;

    // -- historial (sólo inserción y lectura: es inmutable) ----------------
    fn insertar_historial(&mut self, nuevo: &NuevoHistorial) -> Result<HistorialExpediente, AlmacenError>;
    /// Entradas del expediente, la más reciente primero.
    fn historial_de_expediente(&mut self,
                               expediente_id: i64,
                               limite: Option<i64>)
                               -> Result<Vec<HistorialExpediente>, AlmacenError>;

    // -- entregas ----------------------------------------------------------
    fn insertar_entrega(&mut self, nueva: &NuevaEntrega) -> Result<Entrega, AlmacenError>;
    fn eliminar_entrega(&mut self, id: i64) -> Result<(), AlmacenError>;
    fn entrega(&mut self, id: i64) -> Result<Entrega, AlmacenError>;
    fn entregas_de_expediente(&mut self, expediente_id: i64) -> Result<Vec<Entrega>, AlmacenError>;
    fn listar_entregas(&mut self, filtro: &FiltroEntregas) -> Result<Vec<Entrega>, AlmacenError>;

    // -- atenciones --------------------------------------------------------
    fn insertar_atencion(&mut self, nueva: &NuevaAtencion) -> Result<Atencion, AlmacenError>;
    fn atenciones_de_expediente(&mut self, expediente_id: i64) -> Result<Vec<Atencion>, AlmacenError>;
    fn listar_atenciones(&mut self) -> Result<Vec<AtencionDetallada>, AlmacenError>;
    fn conteo_atenciones_por_usuario(&mut self) -> Result<Vec<ConteoAtenciones>, AlmacenError>;
}

/// Marca de tiempo homogénea para ordenar bitácoras descendentemente con
/// desempate estable por id.
pub(crate) fn orden_descendente<T>(filas: &mut [T], clave: impl Fn(&T) -> (DateTime<Utc>, i64)) {
    filas.sort_by(|a, b| clave(b).cmp(&clave(a)));
}
