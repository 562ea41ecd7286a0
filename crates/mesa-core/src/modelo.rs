//! Modelos de lectura y filtros que cruzan la frontera del core.

use chrono::NaiveDate;
use serde::Serialize;

use mesa_domain::{Asunto, Atencion, Entrega, Estado, Expediente, HistorialExpediente, Solicitante, TipoRecogida};

/// Expediente con sus relaciones resueltas, tal como lo devuelven las
/// operaciones del registro.
#[derive(Debug, Clone, Serialize)]
pub struct ExpedienteDetallado {
    pub expediente: Expediente,
    pub solicitante: Solicitante,
    pub asunto: Asunto,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntregaDetallada {
    pub entrega: Entrega,
    pub expediente: ExpedienteDetallado,
}

#[derive(Debug, Clone, Serialize)]
pub struct AtencionDetallada {
    pub atencion: Atencion,
    pub expediente: ExpedienteDetallado,
}

/// Total de atenciones registradas por colaborador.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConteoAtenciones {
    pub usuario: String,
    pub total_atenciones: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistorialDeExpediente {
    pub expediente: ExpedienteDetallado,
    pub historial: Vec<HistorialExpediente>,
}

/// Métricas de plazo que acompañan la consulta pública.
#[derive(Debug, Clone, Serialize)]
pub struct MetricasTiempo {
    pub dias_transcurridos: i64,
    pub dias_limite: i64,
    pub porcentaje_progreso: f64,
    pub proximo_vencer: bool,
    pub vencido: bool,
    pub fecha_limite_estimada: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsultaExpediente {
    pub expediente: ExpedienteDetallado,
    /// Últimas cinco entradas del historial, la más reciente primero.
    pub historial_reciente: Vec<HistorialExpediente>,
    pub tiempo: MetricasTiempo,
}

/// Filtros del listado de expedientes (todos opcionales, se combinan).
#[derive(Debug, Clone, Default)]
pub struct FiltroExpedientes {
    pub estado: Option<Estado>,
    pub estado_excluir: Option<Estado>,
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
    pub solicitante_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct FiltroEntregas {
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
    pub tipo_recogida: Option<TipoRecogida>,
    /// Coincide contra el DNI de quien recoge o el del autorizado.
    pub dni: Option<String>,
}

/// Fuentes de identidad disponibles en la frontera, en orden de precedencia.
#[derive(Debug, Clone, Default)]
pub struct Identidad {
    /// Nombre enviado explícitamente con la petición.
    pub solicitud: Option<String>,
    /// Nombre ligado a la sesión.
    pub sesion: Option<String>,
    /// Nombre del principal autenticado.
    pub autenticado: Option<String>,
}
