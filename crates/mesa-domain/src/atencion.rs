//! Atención: bitácora secundaria de eventos de atención.
//!
//! Corre en paralelo al historial formal y es deliberadamente más laxa: los
//! estados son etiquetas de texto provistas por el operador y no se validan
//! contra el estado real del expediente.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Etiquetas admitidas como estado nuevo de una atención (todas las del
/// ciclo salvo RECEPCIONADO, que sólo asigna el alta).
pub const ESTADOS_ATENCION: [&str; 4] = ["EN PROCESO", "OBSERVADO", "LISTO PARA ENTREGA", "ENTREGADO"];

pub fn es_estado_de_atencion(etiqueta: &str) -> bool {
    ESTADOS_ATENCION.contains(&etiqueta)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atencion {
    pub id_atencion: i64,
    pub id_expediente: i64,
    pub usuario: String,
    pub estado_anterior: String,
    pub estado_nuevo: String,
    pub observaciones: Option<String>,
    pub fecha_atencion: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NuevaAtencion {
    pub id_expediente: i64,
    pub usuario: String,
    pub estado_anterior: String,
    pub estado_nuevo: String,
    pub observaciones: Option<String>,
    pub fecha_atencion: DateTime<Utc>,
}
