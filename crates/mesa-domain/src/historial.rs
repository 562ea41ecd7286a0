//! Historial de cambios de estado: bitácora inmutable del expediente.
//!
//! Cada mutación que cambia el estado produce exactamente una entrada; la
//! creación produce una entrada con `estado_anterior = None`. Las entradas
//! nunca se editan ni se borran (sólo caen en cascada con su expediente).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Expediente;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorialExpediente {
    pub id_historial: i64,
    pub expediente_id: i64,
    /// Nombre del colaborador, texto libre (no es clave foránea).
    pub usuario: String,
    pub estado_anterior: Option<String>,
    pub estado_nuevo: String,
    pub observaciones: Option<String>,
    pub fecha_cambio: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NuevoHistorial {
    pub expediente_id: i64,
    pub usuario: String,
    pub estado_anterior: Option<String>,
    pub estado_nuevo: String,
    pub observaciones: Option<String>,
    pub fecha_cambio: DateTime<Utc>,
}

impl NuevoHistorial {
    /// Entrada que acompaña el alta del expediente, dentro de la misma
    /// transacción que lo inserta.
    pub fn de_creacion(expediente: &Expediente, usuario: &str, ahora: DateTime<Utc>) -> Self {
        NuevoHistorial { expediente_id: expediente.id_expediente,
                         usuario: usuario.to_owned(),
                         estado_anterior: None,
                         estado_nuevo: expediente.estado.como_texto().to_owned(),
                         observaciones: Some(format!("Expediente registrado. Código: {}", expediente.firma_ruta)),
                         fecha_cambio: ahora }
    }

    /// Entrada de transición: compara el estado antes y después de una
    /// actualización y devuelve `None` si no cambió. Este es el reemplazo
    /// explícito del hook implícito "al guardar, comparar y registrar".
    pub fn de_transicion(antes: &Expediente,
                         despues: &Expediente,
                         usuario: &str,
                         ahora: DateTime<Utc>)
                         -> Option<Self> {
        if antes.estado == despues.estado {
            return None;
        }
        Some(NuevoHistorial { expediente_id: despues.id_expediente,
                              usuario: usuario.to_owned(),
                              estado_anterior: Some(antes.estado.como_texto().to_owned()),
                              estado_nuevo: despues.estado.como_texto().to_owned(),
                              observaciones: Some(despues.observaciones
                                                         .clone()
                                                         .unwrap_or_else(|| "Estado actualizado".to_owned())),
                              fecha_cambio: ahora })
    }
}
