//! Expediente administrativo y numeración correlativa.
//!
//! El número (`YYYY-NNNN`) es correlativo por año calendario; la firma de
//! ruta (`UGEL-YYYY-NNNN-XXXX`) agrega un sufijo aleatorio de 4 caracteres
//! alfanuméricos en mayúscula y es el código con el que el ciudadano
//! consulta su trámite.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Estado;

/// Prefijo institucional de la firma de ruta.
pub const PREFIJO_FIRMA: &str = "UGEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expediente {
    pub id_expediente: i64,
    pub num_expediente: String,
    pub firma_ruta: String,
    pub solicitante_id: i64,
    pub asunto_id: i64,
    pub fecha_recepcion: NaiveDate,
    pub estado: Estado,
    pub observaciones: Option<String>,
    pub fecha_creacion: DateTime<Utc>,
}

/// Datos de inserción; el número y la firma ya vienen asignados por el
/// registro dentro de la misma transacción que reservó la secuencia.
#[derive(Debug, Clone)]
pub struct NuevoExpediente {
    pub num_expediente: String,
    pub firma_ruta: String,
    pub solicitante_id: i64,
    pub asunto_id: i64,
    pub fecha_recepcion: NaiveDate,
    pub estado: Estado,
    pub observaciones: Option<String>,
}

/// Actualización parcial. `observaciones` distingue entre "no tocar"
/// (None) y "asignar/limpiar" (Some(..)).
#[derive(Debug, Clone, Default)]
pub struct CambiosExpediente {
    pub solicitante_id: Option<i64>,
    pub asunto_id: Option<i64>,
    pub fecha_recepcion: Option<NaiveDate>,
    pub estado: Option<Estado>,
    pub observaciones: Option<Option<String>>,
}

impl CambiosExpediente {
    pub fn solo_estado(estado: Estado) -> Self {
        CambiosExpediente { estado: Some(estado), ..Default::default() }
    }
}

/// `{año}-{secuencia:04}`, p. ej. `2026-0001`.
pub fn formatear_numero(anio: i32, secuencia: u32) -> String {
    format!("{anio}-{secuencia:04}")
}

/// `UGEL-{año}-{secuencia:04}-{sufijo}`, p. ej. `UGEL-2026-0001-K7P2`.
pub fn formatear_firma_ruta(anio: i32, secuencia: u32, sufijo: &str) -> String {
    format!("{PREFIJO_FIRMA}-{anio}-{secuencia:04}-{sufijo}")
}

/// Extrae la secuencia de un `num_expediente` si pertenece al año dado.
/// Devuelve `None` para números de otros años o con sufijo no numérico.
pub fn secuencia_de_numero(num_expediente: &str, anio: i32) -> Option<u32> {
    let resto = num_expediente.strip_prefix(&format!("{anio}-"))?;
    resto.parse().ok()
}

const ALFABETO_SUFIJO: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Sufijo aleatorio de 4 caracteres `[A-Z0-9]` derivado de un UUID v4
/// (la fuente de aleatoriedad ya presente en el stack).
pub fn sufijo_aleatorio() -> String {
    Uuid::new_v4().as_bytes()[..4]
                  .iter()
                  .map(|b| ALFABETO_SUFIJO[(*b as usize) % ALFABETO_SUFIJO.len()] as char)
                  .collect()
}
