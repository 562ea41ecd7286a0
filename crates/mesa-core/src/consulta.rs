//! Consulta pública por firma de ruta.
//!
//! Es el único camino pensado para el ciudadano: no exige identidad, agrega
//! métricas de plazo y deja rastro en el log de cada búsqueda, encontrada o
//! no.

use chrono::{DateTime, Days, Utc};
use log::{info, warn};

use mesa_domain::{Estado, Expediente};

use crate::almacen::{Almacen, TxAlmacen};
use crate::constantes::{DIAS_LIMITE_ATENCION, UMBRAL_PROXIMO_VENCER};
use crate::error::{si_no_existe, CoreError};
use crate::modelo::{ConsultaExpediente, ExpedienteDetallado, MetricasTiempo};
use crate::reloj::{Reloj, RelojSistema};

/// Cuántas entradas recientes del historial acompañan la respuesta.
const HISTORIAL_RECIENTE: i64 = 5;

impl MetricasTiempo {
    /// Días transcurridos (completos, nunca negativos) contra el plazo
    /// estándar. Un expediente ya entregado no vence ni está por vencer.
    pub fn calcular(expediente: &Expediente, ahora: DateTime<Utc>) -> MetricasTiempo {
        let dias_transcurridos =
            (ahora.date_naive() - expediente.fecha_recepcion).num_days().unsigned_abs() as i64;
        let entregado = expediente.estado == Estado::Entregado;
        let porcentaje = ((dias_transcurridos as f64 / DIAS_LIMITE_ATENCION as f64) * 100.0).min(100.0);
        MetricasTiempo { dias_transcurridos,
                         dias_limite: DIAS_LIMITE_ATENCION,
                         porcentaje_progreso: (porcentaje * 100.0).round() / 100.0,
                         proximo_vencer: dias_transcurridos >= UMBRAL_PROXIMO_VENCER && !entregado,
                         vencido: dias_transcurridos >= DIAS_LIMITE_ATENCION && !entregado,
                         fecha_limite_estimada: expediente.fecha_recepcion
                                                          .checked_add_days(Days::new(DIAS_LIMITE_ATENCION as u64))
                                                          .unwrap_or(expediente.fecha_recepcion) }
    }
}

pub struct Consulta<'a, A: Almacen, R: Reloj = RelojSistema> {
    almacen: &'a A,
    reloj: R,
}

impl<'a, A: Almacen> Consulta<'a, A> {
    pub fn nueva(almacen: &'a A) -> Self {
        Consulta { almacen, reloj: RelojSistema }
    }
}

impl<'a, A: Almacen, R: Reloj> Consulta<'a, A, R> {
    pub fn con_reloj(almacen: &'a A, reloj: R) -> Self {
        Consulta { almacen, reloj }
    }

    pub fn consultar(&self, firma_ruta: &str) -> Result<ConsultaExpediente, CoreError> {
        if firma_ruta.len() < 10 || firma_ruta.len() > 50 {
            return Err(CoreError::validacion("firma_ruta", "el código de seguimiento no tiene un formato válido"));
        }
        let ahora = self.reloj.ahora();
        self.almacen.transaccion(|tx| {
                        let expediente = tx.expediente_por_firma(firma_ruta).map_err(|e| {
                                               si_no_existe(e, || {
                                                   warn!("consulta pública sin resultado: {firma_ruta}");
                                                   CoreError::NoEncontrado("expediente".into())
                                               })
                                           })?;
                        let solicitante = tx.solicitante(expediente.solicitante_id)?;
                        let asunto = tx.asunto(expediente.asunto_id)?;
                        let historial_reciente =
                            tx.historial_de_expediente(expediente.id_expediente, Some(HISTORIAL_RECIENTE))?;
                        let tiempo = MetricasTiempo::calcular(&expediente, ahora);
                        info!("consulta pública: {} ({}, {} días)",
                              expediente.num_expediente, expediente.estado, tiempo.dias_transcurridos);
                        Ok(ConsultaExpediente { expediente: ExpedienteDetallado { expediente,
                                                                                  solicitante,
                                                                                  asunto },
                                                historial_reciente,
                                                tiempo })
                    })
    }
}
