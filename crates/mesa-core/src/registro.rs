//! Registro de expedientes: alta con numeración correlativa, actualización
//! parcial con bitácora de transición, búsquedas y baja administrativa.

use chrono::{Datelike, NaiveDate};
use log::{debug, info};

use mesa_domain::expediente::{formatear_firma_ruta, formatear_numero, sufijo_aleatorio};
use mesa_domain::{CambiosExpediente, Estado, NuevoExpediente, NuevoHistorial};

use crate::almacen::{Almacen, TxAlmacen};
use crate::error::{si_no_existe, CoreError};
use crate::modelo::{ExpedienteDetallado, FiltroExpedientes};
use crate::reloj::{Reloj, RelojSistema};

/// Datos de entrada del alta. El número, la firma y el estado inicial los
/// asigna el registro.
#[derive(Debug, Clone)]
pub struct SolicitudRegistro {
    pub solicitante_id: i64,
    pub asunto_id: i64,
    pub fecha_recepcion: NaiveDate,
    pub observaciones: Option<String>,
}

pub struct RegistroExpedientes<'a, A: Almacen, R: Reloj = RelojSistema> {
    almacen: &'a A,
    reloj: R,
}

impl<'a, A: Almacen> RegistroExpedientes<'a, A> {
    pub fn nuevo(almacen: &'a A) -> Self {
        RegistroExpedientes { almacen, reloj: RelojSistema }
    }
}

impl<'a, A: Almacen, R: Reloj> RegistroExpedientes<'a, A, R> {
    pub fn con_reloj(almacen: &'a A, reloj: R) -> Self {
        RegistroExpedientes { almacen, reloj }
    }

    /// Alta de un expediente: reserva la siguiente secuencia del año en
    /// curso, asigna número y firma de ruta, lo persiste en estado
    /// RECEPCIONADO y deja la entrada de creación del historial, todo en una
    /// sola transacción.
    pub fn crear(&self, solicitud: &SolicitudRegistro, usuario: &str) -> Result<ExpedienteDetallado, CoreError> {
        let ahora = self.reloj.ahora();
        let anio = ahora.year();
        self.almacen.transaccion(|tx| {
                        let solicitante =
                            tx.solicitante(solicitud.solicitante_id).map_err(|e| {
                                si_no_existe(e, || CoreError::validacion("solicitante_id", "el solicitante no existe"))
                            })?;
                        let asunto = tx.asunto(solicitud.asunto_id).map_err(|e| {
                                           si_no_existe(e, || CoreError::validacion("asunto_id", "el asunto no existe"))
                                       })?;

                        tx.bloquear_numeracion(anio)?;
                        let secuencia = tx.ultimo_numero(anio)?.map_or(1, |ultima| ultima + 1);
                        let num_expediente = formatear_numero(anio, secuencia);
                        let firma_ruta = formatear_firma_ruta(anio, secuencia, &sufijo_aleatorio());

                        let expediente = tx.insertar_expediente(&NuevoExpediente { num_expediente,
                                                                                   firma_ruta,
                                                                                   solicitante_id:
                                                                                       solicitud.solicitante_id,
                                                                                   asunto_id: solicitud.asunto_id,
                                                                                   fecha_recepcion:
                                                                                       solicitud.fecha_recepcion,
                                                                                   estado: Estado::Recepcionado,
                                                                                   observaciones:
                                                                                       solicitud.observaciones
                                                                                                .clone() })?;
                        tx.insertar_historial(&NuevoHistorial::de_creacion(&expediente, usuario, ahora))?;
                        info!("expediente {} registrado (firma {})",
                              expediente.num_expediente, expediente.firma_ruta);
                        Ok(ExpedienteDetallado { expediente, solicitante, asunto })
                    })
    }

    /// Actualización parcial. Si el estado cambia se agrega exactamente una
    /// entrada de historial con el estado anterior y el nuevo; si no cambia,
    /// ninguna.
    pub fn actualizar(&self,
                      id: i64,
                      cambios: &CambiosExpediente,
                      usuario: &str)
                      -> Result<ExpedienteDetallado, CoreError> {
        let ahora = self.reloj.ahora();
        self.almacen.transaccion(|tx| {
                        let antes = tx.expediente(id)
                                      .map_err(|e| si_no_existe(e, || CoreError::NoEncontrado("expediente".into())))?;
                        if let Some(solicitante_id) = cambios.solicitante_id {
                            tx.solicitante(solicitante_id).map_err(|e| {
                                si_no_existe(e, || CoreError::validacion("solicitante_id", "el solicitante no existe"))
                            })?;
                        }
                        if let Some(asunto_id) = cambios.asunto_id {
                            tx.asunto(asunto_id).map_err(|e| {
                                  si_no_existe(e, || CoreError::validacion("asunto_id", "el asunto no existe"))
                              })?;
                        }

                        let despues = tx.actualizar_expediente(id, cambios)?;
                        if let Some(entrada) = NuevoHistorial::de_transicion(&antes, &despues, usuario, ahora) {
                            tx.insertar_historial(&entrada)?;
                            debug!("expediente {}: {} -> {}",
                                   despues.num_expediente, antes.estado, despues.estado);
                        }
                        let solicitante = tx.solicitante(despues.solicitante_id)?;
                        let asunto = tx.asunto(despues.asunto_id)?;
                        Ok(ExpedienteDetallado { expediente: despues, solicitante, asunto })
                    })
    }

    pub fn buscar(&self, id: i64) -> Result<ExpedienteDetallado, CoreError> {
        self.almacen.transaccion(|tx| {
                        let expediente =
                            tx.expediente(id)
                              .map_err(|e| si_no_existe(e, || CoreError::NoEncontrado("expediente".into())))?;
                        let solicitante = tx.solicitante(expediente.solicitante_id)?;
                        let asunto = tx.asunto(expediente.asunto_id)?;
                        Ok(ExpedienteDetallado { expediente, solicitante, asunto })
                    })
    }

    /// Búsqueda por firma de ruta, el camino de la consulta pública.
    pub fn buscar_por_firma(&self, firma_ruta: &str) -> Result<ExpedienteDetallado, CoreError> {
        self.almacen.transaccion(|tx| {
                        let expediente =
                            tx.expediente_por_firma(firma_ruta)
                              .map_err(|e| si_no_existe(e, || CoreError::NoEncontrado("expediente".into())))?;
                        let solicitante = tx.solicitante(expediente.solicitante_id)?;
                        let asunto = tx.asunto(expediente.asunto_id)?;
                        Ok(ExpedienteDetallado { expediente, solicitante, asunto })
                    })
    }

    pub fn listar(&self, filtro: &FiltroExpedientes) -> Result<Vec<ExpedienteDetallado>, CoreError> {
        self.almacen.transaccion(|tx| Ok(tx.listar_expedientes(filtro)?))
    }

    /// Baja administrativa. Se rechaza con conflicto si el expediente ya
    /// tiene entregas registradas; el historial y las atenciones caen con él.
    pub fn eliminar(&self, id: i64) -> Result<(), CoreError> {
        self.almacen.transaccion(|tx| {
                        tx.expediente(id)
                          .map_err(|e| si_no_existe(e, || CoreError::NoEncontrado("expediente".into())))?;
                        if tx.tiene_entregas(id)? {
                            return Err(CoreError::Conflicto("el expediente tiene entregas registradas".into()));
                        }
                        tx.eliminar_expediente(id)?;
                        info!("expediente {id} eliminado");
                        Ok(())
                    })
    }
}
