//! Lectura del historial y la vía de inserción manual.
//!
//! Las entradas normales no se insertan por aquí: las produce el registro de
//! expedientes junto con cada alta o cambio de estado. Este módulo expone la
//! lectura ordenada y el camino manual que el área administrativa usa para
//! anotar correcciones.

use log::debug;

use mesa_domain::{HistorialExpediente, NuevoHistorial};

use crate::almacen::{Almacen, TxAlmacen};
use crate::constantes::USUARIO_SISTEMA;
use crate::error::{si_no_existe, CoreError};
use crate::modelo::{ExpedienteDetallado, HistorialDeExpediente, Identidad};
use crate::reloj::{Reloj, RelojSistema};

/// Resuelve el nombre del actor con la precedencia observada en producción:
/// nombre enviado con la petición, luego el de la sesión, luego el del
/// principal autenticado, y `"Sistema"` como último recurso. Se invoca una
/// sola vez en la frontera; los servicios reciben el nombre ya resuelto.
pub fn resolver_usuario(identidad: &Identidad) -> String {
    [&identidad.solicitud, &identidad.sesion, &identidad.autenticado].into_iter()
                                                                     .flatten()
                                                                     .map(|nombre| nombre.trim())
                                                                     .find(|nombre| !nombre.is_empty())
                                                                     .unwrap_or(USUARIO_SISTEMA)
                                                                     .to_owned()
}

/// Entrada manual del historial (correcciones administrativas).
#[derive(Debug, Clone)]
pub struct EntradaManual {
    pub expediente_id: i64,
    pub usuario: String,
    pub estado_nuevo: String,
    pub estado_anterior: Option<String>,
    pub observaciones: Option<String>,
}

pub struct RegistroHistorial<'a, A: Almacen, R: Reloj = RelojSistema> {
    almacen: &'a A,
    reloj: R,
}

impl<'a, A: Almacen> RegistroHistorial<'a, A> {
    pub fn nuevo(almacen: &'a A) -> Self {
        RegistroHistorial { almacen, reloj: RelojSistema }
    }
}

impl<'a, A: Almacen, R: Reloj> RegistroHistorial<'a, A, R> {
    pub fn con_reloj(almacen: &'a A, reloj: R) -> Self {
        RegistroHistorial { almacen, reloj }
    }

    /// Historial completo de un expediente, el cambio más reciente primero,
    /// junto con el expediente resuelto.
    pub fn de_expediente(&self, expediente_id: i64) -> Result<HistorialDeExpediente, CoreError> {
        self.almacen.transaccion(|tx| {
                        let expediente =
                            tx.expediente(expediente_id)
                              .map_err(|e| si_no_existe(e, || CoreError::NoEncontrado("expediente".into())))?;
                        let solicitante = tx.solicitante(expediente.solicitante_id)?;
                        let asunto = tx.asunto(expediente.asunto_id)?;
                        let historial = tx.historial_de_expediente(expediente_id, None)?;
                        Ok(HistorialDeExpediente { expediente: ExpedienteDetallado { expediente,
                                                                                     solicitante,
                                                                                     asunto },
                                                   historial })
                    })
    }

    pub fn insertar_manual(&self, entrada: &EntradaManual) -> Result<HistorialExpediente, CoreError> {
        if entrada.usuario.trim().is_empty() {
            return Err(CoreError::validacion("usuario", "es obligatorio"));
        }
        if entrada.usuario.len() > 255 {
            return Err(CoreError::validacion("usuario", "supera los 255 caracteres"));
        }
        if entrada.estado_nuevo.trim().is_empty() {
            return Err(CoreError::validacion("estado_nuevo", "es obligatorio"));
        }
        if entrada.estado_nuevo.len() > 50 {
            return Err(CoreError::validacion("estado_nuevo", "supera los 50 caracteres"));
        }
        if entrada.estado_anterior.as_deref().is_some_and(|e| e.len() > 50) {
            return Err(CoreError::validacion("estado_anterior", "supera los 50 caracteres"));
        }
        let ahora = self.reloj.ahora();
        self.almacen.transaccion(|tx| {
                        tx.expediente(entrada.expediente_id).map_err(|e| {
                              si_no_existe(e, || CoreError::validacion("expediente_id", "el expediente no existe"))
                          })?;
                        let fila = tx.insertar_historial(&NuevoHistorial { expediente_id: entrada.expediente_id,
                                                                           usuario: entrada.usuario.clone(),
                                                                           estado_anterior:
                                                                               entrada.estado_anterior.clone(),
                                                                           estado_nuevo: entrada.estado_nuevo.clone(),
                                                                           observaciones:
                                                                               entrada.observaciones.clone(),
                                                                           fecha_cambio: ahora })?;
                        debug!("historial manual para expediente {}", entrada.expediente_id);
                        Ok(fila)
                    })
    }
}
