//! Registro de atenciones: la bitácora secundaria de eventos de atención.
//!
//! Es independiente del historial formal y no se concilia con él: las
//! etiquetas de estado las aporta el operador y no se cruzan contra el
//! estado real del expediente.

use log::debug;

use mesa_domain::atencion::es_estado_de_atencion;
use mesa_domain::{Atencion, NuevaAtencion};

use crate::almacen::{Almacen, TxAlmacen};
use crate::error::{si_no_existe, CoreError};
use crate::modelo::{AtencionDetallada, ConteoAtenciones};
use crate::reloj::{Reloj, RelojSistema};

#[derive(Debug, Clone)]
pub struct SolicitudAtencion {
    pub id_expediente: i64,
    pub usuario: String,
    pub estado_anterior: String,
    pub estado_nuevo: String,
    pub observaciones: Option<String>,
}

pub struct RegistroAtenciones<'a, A: Almacen, R: Reloj = RelojSistema> {
    almacen: &'a A,
    reloj: R,
}

impl<'a, A: Almacen> RegistroAtenciones<'a, A> {
    pub fn nuevo(almacen: &'a A) -> Self {
        RegistroAtenciones { almacen, reloj: RelojSistema }
    }
}

impl<'a, A: Almacen, R: Reloj> RegistroAtenciones<'a, A, R> {
    pub fn con_reloj(almacen: &'a A, reloj: R) -> Self {
        RegistroAtenciones { almacen, reloj }
    }

    pub fn registrar(&self, solicitud: &SolicitudAtencion) -> Result<Atencion, CoreError> {
        if solicitud.usuario.trim().is_empty() {
            return Err(CoreError::validacion("usuario", "es obligatorio"));
        }
        if solicitud.estado_anterior.trim().is_empty() {
            return Err(CoreError::validacion("estado_anterior", "es obligatorio"));
        }
        if solicitud.estado_anterior.len() > 50 {
            return Err(CoreError::validacion("estado_anterior", "supera los 50 caracteres"));
        }
        if !es_estado_de_atencion(&solicitud.estado_nuevo) {
            return Err(CoreError::validacion("estado_nuevo",
                                             format!("etiqueta no admitida: {}", solicitud.estado_nuevo)));
        }
        let ahora = self.reloj.ahora();
        self.almacen.transaccion(|tx| {
                        tx.expediente(solicitud.id_expediente).map_err(|e| {
                              si_no_existe(e, || CoreError::validacion("id_expediente", "el expediente no existe"))
                          })?;
                        let atencion = tx.insertar_atencion(&NuevaAtencion { id_expediente: solicitud.id_expediente,
                                                                             usuario: solicitud.usuario.clone(),
                                                                             estado_anterior:
                                                                                 solicitud.estado_anterior.clone(),
                                                                             estado_nuevo:
                                                                                 solicitud.estado_nuevo.clone(),
                                                                             observaciones:
                                                                                 solicitud.observaciones.clone(),
                                                                             fecha_atencion: ahora })?;
                        debug!("atención registrada para expediente {} por {}",
                               solicitud.id_expediente, solicitud.usuario);
                        Ok(atencion)
                    })
    }

    /// Atenciones de un expediente, la más reciente primero.
    pub fn de_expediente(&self, id_expediente: i64) -> Result<Vec<Atencion>, CoreError> {
        self.almacen.transaccion(|tx| {
                        tx.expediente(id_expediente)
                          .map_err(|e| si_no_existe(e, || CoreError::NoEncontrado("expediente".into())))?;
                        Ok(tx.atenciones_de_expediente(id_expediente)?)
                    })
    }

    /// Bandeja global con el expediente, solicitante y asunto resueltos.
    pub fn listar_todas(&self) -> Result<Vec<AtencionDetallada>, CoreError> {
        self.almacen.transaccion(|tx| Ok(tx.listar_atenciones()?))
    }

    /// Totales por colaborador, de mayor a menor.
    pub fn conteo_por_usuario(&self) -> Result<Vec<ConteoAtenciones>, CoreError> {
        self.almacen.transaccion(|tx| Ok(tx.conteo_atenciones_por_usuario()?))
    }
}
