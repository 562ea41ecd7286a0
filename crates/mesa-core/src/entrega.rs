//! Registro de entregas: el cierre del ciclo del expediente.
//!
//! La entrega sólo procede sobre un expediente LISTO PARA ENTREGA; inserta
//! el acta, anexa la nota a las observaciones del expediente, lo pasa a
//! ENTREGADO y deja la entrada de historial correspondiente, todo como una
//! sola unidad atómica. La eliminación (corrección administrativa) revierte
//! el estado con la misma disciplina.

use log::info;

use mesa_domain::entrega::{dias_atencion, es_dni_valido, nota_entrega};
use mesa_domain::{CambiosExpediente, Entrega, Estado, NuevaEntrega, NuevoHistorial, TipoRecogida};

use crate::almacen::{Almacen, TxAlmacen};
use crate::constantes::ENTREGADOR_DEFECTO;
use crate::error::{si_no_existe, CoreError};
use crate::modelo::{EntregaDetallada, ExpedienteDetallado, FiltroEntregas};
use crate::reloj::{Reloj, RelojSistema};

/// Resuelve el nombre del funcionario que entrega: el valor explícito de la
/// petición, si no el principal autenticado, y en último término el
/// genérico institucional.
pub fn resolver_entregador(explicito: Option<&str>, autenticado: Option<&str>) -> String {
    [explicito, autenticado].into_iter()
                            .flatten()
                            .map(str::trim)
                            .find(|nombre| !nombre.is_empty())
                            .unwrap_or(ENTREGADOR_DEFECTO)
                            .to_owned()
}

#[derive(Debug, Clone)]
pub struct SolicitudEntrega {
    pub expediente_id: i64,
    pub dni_recoge: String,
    pub tipo_recogida: TipoRecogida,
    pub nombre_autorizado: Option<String>,
    pub dni_autorizado: Option<String>,
    /// Referencia al PDF de autorización ya almacenado fuera del sistema.
    pub documento_autorizacion: Option<String>,
    pub observaciones: Option<String>,
}

pub struct RegistroEntregas<'a, A: Almacen, R: Reloj = RelojSistema> {
    almacen: &'a A,
    reloj: R,
}

impl<'a, A: Almacen> RegistroEntregas<'a, A> {
    pub fn nuevo(almacen: &'a A) -> Self {
        RegistroEntregas { almacen, reloj: RelojSistema }
    }
}

impl<'a, A: Almacen, R: Reloj> RegistroEntregas<'a, A, R> {
    pub fn con_reloj(almacen: &'a A, reloj: R) -> Self {
        RegistroEntregas { almacen, reloj }
    }

    /// Registra la entrega. `entregado_por` llega ya resuelto desde la
    /// frontera (ver [`resolver_entregador`]).
    pub fn registrar(&self, solicitud: &SolicitudEntrega, entregado_por: &str) -> Result<EntregaDetallada, CoreError> {
        if !es_dni_valido(&solicitud.dni_recoge) {
            return Err(CoreError::validacion("dni_recoge", "debe tener 8 dígitos"));
        }
        let (nombre_autorizado, dni_autorizado) = match solicitud.tipo_recogida {
            TipoRecogida::Tercero => {
                let nombre = solicitud.nombre_autorizado
                                      .as_deref()
                                      .map(str::trim)
                                      .filter(|n| !n.is_empty())
                                      .ok_or_else(|| {
                                          CoreError::validacion("nombre_autorizado",
                                                                "es obligatorio cuando recoge un tercero")
                                      })?;
                if nombre.len() > 255 {
                    return Err(CoreError::validacion("nombre_autorizado", "supera los 255 caracteres"));
                }
                let dni = solicitud.dni_autorizado.as_deref().ok_or_else(|| {
                              CoreError::validacion("dni_autorizado", "es obligatorio cuando recoge un tercero")
                          })?;
                if !es_dni_valido(dni) {
                    return Err(CoreError::validacion("dni_autorizado", "debe tener 8 dígitos"));
                }
                (Some(nombre.to_owned()), Some(dni.to_owned()))
            }
            // Recoge el titular: los datos de autorizado se descartan aunque
            // vengan en la solicitud.
            TipoRecogida::Titular => (None, None),
        };

        let ahora = self.reloj.ahora();
        self.almacen.transaccion(|tx| {
            let expediente = tx.expediente(solicitud.expediente_id)
                               .map_err(|e| si_no_existe(e, || CoreError::NoEncontrado("expediente".into())))?;
            if expediente.estado != Estado::ListoParaEntrega {
                return Err(CoreError::Conflicto(format!(
                    "el expediente no está listo para entrega (estado actual: {})",
                    expediente.estado
                )));
            }

            let dias = dias_atencion(expediente.fecha_recepcion, ahora);
            let entrega = tx.insertar_entrega(&NuevaEntrega { expediente_id: expediente.id_expediente,
                                                              dni_recoge: solicitud.dni_recoge.clone(),
                                                              tipo_recogida: solicitud.tipo_recogida,
                                                              nombre_autorizado: nombre_autorizado.clone(),
                                                              dni_autorizado: dni_autorizado.clone(),
                                                              documento_autorizacion:
                                                                  solicitud.documento_autorizacion.clone(),
                                                              observaciones: solicitud.observaciones.clone(),
                                                              fecha_entrega: ahora,
                                                              hora_entrega: ahora.time(),
                                                              dias_atencion: dias,
                                                              entregado_por: entregado_por.to_owned() })?;

            let nota = nota_entrega(expediente.observaciones.as_deref(),
                                    ahora,
                                    entrega.tipo_recogida,
                                    entrega.dni_efectivo(),
                                    entregado_por,
                                    solicitud.observaciones.as_deref());
            let cambios = CambiosExpediente { estado: Some(Estado::Entregado),
                                              observaciones: Some(Some(nota)),
                                              ..Default::default() };
            let actualizado = tx.actualizar_expediente(expediente.id_expediente, &cambios)?;
            if let Some(entrada) = NuevoHistorial::de_transicion(&expediente, &actualizado, entregado_por, ahora) {
                tx.insertar_historial(&entrada)?;
            }

            let solicitante = tx.solicitante(actualizado.solicitante_id)?;
            let asunto = tx.asunto(actualizado.asunto_id)?;
            info!("entrega registrada para expediente {} ({} días de atención)",
                  actualizado.num_expediente, dias);
            Ok(EntregaDetallada { entrega,
                                  expediente: ExpedienteDetallado { expediente: actualizado, solicitante, asunto } })
        })
    }

    /// Corrección administrativa: revierte el expediente a LISTO PARA
    /// ENTREGA (con su entrada de historial de transición) y elimina el
    /// acta, atómicamente.
    pub fn eliminar(&self, id: i64, usuario: &str) -> Result<(), CoreError> {
        let ahora = self.reloj.ahora();
        self.almacen.transaccion(|tx| {
                        let entrega = tx.entrega(id)
                                        .map_err(|e| si_no_existe(e, || CoreError::NoEncontrado("entrega".into())))?;
                        let antes = tx.expediente(entrega.expediente_id)?;
                        let despues = tx.actualizar_expediente(entrega.expediente_id,
                                                               &CambiosExpediente::solo_estado(Estado::ListoParaEntrega))?;
                        if let Some(entrada) = NuevoHistorial::de_transicion(&antes, &despues, usuario, ahora) {
                            tx.insertar_historial(&entrada)?;
                        }
                        tx.eliminar_entrega(id)?;
                        info!("entrega {id} eliminada; expediente {} revertido", despues.num_expediente);
                        Ok(())
                    })
    }

    pub fn buscar(&self, id: i64) -> Result<Entrega, CoreError> {
        self.almacen.transaccion(|tx| {
                        tx.entrega(id)
                          .map_err(|e| si_no_existe(e, || CoreError::NoEncontrado("entrega".into())))
                    })
    }

    pub fn de_expediente(&self, expediente_id: i64) -> Result<Vec<Entrega>, CoreError> {
        self.almacen.transaccion(|tx| Ok(tx.entregas_de_expediente(expediente_id)?))
    }

    pub fn listar(&self, filtro: &FiltroEntregas) -> Result<Vec<Entrega>, CoreError> {
        self.almacen.transaccion(|tx| Ok(tx.listar_entregas(filtro)?))
    }
}
