//! Backend en memoria del contrato `Almacen`.
//!
//! Sirve como implementación de referencia para las pruebas y para la
//! demostración sin base de datos. La atomicidad se consigue con una copia
//! del estado al abrir la transacción: si la clausura falla, se restaura la
//! copia, de modo que el contrato de reversión es idéntico al de Postgres.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;

use mesa_domain::expediente::secuencia_de_numero;
use mesa_domain::{Asunto, Atencion, CambiosExpediente, Entrega, Expediente, HistorialExpediente, NuevaAtencion,
                  NuevaEntrega, NuevoAsunto, NuevoExpediente, NuevoHistorial, NuevoSolicitante, Solicitante};

use crate::almacen::{orden_descendente, Almacen, AlmacenError, TxAlmacen};
use crate::error::CoreError;
use crate::modelo::{AtencionDetallada, ConteoAtenciones, ExpedienteDetallado, FiltroEntregas, FiltroExpedientes};

#[derive(Debug, Clone, Default)]
struct EstadoMemoria {
    solicitantes: Vec<Solicitante>,
    asuntos: Vec<Asunto>,
    expedientes: Vec<Expediente>,
    historial: Vec<HistorialExpediente>,
    entregas: Vec<Entrega>,
    atenciones: Vec<Atencion>,
    ultimo_id_solicitante: i64,
    ultimo_id_asunto: i64,
    ultimo_id_expediente: i64,
    ultimo_id_historial: i64,
    ultimo_id_entrega: i64,
    ultimo_id_atencion: i64,
}

#[derive(Debug, Default)]
pub struct AlmacenMemoria {
    estado: Mutex<EstadoMemoria>,
}

impl AlmacenMemoria {
    pub fn nuevo() -> Self {
        Self::default()
    }
}

impl Almacen for AlmacenMemoria {
    fn transaccion<T>(&self, f: impl Fn(&mut dyn TxAlmacen) -> Result<T, CoreError>) -> Result<T, CoreError> {
        let mut guarda = match self.estado.lock() {
            Ok(g) => g,
            Err(envenenada) => envenenada.into_inner(),
        };
        let instantanea = guarda.clone();
        let resultado = f(&mut TxMemoria { estado: &mut *guarda });
        if resultado.is_err() {
            *guarda = instantanea;
        }
        resultado
    }
}

struct TxMemoria<'a> {
    estado: &'a mut EstadoMemoria,
}

impl TxMemoria<'_> {
    fn detallar(&self, expediente: Expediente) -> Result<ExpedienteDetallado, AlmacenError> {
        let solicitante = self.estado
                              .solicitantes
                              .iter()
                              .find(|s| s.id_solicitante == expediente.solicitante_id)
                              .cloned()
                              .ok_or(AlmacenError::NoEncontrado)?;
        let asunto = self.estado
                         .asuntos
                         .iter()
                         .find(|a| a.id_asunto == expediente.asunto_id)
                         .cloned()
                         .ok_or(AlmacenError::NoEncontrado)?;
        Ok(ExpedienteDetallado { expediente, solicitante, asunto })
    }

    fn existe_expediente(&self, id: i64) -> bool {
        self.estado.expedientes.iter().any(|e| e.id_expediente == id)
    }
}

impl TxAlmacen for TxMemoria<'_> {
    fn bloquear_numeracion(&mut self, _anio: i32) -> Result<(), AlmacenError> {
        // El mutex del almacén ya serializa las transacciones.
        Ok(())
    }

    fn ultimo_numero(&mut self, anio: i32) -> Result<Option<u32>, AlmacenError> {
        Ok(self.estado
               .expedientes
               .iter()
               .filter_map(|e| secuencia_de_numero(&e.num_expediente, anio))
               .max())
    }

    fn insertar_expediente(&mut self, nuevo: &NuevoExpediente) -> Result<Expediente, AlmacenError> {
        if self.estado.expedientes.iter().any(|e| e.num_expediente == nuevo.num_expediente) {
            return Err(AlmacenError::Duplicado(format!("num_expediente {}", nuevo.num_expediente)));
        }
        self.estado.ultimo_id_expediente += 1;
        let expediente = Expediente { id_expediente: self.estado.ultimo_id_expediente,
                                      num_expediente: nuevo.num_expediente.clone(),
                                      firma_ruta: nuevo.firma_ruta.clone(),
                                      solicitante_id: nuevo.solicitante_id,
                                      asunto_id: nuevo.asunto_id,
                                      fecha_recepcion: nuevo.fecha_recepcion,
                                      estado: nuevo.estado,
                                      observaciones: nuevo.observaciones.clone(),
                                      fecha_creacion: Utc::now() };
        self.estado.expedientes.push(expediente.clone());
        Ok(expediente)
    }

    fn actualizar_expediente(&mut self, id: i64, cambios: &CambiosExpediente) -> Result<Expediente, AlmacenError> {
        let expediente = self.estado
                             .expedientes
                             .iter_mut()
                             .find(|e| e.id_expediente == id)
                             .ok_or(AlmacenError::NoEncontrado)?;
        if let Some(solicitante_id) = cambios.solicitante_id {
            expediente.solicitante_id = solicitante_id;
        }
        if let Some(asunto_id) = cambios.asunto_id {
            expediente.asunto_id = asunto_id;
        }
        if let Some(fecha) = cambios.fecha_recepcion {
            expediente.fecha_recepcion = fecha;
        }
        if let Some(estado) = cambios.estado {
            expediente.estado = estado;
        }
        if let Some(observaciones) = &cambios.observaciones {
            expediente.observaciones = observaciones.clone();
        }
        Ok(expediente.clone())
    }

    fn eliminar_expediente(&mut self, id: i64) -> Result<(), AlmacenError> {
        if !self.existe_expediente(id) {
            return Err(AlmacenError::NoEncontrado);
        }
        if self.estado.entregas.iter().any(|e| e.expediente_id == id) {
            return Err(AlmacenError::Conflicto("el expediente tiene entregas asociadas".to_owned()));
        }
        self.estado.expedientes.retain(|e| e.id_expediente != id);
        // Historial y atenciones caen en cascada, como en el esquema SQL.
        self.estado.historial.retain(|h| h.expediente_id != id);
        self.estado.atenciones.retain(|a| a.id_expediente != id);
        Ok(())
    }

    fn expediente(&mut self, id: i64) -> Result<Expediente, AlmacenError> {
        self.estado
            .expedientes
            .iter()
            .find(|e| e.id_expediente == id)
            .cloned()
            .ok_or(AlmacenError::NoEncontrado)
    }

    fn expediente_por_firma(&mut self, firma_ruta: &str) -> Result<Expediente, AlmacenError> {
        self.estado
            .expedientes
            .iter()
            .find(|e| e.firma_ruta == firma_ruta)
            .cloned()
            .ok_or(AlmacenError::NoEncontrado)
    }

    fn listar_expedientes(&mut self, filtro: &FiltroExpedientes) -> Result<Vec<ExpedienteDetallado>, AlmacenError> {
        let mut filas: Vec<Expediente> =
            self.estado
                .expedientes
                .iter()
                .filter(|e| filtro.estado.is_none_or(|estado| e.estado == estado))
                .filter(|e| filtro.estado_excluir.is_none_or(|estado| e.estado != estado))
                .filter(|e| filtro.fecha_inicio.is_none_or(|desde| e.fecha_recepcion >= desde))
                .filter(|e| filtro.fecha_fin.is_none_or(|hasta| e.fecha_recepcion <= hasta))
                .filter(|e| filtro.solicitante_id.is_none_or(|id| e.solicitante_id == id))
                .cloned()
                .collect();
        filas.sort_by(|a, b| (b.fecha_recepcion, b.id_expediente).cmp(&(a.fecha_recepcion, a.id_expediente)));
        filas.into_iter().map(|e| self.detallar(e)).collect()
    }

    fn tiene_entregas(&mut self, expediente_id: i64) -> Result<bool, AlmacenError> {
        Ok(self.estado.entregas.iter().any(|e| e.expediente_id == expediente_id))
    }

    fn solicitante(&mut self, id: i64) -> Result<Solicitante, AlmacenError> {
        self.estado
            .solicitantes
            .iter()
            .find(|s| s.id_solicitante == id)
            .cloned()
            .ok_or(AlmacenError::NoEncontrado)
    }

    fn asunto(&mut self, id: i64) -> Result<Asunto, AlmacenError> {
        self.estado
            .asuntos
            .iter()
            .find(|a| a.id_asunto == id)
            .cloned()
            .ok_or(AlmacenError::NoEncontrado)
    }

    fn insertar_solicitante(&mut self, nuevo: &NuevoSolicitante) -> Result<Solicitante, AlmacenError> {
        if let Some(dni) = &nuevo.dni {
            if self.estado.solicitantes.iter().any(|s| s.dni.as_deref() == Some(dni)) {
                return Err(AlmacenError::Duplicado(format!("dni {dni}")));
            }
        }
        if let Some(codigo) = &nuevo.codigo_modular {
            if self.estado.solicitantes.iter().any(|s| s.codigo_modular.as_deref() == Some(codigo)) {
                return Err(AlmacenError::Duplicado(format!("codigo_modular {codigo}")));
            }
        }
        self.estado.ultimo_id_solicitante += 1;
        let solicitante = Solicitante { id_solicitante: self.estado.ultimo_id_solicitante,
                                        nombre_solicitante: nuevo.nombre_solicitante.clone(),
                                        dni: nuevo.dni.clone(),
                                        codigo_modular: nuevo.codigo_modular.clone(),
                                        email: nuevo.email.clone(),
                                        telefono: nuevo.telefono.clone(),
                                        tipo: nuevo.tipo };
        self.estado.solicitantes.push(solicitante.clone());
        Ok(solicitante)
    }

    fn insertar_asunto(&mut self, nuevo: &NuevoAsunto) -> Result<Asunto, AlmacenError> {
        self.estado.ultimo_id_asunto += 1;
        let asunto = Asunto { id_asunto: self.estado.ultimo_id_asunto,
                              nombre_asunto: nuevo.nombre_asunto.clone(),
                              documento_id: nuevo.documento_id,
                              activo: nuevo.activo };
        self.estado.asuntos.push(asunto.clone());
        Ok(asunto)
    }

    fn insertar_historial(&mut self, nuevo: &NuevoHistorial) -> Result<HistorialExpediente, AlmacenError> {
        if !self.existe_expediente(nuevo.expediente_id) {
            return Err(AlmacenError::Conflicto(format!("expediente {} inexistente", nuevo.expediente_id)));
        }
        self.estado.ultimo_id_historial += 1;
        let entrada = HistorialExpediente { id_historial: self.estado.ultimo_id_historial,
                                            expediente_id: nuevo.expediente_id,
                                            usuario: nuevo.usuario.clone(),
                                            estado_anterior: nuevo.estado_anterior.clone(),
                                            estado_nuevo: nuevo.estado_nuevo.clone(),
                                            observaciones: nuevo.observaciones.clone(),
                                            fecha_cambio: nuevo.fecha_cambio };
        self.estado.historial.push(entrada.clone());
        Ok(entrada)
    }

    fn historial_de_expediente(&mut self,
                               expediente_id: i64,
                               limite: Option<i64>)
                               -> Result<Vec<HistorialExpediente>, AlmacenError> {
        let mut filas: Vec<HistorialExpediente> = self.estado
                                                      .historial
                                                      .iter()
                                                      .filter(|h| h.expediente_id == expediente_id)
                                                      .cloned()
                                                      .collect();
        orden_descendente(&mut filas, |h| (h.fecha_cambio, h.id_historial));
        if let Some(limite) = limite {
            filas.truncate(limite.max(0) as usize);
        }
        Ok(filas)
    }

    fn insertar_entrega(&mut self, nueva: &NuevaEntrega) -> Result<Entrega, AlmacenError> {
        if !self.existe_expediente(nueva.expediente_id) {
            return Err(AlmacenError::Conflicto(format!("expediente {} inexistente", nueva.expediente_id)));
        }
        self.estado.ultimo_id_entrega += 1;
        let entrega = Entrega { id_entrega: self.estado.ultimo_id_entrega,
                                expediente_id: nueva.expediente_id,
                                dni_recoge: nueva.dni_recoge.clone(),
                                tipo_recogida: nueva.tipo_recogida,
                                nombre_autorizado: nueva.nombre_autorizado.clone(),
                                dni_autorizado: nueva.dni_autorizado.clone(),
                                documento_autorizacion: nueva.documento_autorizacion.clone(),
                                observaciones: nueva.observaciones.clone(),
                                fecha_entrega: nueva.fecha_entrega,
                                hora_entrega: nueva.hora_entrega,
                                dias_atencion: nueva.dias_atencion,
                                entregado_por: nueva.entregado_por.clone() };
        self.estado.entregas.push(entrega.clone());
        Ok(entrega)
    }

    fn eliminar_entrega(&mut self, id: i64) -> Result<(), AlmacenError> {
        if !self.estado.entregas.iter().any(|e| e.id_entrega == id) {
            return Err(AlmacenError::NoEncontrado);
        }
        self.estado.entregas.retain(|e| e.id_entrega != id);
        Ok(())
    }

    fn entrega(&mut self, id: i64) -> Result<Entrega, AlmacenError> {
        self.estado
            .entregas
            .iter()
            .find(|e| e.id_entrega == id)
            .cloned()
            .ok_or(AlmacenError::NoEncontrado)
    }

    fn entregas_de_expediente(&mut self, expediente_id: i64) -> Result<Vec<Entrega>, AlmacenError> {
        let mut filas: Vec<Entrega> = self.estado
                                          .entregas
                                          .iter()
                                          .filter(|e| e.expediente_id == expediente_id)
                                          .cloned()
                                          .collect();
        orden_descendente(&mut filas, |e| (e.fecha_entrega, e.id_entrega));
        Ok(filas)
    }

    fn listar_entregas(&mut self, filtro: &FiltroEntregas) -> Result<Vec<Entrega>, AlmacenError> {
        let mut filas: Vec<Entrega> =
            self.estado
                .entregas
                .iter()
                .filter(|e| filtro.fecha_inicio.is_none_or(|desde| e.fecha_entrega.date_naive() >= desde))
                .filter(|e| filtro.fecha_fin.is_none_or(|hasta| e.fecha_entrega.date_naive() <= hasta))
                .filter(|e| filtro.tipo_recogida.is_none_or(|tipo| e.tipo_recogida == tipo))
                .filter(|e| {
                    filtro.dni
                          .as_deref()
                          .is_none_or(|dni| e.dni_recoge == dni || e.dni_autorizado.as_deref() == Some(dni))
                })
                .cloned()
                .collect();
        orden_descendente(&mut filas, |e| (e.fecha_entrega, e.id_entrega));
        Ok(filas)
    }

    fn insertar_atencion(&mut self, nueva: &NuevaAtencion) -> Result<Atencion, AlmacenError> {
        if !self.existe_expediente(nueva.id_expediente) {
            return Err(AlmacenError::Conflicto(format!("expediente {} inexistente", nueva.id_expediente)));
        }
        self.estado.ultimo_id_atencion += 1;
        let atencion = Atencion { id_atencion: self.estado.ultimo_id_atencion,
                                  id_expediente: nueva.id_expediente,
                                  usuario: nueva.usuario.clone(),
                                  estado_anterior: nueva.estado_anterior.clone(),
                                  estado_nuevo: nueva.estado_nuevo.clone(),
                                  observaciones: nueva.observaciones.clone(),
                                  fecha_atencion: nueva.fecha_atencion };
        self.estado.atenciones.push(atencion.clone());
        Ok(atencion)
    }

    fn atenciones_de_expediente(&mut self, expediente_id: i64) -> Result<Vec<Atencion>, AlmacenError> {
        let mut filas: Vec<Atencion> = self.estado
                                           .atenciones
                                           .iter()
                                           .filter(|a| a.id_expediente == expediente_id)
                                           .cloned()
                                           .collect();
        orden_descendente(&mut filas, |a| (a.fecha_atencion, a.id_atencion));
        Ok(filas)
    }

    fn listar_atenciones(&mut self) -> Result<Vec<AtencionDetallada>, AlmacenError> {
        let mut filas = self.estado.atenciones.clone();
        orden_descendente(&mut filas, |a| (a.fecha_atencion, a.id_atencion));
        filas.into_iter()
             .map(|atencion| {
                 let expediente = self.estado
                                      .expedientes
                                      .iter()
                                      .find(|e| e.id_expediente == atencion.id_expediente)
                                      .cloned()
                                      .ok_or(AlmacenError::NoEncontrado)?;
                 Ok(AtencionDetallada { atencion, expediente: self.detallar(expediente)? })
             })
             .collect()
    }

    fn conteo_atenciones_por_usuario(&mut self) -> Result<Vec<ConteoAtenciones>, AlmacenError> {
        let mut conteos: BTreeMap<String, i64> = BTreeMap::new();
        for atencion in &self.estado.atenciones {
            *conteos.entry(atencion.usuario.clone()).or_insert(0) += 1;
        }
        let mut filas: Vec<ConteoAtenciones> =
            conteos.into_iter()
                   .map(|(usuario, total_atenciones)| ConteoAtenciones { usuario, total_atenciones })
                   .collect();
        filas.sort_by(|a, b| b.total_atenciones.cmp(&a.total_atenciones).then(a.usuario.cmp(&b.usuario)));
        Ok(filas)
    }
}
