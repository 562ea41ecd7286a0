//! Implementación Postgres (Diesel) del contrato `Almacen`.
//!
//! Objetivo del módulo:
//! - Paridad 1:1 con el backend en memoria: mismas unidades atómicas, misma
//!   semántica de reversión.
//! - La numeración correlativa por año se serializa con
//!   `pg_advisory_xact_lock`, de modo que dos altas concurrentes nunca
//!   calculen la misma secuencia ("máximo + 1" sin bloqueo es una carrera).
//! - Aislar por completo el mapeo dominio ↔ filas de DB del `mesa-core`.
//! - Manejo básico de errores transitorios: la unidad de trabajo completa se
//!   reintenta con backoff ante deadlocks y conflictos de serialización.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::result::Error as DieselError;
use diesel::sql_types::Integer;
use log::{debug, error, warn};

use mesa_core::modelo::{AtencionDetallada, ConteoAtenciones, ExpedienteDetallado, FiltroEntregas, FiltroExpedientes};
use mesa_core::{Almacen, AlmacenError, CoreError, TxAlmacen};
use mesa_domain::expediente::secuencia_de_numero;
use mesa_domain::{Asunto, Atencion, CambiosExpediente, Entrega, Estado, Expediente, HistorialExpediente,
                  NuevaAtencion, NuevaEntrega, NuevoAsunto, NuevoExpediente, NuevoHistorial, NuevoSolicitante,
                  Solicitante, TipoRecogida, TipoSolicitante};

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{asuntos, atenciones, entregas, expedientes, historial_expediente, solicitante};

/// Alias para el pool r2d2 de conexiones Postgres.
///
/// Al construirlo se corre automáticamente el set de migraciones pendientes
/// (una sola vez).
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real (producción/tests de integración) o
/// factorear en tests unitarios sin acoplar a r2d2.
pub trait ProveedorConexiones: Send + Sync + 'static {
    /// Obtiene una conexión lista para ejecutar consultas Diesel.
    fn conexion(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

/// Implementación concreta de `ProveedorConexiones` respaldada por un
/// `PgPool`.
pub struct ProveedorPool {
    pub pool: PgPool,
}

impl ProveedorConexiones for ProveedorPool {
    fn conexion(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Clave alta del bloqueo consultivo de numeración; la clave baja es el año.
const CLAVE_NUMERACION: i32 = 0x4D45_5341; // "MESA"

// ---------------------------------------------------------------------------
// Filas Diesel y mapeo hacia el dominio
// ---------------------------------------------------------------------------

#[derive(Queryable, Debug)]
struct FilaSolicitante {
    id_solicitante: i64,
    nombre_solicitante: String,
    dni: Option<String>,
    codigo_modular: Option<String>,
    email: Option<String>,
    telefono: Option<String>,
    nombre_tipo: String,
}

impl FilaSolicitante {
    fn a_dominio(self) -> Result<Solicitante, AlmacenError> {
        let tipo = match self.nombre_tipo.as_str() {
            "Natural" => TipoSolicitante::Natural,
            "Jurídica" => TipoSolicitante::Juridica,
            otro => {
                return Err(AlmacenError::Io(format!("tipo de solicitante no reconocido en fila {}: {otro}",
                                                    self.id_solicitante)))
            }
        };
        Ok(Solicitante { id_solicitante: self.id_solicitante,
                         nombre_solicitante: self.nombre_solicitante,
                         dni: self.dni,
                         codigo_modular: self.codigo_modular,
                         email: self.email,
                         telefono: self.telefono,
                         tipo })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = solicitante)]
struct NuevaFilaSolicitante<'a> {
    nombre_solicitante: &'a str,
    dni: Option<&'a str>,
    codigo_modular: Option<&'a str>,
    email: Option<&'a str>,
    telefono: Option<&'a str>,
    nombre_tipo: &'a str,
}

#[derive(Queryable, Debug)]
struct FilaAsunto {
    id_asunto: i64,
    nombre_asunto: String,
    documento_id: i64,
    activo: bool,
}

impl FilaAsunto {
    fn a_dominio(self) -> Asunto {
        Asunto { id_asunto: self.id_asunto,
                 nombre_asunto: self.nombre_asunto,
                 documento_id: self.documento_id,
                 activo: self.activo }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = asuntos)]
struct NuevaFilaAsunto<'a> {
    nombre_asunto: &'a str,
    documento_id: i64,
    activo: bool,
}

#[derive(Queryable, Debug)]
struct FilaExpediente {
    id_expediente: i64,
    num_expediente: String,
    firma_ruta: String,
    solicitante_id: i64,
    asunto_id: i64,
    fecha_recepcion: NaiveDate,
    estado: String,
    observaciones: Option<String>,
    fecha_creacion: DateTime<Utc>,
}

impl FilaExpediente {
    fn a_dominio(self) -> Result<Expediente, AlmacenError> {
        let estado = self.estado.parse::<Estado>().map_err(|_| {
                         AlmacenError::Io(format!("estado no reconocido en expediente {}: {}",
                                                  self.id_expediente, self.estado))
                     })?;
        Ok(Expediente { id_expediente: self.id_expediente,
                        num_expediente: self.num_expediente,
                        firma_ruta: self.firma_ruta,
                        solicitante_id: self.solicitante_id,
                        asunto_id: self.asunto_id,
                        fecha_recepcion: self.fecha_recepcion,
                        estado,
                        observaciones: self.observaciones,
                        fecha_creacion: self.fecha_creacion })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = expedientes)]
struct NuevaFilaExpediente<'a> {
    num_expediente: &'a str,
    firma_ruta: &'a str,
    solicitante_id: i64,
    asunto_id: i64,
    fecha_recepcion: NaiveDate,
    estado: &'a str,
    observaciones: Option<&'a str>,
}

/// Cambios parciales; `None` externo no toca la columna, `Some(None)` en
/// `observaciones` la pone en NULL.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = expedientes)]
struct FilaCambiosExpediente<'a> {
    solicitante_id: Option<i64>,
    asunto_id: Option<i64>,
    fecha_recepcion: Option<NaiveDate>,
    estado: Option<&'a str>,
    observaciones: Option<Option<&'a str>>,
}

impl<'a> FilaCambiosExpediente<'a> {
    fn de(cambios: &'a CambiosExpediente) -> Self {
        FilaCambiosExpediente { solicitante_id: cambios.solicitante_id,
                                asunto_id: cambios.asunto_id,
                                fecha_recepcion: cambios.fecha_recepcion,
                                estado: cambios.estado.map(|e| e.como_texto()),
                                observaciones: cambios.observaciones.as_ref().map(|o| o.as_deref()) }
    }

    fn es_vacio(&self) -> bool {
        self.solicitante_id.is_none()
        && self.asunto_id.is_none()
        && self.fecha_recepcion.is_none()
        && self.estado.is_none()
        && self.observaciones.is_none()
    }
}

#[derive(Queryable, Debug)]
struct FilaHistorial {
    id_historial: i64,
    expediente_id: i64,
    usuario: String,
    estado_anterior: Option<String>,
    estado_nuevo: String,
    observaciones: Option<String>,
    fecha_cambio: DateTime<Utc>,
}

impl FilaHistorial {
    fn a_dominio(self) -> HistorialExpediente {
        HistorialExpediente { id_historial: self.id_historial,
                              expediente_id: self.expediente_id,
                              usuario: self.usuario,
                              estado_anterior: self.estado_anterior,
                              estado_nuevo: self.estado_nuevo,
                              observaciones: self.observaciones,
                              fecha_cambio: self.fecha_cambio }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = historial_expediente)]
struct NuevaFilaHistorial<'a> {
    expediente_id: i64,
    usuario: &'a str,
    estado_anterior: Option<&'a str>,
    estado_nuevo: &'a str,
    observaciones: Option<&'a str>,
    fecha_cambio: DateTime<Utc>,
}

#[derive(Queryable, Debug)]
struct FilaEntrega {
    id_entrega: i64,
    expediente_id: i64,
    dni_recoge: String,
    tipo_recogida: String,
    nombre_autorizado: Option<String>,
    dni_autorizado: Option<String>,
    documento_autorizacion: Option<String>,
    observaciones: Option<String>,
    fecha_entrega: DateTime<Utc>,
    hora_entrega: NaiveTime,
    dias_atencion: i32,
    entregado_por: String,
}

impl FilaEntrega {
    fn a_dominio(self) -> Result<Entrega, AlmacenError> {
        let tipo_recogida = self.tipo_recogida.parse::<TipoRecogida>().map_err(|_| {
                                AlmacenError::Io(format!("tipo de recogida no reconocido en entrega {}: {}",
                                                         self.id_entrega, self.tipo_recogida))
                            })?;
        Ok(Entrega { id_entrega: self.id_entrega,
                     expediente_id: self.expediente_id,
                     dni_recoge: self.dni_recoge,
                     tipo_recogida,
                     nombre_autorizado: self.nombre_autorizado,
                     dni_autorizado: self.dni_autorizado,
                     documento_autorizacion: self.documento_autorizacion,
                     observaciones: self.observaciones,
                     fecha_entrega: self.fecha_entrega,
                     hora_entrega: self.hora_entrega,
                     dias_atencion: self.dias_atencion,
                     entregado_por: self.entregado_por })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = entregas)]
struct NuevaFilaEntrega<'a> {
    expediente_id: i64,
    dni_recoge: &'a str,
    tipo_recogida: &'a str,
    nombre_autorizado: Option<&'a str>,
    dni_autorizado: Option<&'a str>,
    documento_autorizacion: Option<&'a str>,
    observaciones: Option<&'a str>,
    fecha_entrega: DateTime<Utc>,
    hora_entrega: NaiveTime,
    dias_atencion: i32,
    entregado_por: &'a str,
}

#[derive(Queryable, Debug)]
struct FilaAtencion {
    id_atencion: i64,
    id_expediente: i64,
    usuario: String,
    estado_anterior: String,
    estado_nuevo: String,
    observaciones: Option<String>,
    fecha_atencion: DateTime<Utc>,
}

impl FilaAtencion {
    fn a_dominio(self) -> Atencion {
        Atencion { id_atencion: self.id_atencion,
                   id_expediente: self.id_expediente,
                   usuario: self.usuario,
                   estado_anterior: self.estado_anterior,
                   estado_nuevo: self.estado_nuevo,
                   observaciones: self.observaciones,
                   fecha_atencion: self.fecha_atencion }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = atenciones)]
struct NuevaFilaAtencion<'a> {
    id_expediente: i64,
    usuario: &'a str,
    estado_anterior: &'a str,
    estado_nuevo: &'a str,
    observaciones: Option<&'a str>,
    fecha_atencion: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Reintento ante fallos transitorios
// ---------------------------------------------------------------------------

/// Determina si un error amerita reintentar la unidad de trabajo.
///
/// Cubre deadlocks, conflictos de serialización y errores de conexión/pool,
/// detectados por texto (best-effort, sin acoplar a SQLSTATE).
fn es_transitorio(e: &CoreError) -> bool {
    match e {
        CoreError::Almacen(mensaje) => {
            let m = mensaje.to_lowercase();
            m.contains("deadlock")
            || m.contains("serializ")
            || m.contains("connection")
            || m.contains("conexion")
            || m.contains("conexión")
            || m.contains("timeout")
            || m.contains("pool")
        }
        _ => false,
    }
}

/// Reintento simple con backoff muy pequeño (hasta 3 intentos: 15/30/45 ms).
/// No altera semántica de negocio; sólo repite la unidad completa provista
/// por `f`, que debe ser re-ejecutable.
fn con_reintento<T>(mut f: impl FnMut() -> Result<T, CoreError>) -> Result<T, CoreError> {
    let mut intentos = 0;
    loop {
        match f() {
            Err(e) if es_transitorio(&e) && intentos < 3 => {
                let espera_ms = 15 * (intentos + 1) as u64;
                warn!("error transitorio (intento {}): {e}; esperando {espera_ms}ms", intentos + 1);
                std::thread::sleep(std::time::Duration::from_millis(espera_ms));
                intentos += 1;
            }
            r => return r,
        }
    }
}

fn mapear(e: DieselError) -> AlmacenError {
    AlmacenError::from(PersistenceError::from(e))
}

// ---------------------------------------------------------------------------
// Almacén Postgres
// ---------------------------------------------------------------------------

/// Error interno del cierre transaccional: distingue el fallo del dominio
/// del fallo de Diesel para que `run` pueda revertir en ambos casos.
enum FalloTx {
    Core(CoreError),
    Diesel(DieselError),
}

impl From<DieselError> for FalloTx {
    fn from(e: DieselError) -> Self {
        FalloTx::Diesel(e)
    }
}

pub struct AlmacenPg<P: ProveedorConexiones> {
    proveedor: P,
}

impl<P: ProveedorConexiones> AlmacenPg<P> {
    pub fn nuevo(proveedor: P) -> Self {
        AlmacenPg { proveedor }
    }
}

impl<P: ProveedorConexiones> Almacen for AlmacenPg<P> {
    fn transaccion<T>(&self, f: impl Fn(&mut dyn TxAlmacen) -> Result<T, CoreError>) -> Result<T, CoreError> {
        con_reintento(|| {
            let mut conexion = self.proveedor.conexion().map_err(|e| {
                                   error!("sin conexión al almacén: {e}");
                                   CoreError::Almacen(e.to_string())
                               })?;
            conexion.build_transaction()
                    .read_write()
                    .run(|tx_conn| f(&mut TxPg { conexion: tx_conn }).map_err(FalloTx::Core))
                    .map_err(|fallo| match fallo {
                        FalloTx::Core(e) => e,
                        FalloTx::Diesel(e) => {
                            let persistencia = PersistenceError::from(e);
                            error!("transacción abortada: {persistencia}");
                            CoreError::Almacen(persistencia.to_string())
                        }
                    })
        })
    }
}

struct TxPg<'a> {
    conexion: &'a mut PgConnection,
}

impl TxAlmacen for TxPg<'_> {
    fn bloquear_numeracion(&mut self, anio: i32) -> Result<(), AlmacenError> {
        debug!("bloqueo de numeración para el año {anio}");
        diesel::sql_query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind::<Integer, _>(CLAVE_NUMERACION)
            .bind::<Integer, _>(anio)
            .execute(self.conexion)
            .map(|_| ())
            .map_err(mapear)
    }

    fn ultimo_numero(&mut self, anio: i32) -> Result<Option<u32>, AlmacenError> {
        // El relleno a 4 dígitos hace que el máximo lexicográfico del prefijo
        // del año coincida con el máximo numérico.
        let ultimo: Option<String> = expedientes::table.filter(expedientes::num_expediente.like(format!("{anio}-%")))
                                                       .order(expedientes::num_expediente.desc())
                                                       .select(expedientes::num_expediente)
                                                       .first(self.conexion)
                                                       .optional()
                                                       .map_err(mapear)?;
        Ok(ultimo.and_then(|num| secuencia_de_numero(&num, anio)))
    }

    fn insertar_expediente(&mut self, nuevo: &NuevoExpediente) -> Result<Expediente, AlmacenError> {
        let fila = NuevaFilaExpediente { num_expediente: &nuevo.num_expediente,
                                         firma_ruta: &nuevo.firma_ruta,
                                         solicitante_id: nuevo.solicitante_id,
                                         asunto_id: nuevo.asunto_id,
                                         fecha_recepcion: nuevo.fecha_recepcion,
                                         estado: nuevo.estado.como_texto(),
                                         observaciones: nuevo.observaciones.as_deref() };
        diesel::insert_into(expedientes::table).values(&fila)
                                               .get_result::<FilaExpediente>(self.conexion)
                                               .map_err(mapear)?
                                               .a_dominio()
    }

    fn actualizar_expediente(&mut self, id: i64, cambios: &CambiosExpediente) -> Result<Expediente, AlmacenError> {
        let fila = FilaCambiosExpediente::de(cambios);
        if fila.es_vacio() {
            return self.expediente(id);
        }
        diesel::update(expedientes::table.find(id)).set(&fila)
                                                   .get_result::<FilaExpediente>(self.conexion)
                                                   .map_err(mapear)?
                                                   .a_dominio()
    }

    fn eliminar_expediente(&mut self, id: i64) -> Result<(), AlmacenError> {
        let eliminadas = diesel::delete(expedientes::table.find(id)).execute(self.conexion)
                                                                    .map_err(mapear)?;
        if eliminadas == 0 {
            return Err(AlmacenError::NoEncontrado);
        }
        Ok(())
    }

    fn expediente(&mut self, id: i64) -> Result<Expediente, AlmacenError> {
        expedientes::table.find(id)
                          .first::<FilaExpediente>(self.conexion)
                          .map_err(mapear)?
                          .a_dominio()
    }

    fn expediente_por_firma(&mut self, firma_ruta: &str) -> Result<Expediente, AlmacenError> {
        expedientes::table.filter(expedientes::firma_ruta.eq(firma_ruta))
                          .first::<FilaExpediente>(self.conexion)
                          .map_err(mapear)?
                          .a_dominio()
    }

    fn listar_expedientes(&mut self, filtro: &FiltroExpedientes) -> Result<Vec<ExpedienteDetallado>, AlmacenError> {
        let mut consulta = expedientes::table.inner_join(solicitante::table)
                                             .inner_join(asuntos::table)
                                             .into_boxed();
        if let Some(estado) = filtro.estado {
            consulta = consulta.filter(expedientes::estado.eq(estado.como_texto()));
        }
        if let Some(estado) = filtro.estado_excluir {
            consulta = consulta.filter(expedientes::estado.ne(estado.como_texto()));
        }
        if let Some(desde) = filtro.fecha_inicio {
            consulta = consulta.filter(expedientes::fecha_recepcion.ge(desde));
        }
        if let Some(hasta) = filtro.fecha_fin {
            consulta = consulta.filter(expedientes::fecha_recepcion.le(hasta));
        }
        if let Some(solicitante_id) = filtro.solicitante_id {
            consulta = consulta.filter(expedientes::solicitante_id.eq(solicitante_id));
        }
        let filas: Vec<(FilaExpediente, FilaSolicitante, FilaAsunto)> =
            consulta.order((expedientes::fecha_recepcion.desc(), expedientes::id_expediente.desc()))
                    .load(self.conexion)
                    .map_err(mapear)?;
        filas.into_iter()
             .map(|(expediente, solicitante, asunto)| {
                 Ok(ExpedienteDetallado { expediente: expediente.a_dominio()?,
                                          solicitante: solicitante.a_dominio()?,
                                          asunto: asunto.a_dominio() })
             })
             .collect()
    }

    fn tiene_entregas(&mut self, expediente_id: i64) -> Result<bool, AlmacenError> {
        diesel::select(diesel::dsl::exists(entregas::table.filter(entregas::expediente_id.eq(expediente_id))))
            .get_result(self.conexion)
            .map_err(mapear)
    }

    fn solicitante(&mut self, id: i64) -> Result<Solicitante, AlmacenError> {
        solicitante::table.find(id)
                          .first::<FilaSolicitante>(self.conexion)
                          .map_err(mapear)?
                          .a_dominio()
    }

    fn asunto(&mut self, id: i64) -> Result<Asunto, AlmacenError> {
        Ok(asuntos::table.find(id)
                         .first::<FilaAsunto>(self.conexion)
                         .map_err(mapear)?
                         .a_dominio())
    }

    fn insertar_solicitante(&mut self, nuevo: &NuevoSolicitante) -> Result<Solicitante, AlmacenError> {
        let fila = NuevaFilaSolicitante { nombre_solicitante: &nuevo.nombre_solicitante,
                                          dni: nuevo.dni.as_deref(),
                                          codigo_modular: nuevo.codigo_modular.as_deref(),
                                          email: nuevo.email.as_deref(),
                                          telefono: nuevo.telefono.as_deref(),
                                          nombre_tipo: nuevo.tipo.como_texto() };
        diesel::insert_into(solicitante::table).values(&fila)
                                               .get_result::<FilaSolicitante>(self.conexion)
                                               .map_err(mapear)?
                                               .a_dominio()
    }

    fn insertar_asunto(&mut self, nuevo: &NuevoAsunto) -> Result<Asunto, AlmacenError> {
        let fila = NuevaFilaAsunto { nombre_asunto: &nuevo.nombre_asunto,
                                     documento_id: nuevo.documento_id,
                                     activo: nuevo.activo };
        Ok(diesel::insert_into(asuntos::table).values(&fila)
                                              .get_result::<FilaAsunto>(self.conexion)
                                              .map_err(mapear)?
                                              .a_dominio())
    }

    fn insertar_historial(&mut self, nuevo: &NuevoHistorial) -> Result<HistorialExpediente, AlmacenError> {
        let fila = NuevaFilaHistorial { expediente_id: nuevo.expediente_id,
                                        usuario: &nuevo.usuario,
                                        estado_anterior: nuevo.estado_anterior.as_deref(),
                                        estado_nuevo: &nuevo.estado_nuevo,
                                        observaciones: nuevo.observaciones.as_deref(),
                                        fecha_cambio: nuevo.fecha_cambio };
        Ok(diesel::insert_into(historial_expediente::table).values(&fila)
                                                           .get_result::<FilaHistorial>(self.conexion)
                                                           .map_err(mapear)?
                                                           .a_dominio())
    }

    fn historial_de_expediente(&mut self,
                               expediente_id: i64,
                               limite: Option<i64>)
                               -> Result<Vec<HistorialExpediente>, AlmacenError> {
        let mut consulta =
            historial_expediente::table.filter(historial_expediente::expediente_id.eq(expediente_id))
                                       .order((historial_expediente::fecha_cambio.desc(),
                                               historial_expediente::id_historial.desc()))
                                       .into_boxed();
        if let Some(limite) = limite {
            consulta = consulta.limit(limite);
        }
        let filas: Vec<FilaHistorial> = consulta.load(self.conexion).map_err(mapear)?;
        Ok(filas.into_iter().map(FilaHistorial::a_dominio).collect())
    }

    fn insertar_entrega(&mut self, nueva: &NuevaEntrega) -> Result<Entrega, AlmacenError> {
        let fila = NuevaFilaEntrega { expediente_id: nueva.expediente_id,
                                      dni_recoge: &nueva.dni_recoge,
                                      tipo_recogida: nueva.tipo_recogida.como_texto(),
                                      nombre_autorizado: nueva.nombre_autorizado.as_deref(),
                                      dni_autorizado: nueva.dni_autorizado.as_deref(),
                                      documento_autorizacion: nueva.documento_autorizacion.as_deref(),
                                      observaciones: nueva.observaciones.as_deref(),
                                      fecha_entrega: nueva.fecha_entrega,
                                      hora_entrega: nueva.hora_entrega,
                                      dias_atencion: nueva.dias_atencion,
                                      entregado_por: &nueva.entregado_por };
        diesel::insert_into(entregas::table).values(&fila)
                                            .get_result::<FilaEntrega>(self.conexion)
                                            .map_err(mapear)?
                                            .a_dominio()
    }

    fn eliminar_entrega(&mut self, id: i64) -> Result<(), AlmacenError> {
        let eliminadas = diesel::delete(entregas::table.find(id)).execute(self.conexion)
                                                                 .map_err(mapear)?;
        if eliminadas == 0 {
            return Err(AlmacenError::NoEncontrado);
        }
        Ok(())
    }

    fn entrega(&mut self, id: i64) -> Result<Entrega, AlmacenError> {
        entregas::table.find(id)
                       .first::<FilaEntrega>(self.conexion)
                       .map_err(mapear)?
                       .a_dominio()
    }

    fn entregas_de_expediente(&mut self, expediente_id: i64) -> Result<Vec<Entrega>, AlmacenError> {
        let filas: Vec<FilaEntrega> =
            entregas::table.filter(entregas::expediente_id.eq(expediente_id))
                           .order((entregas::fecha_entrega.desc(), entregas::id_entrega.desc()))
                           .load(self.conexion)
                           .map_err(mapear)?;
        filas.into_iter().map(FilaEntrega::a_dominio).collect()
    }

    fn listar_entregas(&mut self, filtro: &FiltroEntregas) -> Result<Vec<Entrega>, AlmacenError> {
        let mut consulta = entregas::table.into_boxed();
        if let Some(desde) = filtro.fecha_inicio {
            consulta = consulta.filter(entregas::fecha_entrega.ge(desde.and_time(NaiveTime::MIN).and_utc()));
        }
        if let Some(hasta) = filtro.fecha_fin {
            if let Some(fin) = hasta.succ_opt() {
                consulta = consulta.filter(entregas::fecha_entrega.lt(fin.and_time(NaiveTime::MIN).and_utc()));
            }
        }
        if let Some(tipo) = filtro.tipo_recogida {
            consulta = consulta.filter(entregas::tipo_recogida.eq(tipo.como_texto()));
        }
        if let Some(dni) = filtro.dni.clone() {
            consulta = consulta.filter(entregas::dni_recoge.eq(dni.clone())
                                                           .or(entregas::dni_autorizado.eq(dni)));
        }
        let filas: Vec<FilaEntrega> =
            consulta.order((entregas::fecha_entrega.desc(), entregas::id_entrega.desc()))
                    .load(self.conexion)
                    .map_err(mapear)?;
        filas.into_iter().map(FilaEntrega::a_dominio).collect()
    }

    fn insertar_atencion(&mut self, nueva: &NuevaAtencion) -> Result<Atencion, AlmacenError> {
        let fila = NuevaFilaAtencion { id_expediente: nueva.id_expediente,
                                       usuario: &nueva.usuario,
                                       estado_anterior: &nueva.estado_anterior,
                                       estado_nuevo: &nueva.estado_nuevo,
                                       observaciones: nueva.observaciones.as_deref(),
                                       fecha_atencion: nueva.fecha_atencion };
        Ok(diesel::insert_into(atenciones::table).values(&fila)
                                                 .get_result::<FilaAtencion>(self.conexion)
                                                 .map_err(mapear)?
                                                 .a_dominio())
    }

    fn atenciones_de_expediente(&mut self, expediente_id: i64) -> Result<Vec<Atencion>, AlmacenError> {
        let filas: Vec<FilaAtencion> =
            atenciones::table.filter(atenciones::id_expediente.eq(expediente_id))
                             .order((atenciones::fecha_atencion.desc(), atenciones::id_atencion.desc()))
                             .load(self.conexion)
                             .map_err(mapear)?;
        Ok(filas.into_iter().map(FilaAtencion::a_dominio).collect())
    }

    fn listar_atenciones(&mut self) -> Result<Vec<AtencionDetallada>, AlmacenError> {
        let filas: Vec<(FilaAtencion, (FilaExpediente, FilaSolicitante, FilaAsunto))> =
            atenciones::table.inner_join(expedientes::table.inner_join(solicitante::table)
                                                           .inner_join(asuntos::table))
                             .order((atenciones::fecha_atencion.desc(), atenciones::id_atencion.desc()))
                             .load(self.conexion)
                             .map_err(mapear)?;
        filas.into_iter()
             .map(|(atencion, (expediente, solicitante, asunto))| {
                 Ok(AtencionDetallada { atencion: atencion.a_dominio(),
                                        expediente: ExpedienteDetallado { expediente: expediente.a_dominio()?,
                                                                          solicitante: solicitante.a_dominio()?,
                                                                          asunto: asunto.a_dominio() } })
             })
             .collect()
    }

    fn conteo_atenciones_por_usuario(&mut self) -> Result<Vec<ConteoAtenciones>, AlmacenError> {
        let pares: Vec<(String, i64)> = atenciones::table.group_by(atenciones::usuario)
                                                         .select((atenciones::usuario, diesel::dsl::count_star()))
                                                         .load(self.conexion)
                                                         .map_err(mapear)?;
        let mut filas: Vec<ConteoAtenciones> =
            pares.into_iter()
                 .map(|(usuario, total_atenciones)| ConteoAtenciones { usuario, total_atenciones })
                 .collect();
        filas.sort_by(|a, b| b.total_atenciones.cmp(&a.total_atenciones).then(a.usuario.cmp(&b.usuario)));
        Ok(filas)
    }
}

// ---------------------------------------------------------------------------
// Construcción del pool
// ---------------------------------------------------------------------------

/// Construye un pool Postgres r2d2 a partir de una URL.
///
/// - Valida y ajusta tamaños (si `min > max`, usa `min = max`).
/// - Ejecuta las migraciones pendientes tras el primer checkout.
pub fn construir_pool(database_url: &str, min: u32, max: u32) -> Result<PgPool, PersistenceError> {
    let min_valido = if min == 0 { 1 } else { min };
    let max_valido = if max == 0 { 1 } else { max };
    if min_valido > max_valido {
        warn!("min_connections > max_connections ({min_valido} > {max_valido}), ajustando min=max");
    }
    let min_final = min_valido.min(max_valido);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(min_final))
                                    .max_size(max_valido)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee la configuración y construye un
/// pool ya migrado.
pub fn construir_pool_dev_desde_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env();
    construir_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
