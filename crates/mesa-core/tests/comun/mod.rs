use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use mesa_core::{Almacen, AlmacenMemoria, CoreError, TxAlmacen};
use mesa_domain::{NuevoAsunto, NuevoSolicitante, TipoSolicitante};

/// Almacén en memoria con un solicitante (id 1) y un asunto (id 1) sembrados.
pub fn almacen_con_directorios() -> AlmacenMemoria {
    let almacen = AlmacenMemoria::nuevo();
    almacen.transaccion(|tx| {
               tx.insertar_solicitante(&NuevoSolicitante { nombre_solicitante: "María Torres Vega".into(),
                                                           dni: Some("44556677".into()),
                                                           codigo_modular: None,
                                                           email: Some("mtorres@example.pe".into()),
                                                           telefono: None,
                                                           tipo: TipoSolicitante::Natural })?;
               tx.insertar_asunto(&NuevoAsunto { nombre_asunto: "Constancia de pago de haberes".into(),
                                                 documento_id: 1,
                                                 activo: true })?;
               Ok(())
           })
           .expect("siembra de directorios");
    almacen
}

pub fn instante(anio: i32, mes: u32, dia: u32, hora: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(anio, mes, dia, hora, 0, 0).unwrap()
}

pub fn fecha(anio: i32, mes: u32, dia: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(anio, mes, dia).unwrap()
}

pub fn es_validacion_en(err: &CoreError, campo_esperado: &str) -> bool {
    matches!(err, CoreError::Validacion { campo, .. } if campo == campo_esperado)
}
