//! Recorrido de demostración del ciclo de vida de un expediente.
//!
//! Sin argumentos corre contra el almacén en memoria. Con el feature
//! `pg_demo` y un `DATABASE_URL` en el entorno, repite el mismo recorrido
//! contra Postgres (pool + migraciones embebidas).

use chrono::Utc;

use mesa_core::{resolver_entregador, resolver_usuario, Almacen, AlmacenMemoria, Consulta, Identidad,
                RegistroAtenciones, RegistroEntregas, RegistroExpedientes, RegistroHistorial, SolicitudAtencion,
                SolicitudEntrega, SolicitudRegistro, TxAlmacen};
use mesa_domain::{CambiosExpediente, Estado, NuevoAsunto, NuevoSolicitante, TipoRecogida, TipoSolicitante};

fn main() {
    let _ = dotenvy::dotenv();
    env_logger::init();

    println!("== Recorrido en memoria ==");
    let almacen = AlmacenMemoria::nuevo();
    recorrido(&almacen);

    #[cfg(feature = "pg_demo")]
    recorrido_pg();
}

/// El mismo recorrido sirve para cualquier backend del contrato `Almacen`.
fn recorrido<A: Almacen>(almacen: &A) {
    // La identidad se resuelve una sola vez en la frontera.
    let usuario = resolver_usuario(&Identidad { solicitud: Some("mesa01".into()),
                                                sesion: None,
                                                autenticado: None });

    let (solicitante_id, asunto_id) =
        almacen.transaccion(|tx| {
                   let solicitante =
                       // Sin DNI para que el recorrido sea repetible sobre
                       // una base ya poblada (el DNI es único).
                       tx.insertar_solicitante(&NuevoSolicitante { nombre_solicitante: "María Torres Vega".into(),
                                                                   dni: None,
                                                                   codigo_modular: None,
                                                                   email: Some("mtorres@example.pe".into()),
                                                                   telefono: None,
                                                                   tipo: TipoSolicitante::Natural })?;
                   let asunto = tx.insertar_asunto(&NuevoAsunto { nombre_asunto: "Constancia de pago de haberes"
                                                                      .into(),
                                                                  documento_id: 1,
                                                                  activo: true })?;
                   Ok((solicitante.id_solicitante, asunto.id_asunto))
               })
               .expect("siembra de directorios");

    let registro = RegistroExpedientes::nuevo(almacen);
    let creado = registro.crear(&SolicitudRegistro { solicitante_id,
                                                     asunto_id,
                                                     fecha_recepcion: Utc::now().date_naive(),
                                                     observaciones: None },
                                &usuario)
                         .expect("alta de expediente");
    let id = creado.expediente.id_expediente;
    println!("alta: {} / firma {}", creado.expediente.num_expediente, creado.expediente.firma_ruta);

    // Consulta pública del ciudadano con el código de seguimiento.
    let consulta = Consulta::nueva(almacen).consultar(&creado.expediente.firma_ruta)
                                           .expect("consulta pública");
    println!("consulta pública:\n{}",
             serde_json::to_string_pretty(&consulta).expect("serializar consulta"));

    // Avance del trámite con su bitácora de atención.
    registro.actualizar(id, &CambiosExpediente::solo_estado(Estado::EnProceso), &usuario)
            .expect("a EN PROCESO");
    RegistroAtenciones::nuevo(almacen).registrar(&SolicitudAtencion { id_expediente: id,
                                                                      usuario: usuario.clone(),
                                                                      estado_anterior: "RECEPCIONADO".into(),
                                                                      estado_nuevo: "EN PROCESO".into(),
                                                                      observaciones: Some("derivado a escalafón"
                                                                          .into()) })
                                      .expect("atención");
    registro.actualizar(id, &CambiosExpediente::solo_estado(Estado::ListoParaEntrega), &usuario)
            .expect("a LISTO PARA ENTREGA");

    // Entrega al titular.
    let entregado_por = resolver_entregador(Some("J. Quispe"), None);
    let entrega = RegistroEntregas::nuevo(almacen).registrar(&SolicitudEntrega { expediente_id: id,
                                                                                 dni_recoge: "44556677".into(),
                                                                                 tipo_recogida:
                                                                                     TipoRecogida::Titular,
                                                                                 nombre_autorizado: None,
                                                                                 dni_autorizado: None,
                                                                                 documento_autorizacion: None,
                                                                                 observaciones: None },
                                                             &entregado_por)
                                                  .expect("entrega");
    println!("entrega: {} días de atención, entregó {}",
             entrega.entrega.dias_atencion, entrega.entrega.entregado_por);

    // Historial final, el cambio más reciente primero.
    let historial = RegistroHistorial::nuevo(almacen).de_expediente(id).expect("historial");
    for entrada in &historial.historial {
        println!("historial: {} -> {} ({})",
                 entrada.estado_anterior.as_deref().unwrap_or("—"),
                 entrada.estado_nuevo,
                 entrada.usuario);
    }
}

#[cfg(feature = "pg_demo")]
fn recorrido_pg() {
    use mesa_persistence::pg::{construir_pool_dev_desde_env, AlmacenPg, ProveedorPool};

    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("pg_demo: DATABASE_URL no definido, se omite el recorrido Postgres");
        return;
    }
    println!("== Recorrido en Postgres ==");
    let pool = match construir_pool_dev_desde_env() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("pg_demo: no se pudo construir el pool: {e}");
            return;
        }
    };
    let almacen = AlmacenPg::nuevo(ProveedorPool { pool });
    recorrido(&almacen);
}
