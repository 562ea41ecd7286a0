mod comun;

use comun::{almacen_con_directorios, es_validacion_en, fecha, instante};
use mesa_core::{Almacen, CoreError, FiltroExpedientes, RegistroExpedientes, RegistroHistorial, RelojFijo,
                SolicitudRegistro, TxAlmacen};
use mesa_domain::{CambiosExpediente, Estado};

fn solicitud_basica() -> SolicitudRegistro {
    SolicitudRegistro { solicitante_id: 1,
                        asunto_id: 1,
                        fecha_recepcion: fecha(2026, 1, 10),
                        observaciones: None }
}

#[test]
fn primer_expediente_del_anio_recibe_secuencia_0001() {
    let almacen = almacen_con_directorios();
    let registro = RegistroExpedientes::con_reloj(&almacen, RelojFijo(instante(2026, 1, 10, 9)));

    let detallado = registro.crear(&solicitud_basica(), "mesa01").unwrap();
    let expediente = &detallado.expediente;

    assert_eq!(expediente.num_expediente, "2026-0001");
    assert_eq!(expediente.estado, Estado::Recepcionado);
    assert_eq!(detallado.solicitante.id_solicitante, 1);
    assert_eq!(detallado.asunto.id_asunto, 1);

    // UGEL-2026-0001-XXXX con sufijo alfanumérico en mayúsculas.
    let partes: Vec<&str> = expediente.firma_ruta.split('-').collect();
    assert_eq!(partes.len(), 4);
    assert_eq!(partes[0], "UGEL");
    assert_eq!(partes[1], "2026");
    assert_eq!(partes[2], "0001");
    assert_eq!(partes[3].len(), 4);
    assert!(partes[3].bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
}

#[test]
fn la_secuencia_avanza_de_a_uno_y_es_unica() {
    let almacen = almacen_con_directorios();
    let registro = RegistroExpedientes::con_reloj(&almacen, RelojFijo(instante(2026, 3, 2, 9)));

    let numeros: Vec<String> = (0..4).map(|_| registro.crear(&solicitud_basica(), "mesa01").unwrap())
                                     .map(|d| d.expediente.num_expediente)
                                     .collect();
    assert_eq!(numeros, ["2026-0001", "2026-0002", "2026-0003", "2026-0004"]);
}

#[test]
fn la_numeracion_reinicia_por_anio_calendario() {
    let almacen = almacen_con_directorios();

    let registro_2025 = RegistroExpedientes::con_reloj(&almacen, RelojFijo(instante(2025, 12, 30, 9)));
    registro_2025.crear(&solicitud_basica(), "mesa01").unwrap();
    registro_2025.crear(&solicitud_basica(), "mesa01").unwrap();

    let registro_2026 = RegistroExpedientes::con_reloj(&almacen, RelojFijo(instante(2026, 1, 2, 9)));
    let del_nuevo_anio = registro_2026.crear(&solicitud_basica(), "mesa01").unwrap();

    assert_eq!(del_nuevo_anio.expediente.num_expediente, "2026-0001");
}

#[test]
fn crear_exige_solicitante_y_asunto_existentes() {
    let almacen = almacen_con_directorios();
    let registro = RegistroExpedientes::con_reloj(&almacen, RelojFijo(instante(2026, 1, 10, 9)));

    let sin_solicitante = SolicitudRegistro { solicitante_id: 99, ..solicitud_basica() };
    let err = registro.crear(&sin_solicitante, "mesa01").unwrap_err();
    assert!(es_validacion_en(&err, "solicitante_id"), "{err:?}");

    let sin_asunto = SolicitudRegistro { asunto_id: 99, ..solicitud_basica() };
    let err = registro.crear(&sin_asunto, "mesa01").unwrap_err();
    assert!(es_validacion_en(&err, "asunto_id"), "{err:?}");

    // Ninguna alta fallida deja rastro.
    assert!(registro.listar(&FiltroExpedientes::default()).unwrap().is_empty());
}

#[test]
fn el_alta_deja_exactamente_una_entrada_de_creacion() {
    let almacen = almacen_con_directorios();
    let registro = RegistroExpedientes::con_reloj(&almacen, RelojFijo(instante(2026, 1, 10, 9)));
    let creado = registro.crear(&solicitud_basica(), "mesa01").unwrap();

    let historial = RegistroHistorial::nuevo(&almacen).de_expediente(creado.expediente.id_expediente)
                                                      .unwrap()
                                                      .historial;
    assert_eq!(historial.len(), 1);
    let entrada = &historial[0];
    assert_eq!(entrada.estado_anterior, None);
    assert_eq!(entrada.estado_nuevo, "RECEPCIONADO");
    assert_eq!(entrada.usuario, "mesa01");
    assert_eq!(entrada.observaciones.as_deref(),
               Some(format!("Expediente registrado. Código: {}", creado.expediente.firma_ruta).as_str()));
}

#[test]
fn cambiar_estado_agrega_una_entrada_con_ambos_estados() {
    let almacen = almacen_con_directorios();
    let reloj = RelojFijo(instante(2026, 1, 10, 9));
    let registro = RegistroExpedientes::con_reloj(&almacen, reloj);
    let creado = registro.crear(&solicitud_basica(), "mesa01").unwrap();
    let id = creado.expediente.id_expediente;

    let cambios = CambiosExpediente::solo_estado(Estado::EnProceso);
    let actualizado = registro.actualizar(id, &cambios, "tramite02").unwrap();
    assert_eq!(actualizado.expediente.estado, Estado::EnProceso);

    let historial = RegistroHistorial::nuevo(&almacen).de_expediente(id).unwrap().historial;
    assert_eq!(historial.len(), 2);
    let ultima = &historial[0]; // más reciente primero
    assert_eq!(ultima.estado_anterior.as_deref(), Some("RECEPCIONADO"));
    assert_eq!(ultima.estado_nuevo, "EN PROCESO");
    assert_eq!(ultima.usuario, "tramite02");
}

#[test]
fn actualizar_sin_cambiar_estado_no_toca_el_historial() {
    let almacen = almacen_con_directorios();
    let registro = RegistroExpedientes::con_reloj(&almacen, RelojFijo(instante(2026, 1, 10, 9)));
    let creado = registro.crear(&solicitud_basica(), "mesa01").unwrap();
    let id = creado.expediente.id_expediente;

    let cambios = CambiosExpediente { observaciones: Some(Some("se adjuntó recibo".into())),
                                      ..Default::default() };
    let actualizado = registro.actualizar(id, &cambios, "mesa01").unwrap();
    assert_eq!(actualizado.expediente.observaciones.as_deref(), Some("se adjuntó recibo"));

    let historial = RegistroHistorial::nuevo(&almacen).de_expediente(id).unwrap().historial;
    assert_eq!(historial.len(), 1, "sólo la entrada de creación");
}

#[test]
fn actualizar_expediente_ausente_es_no_encontrado() {
    let almacen = almacen_con_directorios();
    let registro = RegistroExpedientes::nuevo(&almacen);
    let err = registro.actualizar(404, &CambiosExpediente::solo_estado(Estado::EnProceso), "mesa01")
                      .unwrap_err();
    assert!(matches!(err, CoreError::NoEncontrado(_)), "{err:?}");
}

#[test]
fn busqueda_por_firma_de_ruta() {
    let almacen = almacen_con_directorios();
    let registro = RegistroExpedientes::con_reloj(&almacen, RelojFijo(instante(2026, 1, 10, 9)));
    let creado = registro.crear(&solicitud_basica(), "mesa01").unwrap();

    let hallado = registro.buscar_por_firma(&creado.expediente.firma_ruta).unwrap();
    assert_eq!(hallado.expediente.id_expediente, creado.expediente.id_expediente);

    let err = registro.buscar_por_firma("UGEL-2026-9999-XXXX").unwrap_err();
    assert!(matches!(err, CoreError::NoEncontrado(_)), "{err:?}");
}

#[test]
fn listar_filtra_por_estado_fechas_y_solicitante() {
    let almacen = almacen_con_directorios();
    let registro = RegistroExpedientes::con_reloj(&almacen, RelojFijo(instante(2026, 2, 1, 9)));

    let a = registro.crear(&SolicitudRegistro { fecha_recepcion: fecha(2026, 1, 5), ..solicitud_basica() }, "mesa01")
                    .unwrap();
    let b = registro.crear(&SolicitudRegistro { fecha_recepcion: fecha(2026, 1, 20), ..solicitud_basica() }, "mesa01")
                    .unwrap();
    registro.actualizar(b.expediente.id_expediente,
                        &CambiosExpediente::solo_estado(Estado::Observado),
                        "mesa01")
            .unwrap();

    let observados = registro.listar(&FiltroExpedientes { estado: Some(Estado::Observado),
                                                          ..Default::default() })
                             .unwrap();
    assert_eq!(observados.len(), 1);
    assert_eq!(observados[0].expediente.id_expediente, b.expediente.id_expediente);

    let sin_observados = registro.listar(&FiltroExpedientes { estado_excluir: Some(Estado::Observado),
                                                              ..Default::default() })
                                 .unwrap();
    assert_eq!(sin_observados.len(), 1);
    assert_eq!(sin_observados[0].expediente.id_expediente, a.expediente.id_expediente);

    let de_enero_temprano = registro.listar(&FiltroExpedientes { fecha_fin: Some(fecha(2026, 1, 10)),
                                                                 ..Default::default() })
                                    .unwrap();
    assert_eq!(de_enero_temprano.len(), 1);

    // Orden: recepción más reciente primero.
    let todos = registro.listar(&FiltroExpedientes::default()).unwrap();
    assert_eq!(todos[0].expediente.id_expediente, b.expediente.id_expediente);
}

#[test]
fn una_transaccion_fallida_no_deja_escrituras() {
    let almacen = almacen_con_directorios();
    let registro = RegistroExpedientes::con_reloj(&almacen, RelojFijo(instante(2026, 1, 10, 9)));
    let creado = registro.crear(&solicitud_basica(), "mesa01").unwrap();
    let id = creado.expediente.id_expediente;

    // Unidad que escribe y luego falla: nada de lo escrito debe quedar.
    let resultado: Result<(), CoreError> = almacen.transaccion(|tx| {
        tx.actualizar_expediente(id, &CambiosExpediente::solo_estado(Estado::EnProceso))?;
        Err(CoreError::Conflicto("fallo simulado tras la escritura".into()))
    });
    assert!(resultado.is_err());

    let intacto = registro.buscar(id).unwrap();
    assert_eq!(intacto.expediente.estado, Estado::Recepcionado);
}
