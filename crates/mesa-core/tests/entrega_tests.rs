mod comun;

use comun::{almacen_con_directorios, es_validacion_en, fecha, instante};
use mesa_core::{AlmacenMemoria, CoreError, FiltroEntregas, RegistroEntregas, RegistroExpedientes, RegistroHistorial,
                RelojFijo, SolicitudEntrega, SolicitudRegistro};
use mesa_domain::{CambiosExpediente, Estado, TipoRecogida};

/// Crea un expediente recepcionado el 2026-01-10 y lo deja LISTO PARA
/// ENTREGA. Devuelve su id.
fn expediente_listo(almacen: &AlmacenMemoria) -> i64 {
    let registro = RegistroExpedientes::con_reloj(almacen, RelojFijo(instante(2026, 1, 10, 9)));
    let creado = registro.crear(&SolicitudRegistro { solicitante_id: 1,
                                                     asunto_id: 1,
                                                     fecha_recepcion: fecha(2026, 1, 10),
                                                     observaciones: None },
                                "mesa01")
                         .unwrap();
    let id = creado.expediente.id_expediente;
    registro.actualizar(id, &CambiosExpediente::solo_estado(Estado::ListoParaEntrega), "mesa01")
            .unwrap();
    id
}

fn solicitud_titular(expediente_id: i64) -> SolicitudEntrega {
    SolicitudEntrega { expediente_id,
                       dni_recoge: "44556677".into(),
                       tipo_recogida: TipoRecogida::Titular,
                       nombre_autorizado: None,
                       dni_autorizado: None,
                       documento_autorizacion: None,
                       observaciones: None }
}

#[test]
fn entrega_exitosa_cierra_el_expediente() {
    let almacen = almacen_con_directorios();
    let id = expediente_listo(&almacen);
    // Entrega cinco días después de la recepción.
    let entregas = RegistroEntregas::con_reloj(&almacen, RelojFijo(instante(2026, 1, 15, 14)));

    let detallada = entregas.registrar(&solicitud_titular(id), "J. Quispe").unwrap();

    assert_eq!(detallada.entrega.dias_atencion, 5);
    assert_eq!(detallada.entrega.entregado_por, "J. Quispe");
    assert_eq!(detallada.expediente.expediente.estado, Estado::Entregado);

    // La nota de entrega quedó anexada a las observaciones del expediente.
    let observaciones = detallada.expediente.expediente.observaciones.as_deref().unwrap();
    assert!(observaciones.contains("--- ENTREGA REGISTRADA ---"));
    assert!(observaciones.contains("DNI: 44556677"));
    assert!(observaciones.contains("Entregado por: J. Quispe"));

    // Y el historial registró la transición final.
    let historial = RegistroHistorial::nuevo(&almacen).de_expediente(id).unwrap().historial;
    assert_eq!(historial[0].estado_anterior.as_deref(), Some("LISTO PARA ENTREGA"));
    assert_eq!(historial[0].estado_nuevo, "ENTREGADO");
}

#[test]
fn sin_estado_listo_la_entrega_es_conflicto_y_no_escribe() {
    let almacen = almacen_con_directorios();
    let registro = RegistroExpedientes::con_reloj(&almacen, RelojFijo(instante(2026, 1, 10, 9)));
    let creado = registro.crear(&SolicitudRegistro { solicitante_id: 1,
                                                     asunto_id: 1,
                                                     fecha_recepcion: fecha(2026, 1, 10),
                                                     observaciones: None },
                                "mesa01")
                         .unwrap();
    let id = creado.expediente.id_expediente;
    registro.actualizar(id, &CambiosExpediente::solo_estado(Estado::EnProceso), "mesa01")
            .unwrap();

    let entregas = RegistroEntregas::con_reloj(&almacen, RelojFijo(instante(2026, 1, 15, 14)));
    let err = entregas.registrar(&solicitud_titular(id), "J. Quispe").unwrap_err();

    assert!(matches!(&err, CoreError::Conflicto(detalle) if detalle.contains("EN PROCESO")), "{err:?}");
    assert_eq!(registro.buscar(id).unwrap().expediente.estado, Estado::EnProceso);
    assert!(entregas.de_expediente(id).unwrap().is_empty());
}

#[test]
fn tercero_exige_nombre_y_dni_del_autorizado() {
    let almacen = almacen_con_directorios();
    let id = expediente_listo(&almacen);
    let entregas = RegistroEntregas::con_reloj(&almacen, RelojFijo(instante(2026, 1, 15, 14)));

    let sin_nombre = SolicitudEntrega { tipo_recogida: TipoRecogida::Tercero,
                                        dni_autorizado: Some("87654321".into()),
                                        ..solicitud_titular(id) };
    let err = entregas.registrar(&sin_nombre, "J. Quispe").unwrap_err();
    assert!(es_validacion_en(&err, "nombre_autorizado"), "{err:?}");

    let sin_dni = SolicitudEntrega { tipo_recogida: TipoRecogida::Tercero,
                                     nombre_autorizado: Some("Pedro Salas".into()),
                                     ..solicitud_titular(id) };
    let err = entregas.registrar(&sin_dni, "J. Quispe").unwrap_err();
    assert!(es_validacion_en(&err, "dni_autorizado"), "{err:?}");
}

#[test]
fn con_titular_se_descartan_los_datos_de_autorizado() {
    let almacen = almacen_con_directorios();
    let id = expediente_listo(&almacen);
    let entregas = RegistroEntregas::con_reloj(&almacen, RelojFijo(instante(2026, 1, 15, 14)));

    let con_sobrantes = SolicitudEntrega { nombre_autorizado: Some("Pedro Salas".into()),
                                           dni_autorizado: Some("87654321".into()),
                                           ..solicitud_titular(id) };
    let detallada = entregas.registrar(&con_sobrantes, "J. Quispe").unwrap();

    assert_eq!(detallada.entrega.nombre_autorizado, None);
    assert_eq!(detallada.entrega.dni_autorizado, None);
    assert_eq!(detallada.entrega.dni_efectivo(), "44556677");
}

#[test]
fn entrega_a_tercero_usa_el_dni_del_autorizado() {
    let almacen = almacen_con_directorios();
    let id = expediente_listo(&almacen);
    let entregas = RegistroEntregas::con_reloj(&almacen, RelojFijo(instante(2026, 1, 15, 14)));

    let a_tercero = SolicitudEntrega { tipo_recogida: TipoRecogida::Tercero,
                                       nombre_autorizado: Some("Pedro Salas".into()),
                                       dni_autorizado: Some("87654321".into()),
                                       observaciones: Some("recojo con carta poder".into()),
                                       ..solicitud_titular(id) };
    let detallada = entregas.registrar(&a_tercero, "J. Quispe").unwrap();

    assert_eq!(detallada.entrega.dni_efectivo(), "87654321");
    let observaciones = detallada.expediente.expediente.observaciones.unwrap();
    assert!(observaciones.contains("Tipo: TERCERO"));
    assert!(observaciones.contains("DNI: 87654321"));
    assert!(observaciones.contains("Observaciones: recojo con carta poder"));
}

#[test]
fn dni_malformado_es_validacion() {
    let almacen = almacen_con_directorios();
    let id = expediente_listo(&almacen);
    let entregas = RegistroEntregas::con_reloj(&almacen, RelojFijo(instante(2026, 1, 15, 14)));

    let corto = SolicitudEntrega { dni_recoge: "123".into(), ..solicitud_titular(id) };
    let err = entregas.registrar(&corto, "J. Quispe").unwrap_err();
    assert!(es_validacion_en(&err, "dni_recoge"), "{err:?}");
}

#[test]
fn eliminar_la_entrega_revierte_el_expediente() {
    let almacen = almacen_con_directorios();
    let id = expediente_listo(&almacen);
    let entregas = RegistroEntregas::con_reloj(&almacen, RelojFijo(instante(2026, 1, 15, 14)));
    let detallada = entregas.registrar(&solicitud_titular(id), "J. Quispe").unwrap();

    let correccion = RegistroEntregas::con_reloj(&almacen, RelojFijo(instante(2026, 1, 16, 8)));
    correccion.eliminar(detallada.entrega.id_entrega, "admin01").unwrap();

    let registro = RegistroExpedientes::nuevo(&almacen);
    assert_eq!(registro.buscar(id).unwrap().expediente.estado, Estado::ListoParaEntrega);
    assert!(entregas.de_expediente(id).unwrap().is_empty());

    // La reversión queda asentada como transición normal del historial.
    let historial = RegistroHistorial::nuevo(&almacen).de_expediente(id).unwrap().historial;
    assert_eq!(historial[0].estado_anterior.as_deref(), Some("ENTREGADO"));
    assert_eq!(historial[0].estado_nuevo, "LISTO PARA ENTREGA");
    assert_eq!(historial[0].usuario, "admin01");
}

#[test]
fn listar_filtra_por_tipo_fecha_y_dni() {
    let almacen = almacen_con_directorios();
    let id = expediente_listo(&almacen);
    let entregas = RegistroEntregas::con_reloj(&almacen, RelojFijo(instante(2026, 1, 15, 14)));
    entregas.registrar(&solicitud_titular(id), "J. Quispe").unwrap();

    let por_tipo = entregas.listar(&FiltroEntregas { tipo_recogida: Some(TipoRecogida::Titular),
                                                     ..Default::default() })
                           .unwrap();
    assert_eq!(por_tipo.len(), 1);

    let por_dni = entregas.listar(&FiltroEntregas { dni: Some("44556677".into()), ..Default::default() })
                          .unwrap();
    assert_eq!(por_dni.len(), 1);

    let fuera_de_rango = entregas.listar(&FiltroEntregas { fecha_fin: Some(fecha(2026, 1, 14)),
                                                           ..Default::default() })
                                 .unwrap();
    assert!(fuera_de_rango.is_empty());
}

#[test]
fn no_se_elimina_un_expediente_con_entregas() {
    let almacen = almacen_con_directorios();
    let id = expediente_listo(&almacen);
    let entregas = RegistroEntregas::con_reloj(&almacen, RelojFijo(instante(2026, 1, 15, 14)));
    entregas.registrar(&solicitud_titular(id), "J. Quispe").unwrap();

    let registro = RegistroExpedientes::nuevo(&almacen);
    let err = registro.eliminar(id).unwrap_err();
    assert!(matches!(err, CoreError::Conflicto(_)), "{err:?}");
    assert!(registro.buscar(id).is_ok());
}
