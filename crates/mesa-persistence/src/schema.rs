//! Esquema Diesel (declarado a mano, espejo de `migrations/`). Reemplazable
//! con `diesel print-schema`.

diesel::table! {
    solicitante (id_solicitante) {
        id_solicitante -> BigInt,
        nombre_solicitante -> Varchar,
        dni -> Nullable<Varchar>,
        codigo_modular -> Nullable<Varchar>,
        email -> Nullable<Varchar>,
        telefono -> Nullable<Varchar>,
        nombre_tipo -> Varchar,
    }
}

diesel::table! {
    asuntos (id_asunto) {
        id_asunto -> BigInt,
        nombre_asunto -> Varchar,
        documento_id -> BigInt,
        activo -> Bool,
    }
}

diesel::table! {
    expedientes (id_expediente) {
        id_expediente -> BigInt,
        num_expediente -> Varchar,
        firma_ruta -> Varchar,
        solicitante_id -> BigInt,
        asunto_id -> BigInt,
        fecha_recepcion -> Date,
        estado -> Varchar,
        observaciones -> Nullable<Text>,
        fecha_creacion -> Timestamptz,
    }
}

diesel::table! {
    historial_expediente (id_historial) {
        id_historial -> BigInt,
        expediente_id -> BigInt,
        usuario -> Varchar,
        estado_anterior -> Nullable<Varchar>,
        estado_nuevo -> Varchar,
        observaciones -> Nullable<Text>,
        fecha_cambio -> Timestamptz,
    }
}

diesel::table! {
    entregas (id_entrega) {
        id_entrega -> BigInt,
        expediente_id -> BigInt,
        dni_recoge -> Varchar,
        tipo_recogida -> Varchar,
        nombre_autorizado -> Nullable<Varchar>,
        dni_autorizado -> Nullable<Varchar>,
        documento_autorizacion -> Nullable<Varchar>,
        observaciones -> Nullable<Text>,
        fecha_entrega -> Timestamptz,
        hora_entrega -> Time,
        dias_atencion -> Integer,
        entregado_por -> Varchar,
    }
}

diesel::table! {
    atenciones (id_atencion) {
        id_atencion -> BigInt,
        id_expediente -> BigInt,
        usuario -> Varchar,
        estado_anterior -> Varchar,
        estado_nuevo -> Varchar,
        observaciones -> Nullable<Text>,
        fecha_atencion -> Timestamptz,
    }
}

diesel::joinable!(expedientes -> solicitante (solicitante_id));
diesel::joinable!(expedientes -> asuntos (asunto_id));
diesel::joinable!(historial_expediente -> expedientes (expediente_id));
diesel::joinable!(entregas -> expedientes (expediente_id));
diesel::joinable!(atenciones -> expedientes (id_expediente));

diesel::allow_tables_to_appear_in_same_query!(
    solicitante,
    asuntos,
    expedientes,
    historial_expediente,
    entregas,
    atenciones,
);
