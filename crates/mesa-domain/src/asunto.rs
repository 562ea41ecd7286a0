use serde::{Deserialize, Serialize};

/// Asunto/materia del trámite. `documento_id` referencia el catálogo de
/// tipos de documento, que se administra fuera de este sistema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asunto {
    pub id_asunto: i64,
    pub nombre_asunto: String,
    pub documento_id: i64,
    pub activo: bool,
}

#[derive(Debug, Clone)]
pub struct NuevoAsunto {
    pub nombre_asunto: String,
    pub documento_id: i64,
    pub activo: bool,
}
