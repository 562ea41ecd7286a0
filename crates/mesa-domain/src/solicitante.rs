use std::fmt;

use serde::{Deserialize, Serialize};

/// Persona natural o institución (jurídica, identificada por código modular).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TipoSolicitante {
    #[serde(rename = "Natural")]
    Natural,
    #[serde(rename = "Jurídica")]
    Juridica,
}

impl TipoSolicitante {
    pub fn como_texto(&self) -> &'static str {
        match self {
            TipoSolicitante::Natural => "Natural",
            TipoSolicitante::Juridica => "Jurídica",
        }
    }
}

impl fmt::Display for TipoSolicitante {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.como_texto())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solicitante {
    pub id_solicitante: i64,
    pub nombre_solicitante: String,
    pub dni: Option<String>,
    pub codigo_modular: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub tipo: TipoSolicitante,
}

#[derive(Debug, Clone)]
pub struct NuevoSolicitante {
    pub nombre_solicitante: String,
    pub dni: Option<String>,
    pub codigo_modular: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub tipo: TipoSolicitante,
}
