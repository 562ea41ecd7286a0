//! Estados del ciclo de vida de un expediente.
//!
//! Los valores en texto son parte del contrato público (se comparan
//! literalmente en la base de datos y en el código de seguimiento), por lo
//! que el parseo es estricto: mayúsculas exactas, con espacios, sin
//! normalización.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Ciclo: RECEPCIONADO → EN PROCESO → OBSERVADO → LISTO PARA ENTREGA →
/// ENTREGADO. Las transiciones no se restringen aquí; sólo la entrega exige
/// el estado previo LISTO PARA ENTREGA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Estado {
    #[serde(rename = "RECEPCIONADO")]
    Recepcionado,
    #[serde(rename = "EN PROCESO")]
    EnProceso,
    #[serde(rename = "OBSERVADO")]
    Observado,
    #[serde(rename = "LISTO PARA ENTREGA")]
    ListoParaEntrega,
    #[serde(rename = "ENTREGADO")]
    Entregado,
}

impl Estado {
    pub const TODOS: [Estado; 5] = [Estado::Recepcionado,
                                    Estado::EnProceso,
                                    Estado::Observado,
                                    Estado::ListoParaEntrega,
                                    Estado::Entregado];

    /// Representación exacta usada en almacenamiento y comparaciones.
    pub fn como_texto(&self) -> &'static str {
        match self {
            Estado::Recepcionado => "RECEPCIONADO",
            Estado::EnProceso => "EN PROCESO",
            Estado::Observado => "OBSERVADO",
            Estado::ListoParaEntrega => "LISTO PARA ENTREGA",
            Estado::Entregado => "ENTREGADO",
        }
    }

    /// ENTREGADO cierra el ciclo desde el punto de vista de la entrega.
    pub fn es_terminal(&self) -> bool {
        matches!(self, Estado::Entregado)
    }
}

impl fmt::Display for Estado {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.como_texto())
    }
}

impl FromStr for Estado {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Estado::TODOS.iter()
                     .find(|e| e.como_texto() == s)
                     .copied()
                     .ok_or_else(|| DomainError::validacion("estado", format!("estado desconocido: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parseo_estricto_sin_normalizacion() {
        assert_eq!("LISTO PARA ENTREGA".parse::<Estado>().unwrap(), Estado::ListoParaEntrega);
        assert!("listo para entrega".parse::<Estado>().is_err());
        assert!("LISTO_PARA_ENTREGA".parse::<Estado>().is_err());
        assert!("PENDIENTE".parse::<Estado>().is_err());
    }

    #[test]
    fn ida_y_vuelta_en_texto() {
        for estado in Estado::TODOS {
            assert_eq!(estado.como_texto().parse::<Estado>().unwrap(), estado);
        }
    }

    #[test]
    fn solo_entregado_es_terminal() {
        assert!(Estado::Entregado.es_terminal());
        assert!(!Estado::ListoParaEntrega.es_terminal());
    }
}
