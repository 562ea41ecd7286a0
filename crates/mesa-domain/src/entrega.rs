//! Entrega: el acto que cierra el ciclo del expediente.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TipoRecogida {
    #[serde(rename = "titular")]
    Titular,
    #[serde(rename = "tercero")]
    Tercero,
}

impl TipoRecogida {
    pub fn como_texto(&self) -> &'static str {
        match self {
            TipoRecogida::Titular => "titular",
            TipoRecogida::Tercero => "tercero",
        }
    }
}

impl fmt::Display for TipoRecogida {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.como_texto())
    }
}

impl FromStr for TipoRecogida {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "titular" => Ok(TipoRecogida::Titular),
            "tercero" => Ok(TipoRecogida::Tercero),
            otro => Err(DomainError::validacion("tipo_recogida",
                                                format!("debe ser \"titular\" o \"tercero\", no \"{otro}\""))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entrega {
    pub id_entrega: i64,
    pub expediente_id: i64,
    pub dni_recoge: String,
    pub tipo_recogida: TipoRecogida,
    pub nombre_autorizado: Option<String>,
    pub dni_autorizado: Option<String>,
    /// Referencia (ruta) al PDF de autorización; el blob vive fuera.
    pub documento_autorizacion: Option<String>,
    pub observaciones: Option<String>,
    pub fecha_entrega: DateTime<Utc>,
    pub hora_entrega: NaiveTime,
    pub dias_atencion: i32,
    pub entregado_por: String,
}

impl Entrega {
    /// DNI de quien efectivamente recogió: el autorizado cuando es un
    /// tercero, el titular en caso contrario.
    pub fn dni_efectivo(&self) -> &str {
        match self.tipo_recogida {
            TipoRecogida::Tercero => self.dni_autorizado.as_deref().unwrap_or(&self.dni_recoge),
            TipoRecogida::Titular => &self.dni_recoge,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NuevaEntrega {
    pub expediente_id: i64,
    pub dni_recoge: String,
    pub tipo_recogida: TipoRecogida,
    pub nombre_autorizado: Option<String>,
    pub dni_autorizado: Option<String>,
    pub documento_autorizacion: Option<String>,
    pub observaciones: Option<String>,
    pub fecha_entrega: DateTime<Utc>,
    pub hora_entrega: NaiveTime,
    pub dias_atencion: i32,
    pub entregado_por: String,
}

/// DNI peruano: exactamente 8 dígitos.
pub fn es_dni_valido(dni: &str) -> bool {
    dni.len() == 8 && dni.bytes().all(|b| b.is_ascii_digit())
}

/// Días transcurridos entre la recepción y la entrega, en días completos y
/// nunca negativos (valor absoluto, aun con fechas invertidas).
pub fn dias_atencion(fecha_recepcion: NaiveDate, entregado_en: DateTime<Utc>) -> i32 {
    (entregado_en.date_naive() - fecha_recepcion).num_days().unsigned_abs() as i32
}

/// Bloque de texto que se anexa a las observaciones del expediente al
/// registrar la entrega. El formato es el del acta impresa.
pub fn nota_entrega(observaciones_previas: Option<&str>,
                    entregado_en: DateTime<Utc>,
                    tipo: TipoRecogida,
                    dni_efectivo: &str,
                    entregado_por: &str,
                    observaciones: Option<&str>)
                    -> String {
    let mut nota = observaciones_previas.unwrap_or_default().to_owned();
    nota.push_str("\n--- ENTREGA REGISTRADA ---\n");
    nota.push_str(&format!("Fecha: {}\n", entregado_en.format("%d/%m/%Y %H:%M:%S")));
    nota.push_str(&format!("Tipo: {}\n", tipo.como_texto().to_uppercase()));
    nota.push_str(&format!("DNI: {dni_efectivo}\n"));
    nota.push_str(&format!("Entregado por: {entregado_por}\n"));
    if let Some(obs) = observaciones {
        nota.push_str(&format!("Observaciones: {obs}\n"));
    }
    nota.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn dias_completos_y_no_negativos() {
        let recepcion = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let entrega = Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap();
        assert_eq!(dias_atencion(recepcion, entrega), 5);

        // Fecha de recepción posterior a la entrega (corrección manual):
        // el resultado sigue siendo positivo.
        let recepcion_futura = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();
        assert_eq!(dias_atencion(recepcion_futura, entrega), 5);

        assert_eq!(dias_atencion(entrega.date_naive(), entrega), 0);
    }

    #[test]
    fn validacion_de_dni() {
        assert!(es_dni_valido("12345678"));
        assert!(!es_dni_valido("1234567"));
        assert!(!es_dni_valido("123456789"));
        assert!(!es_dni_valido("12a45678"));
    }

    #[test]
    fn nota_conserva_observaciones_previas() {
        let cuando = Utc.with_ymd_and_hms(2026, 1, 15, 14, 5, 0).unwrap();
        let nota = nota_entrega(Some("Derivado a escalafón"),
                                cuando,
                                TipoRecogida::Tercero,
                                "87654321",
                                "V. Paredes",
                                Some("recojo con carta poder"));
        assert!(nota.starts_with("Derivado a escalafón\n--- ENTREGA REGISTRADA ---"));
        assert!(nota.contains("Fecha: 15/01/2026 14:05:00"));
        assert!(nota.contains("Tipo: TERCERO"));
        assert!(nota.contains("DNI: 87654321"));
        assert!(nota.contains("Entregado por: V. Paredes"));
        assert!(nota.ends_with("Observaciones: recojo con carta poder"));
    }

    #[test]
    fn nota_sin_previas_ni_observaciones() {
        let cuando = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        let nota = nota_entrega(None, cuando, TipoRecogida::Titular, "12345678", "Funcionario UGEL", None);
        assert!(nota.starts_with("--- ENTREGA REGISTRADA ---"));
        assert!(nota.ends_with("Entregado por: Funcionario UGEL"));
    }

    #[test]
    fn dni_efectivo_segun_tipo() {
        let base = Entrega { id_entrega: 1,
                             expediente_id: 1,
                             dni_recoge: "11111111".into(),
                             tipo_recogida: TipoRecogida::Titular,
                             nombre_autorizado: None,
                             dni_autorizado: None,
                             documento_autorizacion: None,
                             observaciones: None,
                             fecha_entrega: Utc::now(),
                             hora_entrega: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                             dias_atencion: 0,
                             entregado_por: "Funcionario UGEL".into() };
        assert_eq!(base.dni_efectivo(), "11111111");

        let tercero = Entrega { tipo_recogida: TipoRecogida::Tercero,
                                dni_autorizado: Some("22222222".into()),
                                ..base };
        assert_eq!(tercero.dni_efectivo(), "22222222");
    }
}
