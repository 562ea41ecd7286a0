//! Constantes del dominio de atención al ciudadano.

/// Actor por defecto cuando ninguna fuente de identidad aporta un nombre.
pub const USUARIO_SISTEMA: &str = "Sistema";

/// Funcionario por defecto al registrar una entrega sin identidad resuelta.
pub const ENTREGADOR_DEFECTO: &str = "Funcionario UGEL";

/// Plazo estándar de atención de un expediente, en días.
pub const DIAS_LIMITE_ATENCION: i64 = 10;

/// Umbral de días a partir del cual un expediente se considera próximo a
/// vencer.
pub const UMBRAL_PROXIMO_VENCER: i64 = 8;
