//! Fuente de tiempo inyectable. El año de numeración y los días de atención
//! dependen del instante actual, así que los servicios lo reciben como
//! colaborador en lugar de llamar `Utc::now()` directo.

use chrono::{DateTime, Utc};

pub trait Reloj: Send + Sync {
    fn ahora(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RelojSistema;

impl Reloj for RelojSistema {
    fn ahora(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Reloj congelado para pruebas.
#[derive(Debug, Clone, Copy)]
pub struct RelojFijo(pub DateTime<Utc>);

impl Reloj for RelojFijo {
    fn ahora(&self) -> DateTime<Utc> {
        self.0
    }
}
