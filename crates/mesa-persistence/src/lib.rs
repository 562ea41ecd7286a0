//! mesa-persistence
//!
//! Implementación Postgres (Diesel) del contrato `Almacen` de `mesa-core`,
//! con paridad 1:1 respecto al backend en memoria: mismas unidades
//! atómicas, misma semántica de reversión y de numeración serializada.
//!
//! Módulos:
//! - `pg`: el almacén sobre Postgres (transacciones, bloqueo consultivo de
//!   numeración, reintento ante fallos transitorios).
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas para compilar queries.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::init_dotenv;
pub use error::PersistenceError;
pub use pg::{construir_pool, construir_pool_dev_desde_env, AlmacenPg, PgPool, ProveedorConexiones, ProveedorPool};
