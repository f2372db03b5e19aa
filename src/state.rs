//! Shared application state
//!
//! Estado compartido que viaja por el router de Axum: pool de
//! conexiones, configuración y las capacidades del schema resueltas
//! una sola vez en el arranque.

use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::database::schema_probe::SchemaCapabilities;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: EnvironmentConfig,
    pub caps: SchemaCapabilities,
}

impl AppState {
    pub fn new(pool: PgPool, config: EnvironmentConfig, caps: SchemaCapabilities) -> Self {
        Self { pool, config, caps }
    }
}
