//! Sondeo de capacidades del schema
//!
//! El tracker corre contra varias generaciones de schema sin paso de
//! migración: los ayudantes pueden vivir en una tabla junction plural,
//! en una columna legacy de ayudante único, o en una columna de texto
//! delimitada por comas. Igual con las columnas opcionales `status`,
//! `end_km` y `drivers.current_plant_id`.
//!
//! Las sondas consultan information_schema y son de solo lectura. Las
//! capacidades se resuelven UNA vez en el arranque y viajan en el
//! AppState; ningún query las re-deriva por llamada.

use sqlx::PgPool;

use crate::utils::errors::{AppError, AppResult};

/// Estrategia de almacenamiento de ayudantes, en orden estricto de
/// preferencia: tabla junction -> columna legacy -> texto denormalizado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperStorage {
    /// Tabla `trip_helpers (trip_id, driver_id)`, multi-ayudante
    JunctionTable,
    /// Columna `trips.helper_id`: solo persiste el primer ayudante
    LegacyColumn,
    /// Columna `trips.helpers_text`: ids separados por coma
    TextColumn,
}

/// Capacidades detectadas del schema, resueltas en el arranque
#[derive(Debug, Clone)]
pub struct SchemaCapabilities {
    pub helper_storage: HelperStorage,
    /// false: "en curso" se deriva de `end_date IS NULL`
    pub trips_have_status: bool,
    /// false: el chequeo de odómetro contra el último cierre se omite
    pub trips_have_end_km: bool,
    /// true: el sincronizador espeja la planta sobre la fila del conductor
    pub drivers_have_plant: bool,
}

impl SchemaCapabilities {
    /// Detectar las capacidades del store al arranque del proceso
    pub async fn detect(pool: &PgPool) -> AppResult<Self> {
        let has_helper_table = table_exists(pool, "trip_helpers").await?;
        let has_helper_column = column_exists(pool, "trips", "helper_id").await?;

        Ok(Self {
            helper_storage: choose_helper_storage(has_helper_table, has_helper_column),
            trips_have_status: column_exists(pool, "trips", "status").await?,
            trips_have_end_km: column_exists(pool, "trips", "end_km").await?,
            drivers_have_plant: column_exists(pool, "drivers", "current_plant_id").await?,
        })
    }

    /// Capacidades del schema canónico moderno (útil en tests)
    pub fn modern() -> Self {
        Self {
            helper_storage: HelperStorage::JunctionTable,
            trips_have_status: true,
            trips_have_end_km: true,
            drivers_have_plant: true,
        }
    }
}

/// Elegir la estrategia de ayudantes según lo que exista en el schema.
/// El texto denormalizado es el último recurso cuando no hay ni tabla
/// ni columna legacy.
pub fn choose_helper_storage(has_junction_table: bool, has_legacy_column: bool) -> HelperStorage {
    if has_junction_table {
        HelperStorage::JunctionTable
    } else if has_legacy_column {
        HelperStorage::LegacyColumn
    } else {
        HelperStorage::TextColumn
    }
}

/// ¿Existe la tabla en el schema actual?
pub async fn table_exists(pool: &PgPool, table: &str) -> AppResult<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.tables
            WHERE table_schema = current_schema() AND table_name = $1
        )
        "#,
    )
    .bind(table)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Error probing table '{}': {}", table, e)))
}

/// ¿Existe la columna en la tabla?
pub async fn column_exists(pool: &PgPool, table: &str, column: &str) -> AppResult<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.columns
            WHERE table_schema = current_schema()
              AND table_name = $1 AND column_name = $2
        )
        "#,
    )
    .bind(table)
    .bind(column)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        AppError::DatabaseError(format!(
            "Error probing column '{}.{}': {}",
            table, column, e
        ))
    })
}

/// Parsear la columna de texto legacy "3,5,9" a ids; las entradas no
/// numéricas se descartan en silencio (datos viejos sucios)
pub fn parse_helpers_text(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

/// Serializar ids de ayudantes a la columna de texto legacy
pub fn join_helpers_text(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_order_junction_wins() {
        assert_eq!(
            choose_helper_storage(true, true),
            HelperStorage::JunctionTable
        );
        assert_eq!(
            choose_helper_storage(true, false),
            HelperStorage::JunctionTable
        );
    }

    #[test]
    fn test_preference_order_legacy_then_text() {
        assert_eq!(
            choose_helper_storage(false, true),
            HelperStorage::LegacyColumn
        );
        assert_eq!(
            choose_helper_storage(false, false),
            HelperStorage::TextColumn
        );
    }

    #[test]
    fn test_parse_helpers_text_skips_garbage() {
        assert_eq!(parse_helpers_text("3, 5,abc,9,"), vec![3, 5, 9]);
        assert_eq!(parse_helpers_text(""), Vec::<i64>::new());
    }

    #[test]
    fn test_join_round_trips() {
        let ids = vec![3, 5, 9];
        assert_eq!(parse_helpers_text(&join_helpers_text(&ids)), ids);
    }
}
