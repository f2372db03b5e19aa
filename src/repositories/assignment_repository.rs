//! Repositorio de asignaciones (sincronizador)
//!
//! Mantiene la asignación vigente de vehículo/planta por persona.
//! El upsert es idempotente y se invoca por cada conductor y ayudante
//! cada vez que su membresía en un roster cambia. Los cambios de viaje
//! nunca borran asignaciones; limpiar es una operación aparte.

use sqlx::{PgConnection, PgPool};

use crate::database::schema_probe::SchemaCapabilities;
use crate::models::assignment::Assignment;
use crate::repositories::trip_repository::map_roster_person_error;
use crate::utils::errors::{AppError, AppResult};

/// El conflicto se resuelve por driver_id: dos upserts con los mismos
/// argumentos dejan exactamente una fila
const UPSERT_ASSIGNMENT_SQL: &str = r#"
    INSERT INTO assignments (driver_id, vehicle_id, plant_id, assigned_date)
    VALUES ($1, $2, $3, CURRENT_DATE)
    ON CONFLICT (driver_id) DO UPDATE
    SET vehicle_id = EXCLUDED.vehicle_id,
        plant_id = EXCLUDED.plant_id,
        assigned_date = EXCLUDED.assigned_date
"#;

/// Upsert idempotente por driver_id; en conflicto pisa vehículo, planta
/// y fecha con los valores nuevos (última escritura gana).
pub async fn upsert_assignment(
    conn: &mut PgConnection,
    caps: &SchemaCapabilities,
    driver_id: i64,
    vehicle_id: i64,
    plant_id: i64,
) -> AppResult<()> {
    sqlx::query(UPSERT_ASSIGNMENT_SQL)
    .bind(driver_id)
    .bind(vehicle_id)
    .bind(plant_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_roster_person_error(e, driver_id))?;

    // Espejar la planta sobre la fila del conductor solo si el schema
    // trae la columna opcional
    if caps.drivers_have_plant {
        sqlx::query("UPDATE drivers SET current_plant_id = $2 WHERE id = $1")
            .bind(driver_id)
            .bind(plant_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!(
                    "Error mirroring plant onto driver {}: {}",
                    driver_id, e
                ))
            })?;
    }

    Ok(())
}

/// Limpiar explícitamente la asignación de un conductor (vehículo a NULL).
/// Operación estrecha y aislada; no es efecto colateral de ningún viaje.
pub async fn clear_assignment(pool: &PgPool, driver_id: i64) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE assignments SET vehicle_id = NULL, assigned_date = CURRENT_DATE WHERE driver_id = $1",
    )
    .bind(driver_id)
    .execute(pool)
    .await
    .map_err(|e| {
        AppError::DatabaseError(format!(
            "Error clearing assignment for driver {}: {}",
            driver_id, e
        ))
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "no assignment recorded for driver {}",
            driver_id
        )));
    }

    Ok(())
}

/// Asignación vigente de un conductor, si existe
pub async fn find_by_driver(pool: &PgPool, driver_id: i64) -> AppResult<Option<Assignment>> {
    sqlx::query_as::<_, Assignment>(
        "SELECT driver_id, vehicle_id, plant_id, assigned_date FROM assignments WHERE driver_id = $1",
    )
    .bind(driver_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        AppError::DatabaseError(format!(
            "Error fetching assignment for driver {}: {}",
            driver_id, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_conflicts_on_driver_id_only() {
        // La clave de idempotencia es la persona: repetir el upsert con
        // los mismos argumentos no puede crear una segunda fila
        assert!(UPSERT_ASSIGNMENT_SQL.contains("ON CONFLICT (driver_id) DO UPDATE"));
    }

    #[test]
    fn test_upsert_overwrites_every_mutable_column() {
        assert!(UPSERT_ASSIGNMENT_SQL.contains("vehicle_id = EXCLUDED.vehicle_id"));
        assert!(UPSERT_ASSIGNMENT_SQL.contains("plant_id = EXCLUDED.plant_id"));
        assert!(UPSERT_ASSIGNMENT_SQL.contains("assigned_date = EXCLUDED.assigned_date"));
    }
}
