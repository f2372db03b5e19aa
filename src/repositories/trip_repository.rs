//! Repositorio de viajes
//!
//! Lecturas y escrituras de la fila de viaje y sus tablas de roster
//! (conductores, ayudantes, clientes). Las escrituras reciben una
//! conexión ya dentro de la transacción del controller; este módulo
//! nunca abre ni commitea transacciones por su cuenta.
//!
//! Todo el SQL se arma contra las capacidades detectadas en el
//! arranque: en schemas legacy sin `status` el estado se sintetiza de
//! `end_date`, y los ayudantes se persisten según la estrategia elegida
//! por el probe.

use chrono::NaiveDate;
use sqlx::PgConnection;

use crate::database::schema_probe::{
    join_helpers_text, parse_helpers_text, HelperStorage, SchemaCapabilities,
};
use crate::models::trip::{Trip, TripDetail};
use crate::utils::errors::{is_foreign_key_violation, is_unique_violation, AppError, AppResult};
use crate::utils::validation::roster_diff;

/// Datos de un viaje nuevo, ya validados por el controller
#[derive(Debug, Clone)]
pub struct NewTrip {
    pub vehicle_id: i64,
    pub start_date: NaiveDate,
    pub start_km: i64,
    pub note: Option<String>,
    pub gps_lat: Option<f64>,
    pub gps_lng: Option<f64>,
}

/// Proyección uniforme de la fila de viaje. En schemas sin `status` el
/// campo se deriva de end_date; sin `end_km` se proyecta NULL.
fn trip_select(caps: &SchemaCapabilities) -> String {
    let status = if caps.trips_have_status {
        "t.status"
    } else {
        "CASE WHEN t.end_date IS NULL THEN 'ongoing' ELSE 'ended' END"
    };
    let end_km = if caps.trips_have_end_km {
        "t.end_km"
    } else {
        "NULL::BIGINT"
    };

    format!(
        "SELECT t.id, t.vehicle_id, t.start_date, t.start_km, t.end_date, \
         {} AS end_km, {} AS status, t.note, t.gps_lat, t.gps_lng FROM trips t",
        end_km, status
    )
}

/// Predicado SQL de "viaje en curso" según la generación del schema
fn ongoing_predicate(caps: &SchemaCapabilities) -> &'static str {
    if caps.trips_have_status {
        "t.status = 'ongoing'"
    } else {
        "t.end_date IS NULL"
    }
}

/// Traducir la violación del índice único parcial (23505) al conflicto
/// de negocio; cualquier otro error de insert es de almacenamiento.
/// Clasificar el SQLSTATE del insert de viaje: 23505 es el perdedor de
/// la carrera por el índice único parcial
fn classify_trip_insert_code(code: Option<&str>, vehicle_id: i64) -> Option<AppError> {
    if is_unique_violation(code) {
        return Some(AppError::Conflict(format!(
            "vehicle {} already has an ongoing trip",
            vehicle_id
        )));
    }
    None
}

fn map_trip_insert_error(e: sqlx::Error, vehicle_id: i64) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if let Some(err) = classify_trip_insert_code(db_err.code().as_deref(), vehicle_id) {
            return err;
        }
    }
    AppError::DatabaseError(format!("Error creating trip: {}", e))
}

/// Un id de persona que no referencia a nadie rompe la FK del roster
/// (23503); eso es un NotFound del dominio, no un error de storage.
fn classify_roster_person_code(code: Option<&str>, driver_id: i64) -> Option<AppError> {
    if is_foreign_key_violation(code) {
        return Some(AppError::NotFound(format!("driver {} not found", driver_id)));
    }
    None
}

pub(crate) fn map_roster_person_error(e: sqlx::Error, driver_id: i64) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if let Some(err) = classify_roster_person_code(db_err.code().as_deref(), driver_id) {
            return err;
        }
    }
    AppError::DatabaseError(format!("Error writing roster row: {}", e))
}

/// Insertar la fila del viaje en estado ongoing
pub async fn insert_trip(
    conn: &mut PgConnection,
    caps: &SchemaCapabilities,
    new_trip: &NewTrip,
) -> AppResult<i64> {
    let sql = if caps.trips_have_status {
        "INSERT INTO trips (vehicle_id, start_date, start_km, status, note, gps_lat, gps_lng) \
         VALUES ($1, $2, $3, 'ongoing', $4, $5, $6) RETURNING id"
    } else {
        "INSERT INTO trips (vehicle_id, start_date, start_km, note, gps_lat, gps_lng) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id"
    };

    sqlx::query_scalar::<_, i64>(sql)
        .bind(new_trip.vehicle_id)
        .bind(new_trip.start_date)
        .bind(new_trip.start_km)
        .bind(&new_trip.note)
        .bind(new_trip.gps_lat)
        .bind(new_trip.gps_lng)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_trip_insert_error(e, new_trip.vehicle_id))
}

/// Buscar un viaje por id
pub async fn find_trip(
    conn: &mut PgConnection,
    caps: &SchemaCapabilities,
    trip_id: i64,
) -> AppResult<Option<Trip>> {
    let sql = format!("{} WHERE t.id = $1", trip_select(caps));
    sqlx::query_as::<_, Trip>(&sql)
        .bind(trip_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error finding trip {}: {}", trip_id, e)))
}

/// Buscar un viaje por id tomando el lock de fila para la transacción
pub async fn find_trip_for_update(
    conn: &mut PgConnection,
    caps: &SchemaCapabilities,
    trip_id: i64,
) -> AppResult<Option<Trip>> {
    let sql = format!("{} WHERE t.id = $1 FOR UPDATE", trip_select(caps));
    sqlx::query_as::<_, Trip>(&sql)
        .bind(trip_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error locking trip {}: {}", trip_id, e)))
}

/// Planta a la que pertenece el vehículo; NotFound si el vehículo no existe
pub async fn vehicle_plant(conn: &mut PgConnection, vehicle_id: i64) -> AppResult<i64> {
    sqlx::query_scalar::<_, i64>("SELECT plant_id FROM vehicles WHERE id = $1")
        .bind(vehicle_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error fetching vehicle {}: {}", vehicle_id, e)))?
        .ok_or_else(|| AppError::NotFound(format!("vehicle {} not found", vehicle_id)))
}

// ---------------------------------------------------------------------------
// Roster de conductores
// ---------------------------------------------------------------------------

pub async fn fetch_driver_ids(conn: &mut PgConnection, trip_id: i64) -> AppResult<Vec<i64>> {
    sqlx::query_scalar::<_, i64>(
        "SELECT driver_id FROM trip_drivers WHERE trip_id = $1 ORDER BY driver_id",
    )
    .bind(trip_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Error fetching trip drivers: {}", e)))
}

/// Llevar el roster de conductores del estado actual al objetivo:
/// inserta los que faltan, borra los que sobran.
pub async fn replace_drivers(
    conn: &mut PgConnection,
    trip_id: i64,
    target: &[i64],
) -> AppResult<()> {
    let current = fetch_driver_ids(conn, trip_id).await?;
    let (to_insert, to_delete) = roster_diff(&current, target);

    for driver_id in to_insert {
        sqlx::query(
            "INSERT INTO trip_drivers (trip_id, driver_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(trip_id)
        .bind(driver_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_roster_person_error(e, driver_id))?;
    }

    if !to_delete.is_empty() {
        sqlx::query("DELETE FROM trip_drivers WHERE trip_id = $1 AND driver_id = ANY($2)")
            .bind(trip_id)
            .bind(&to_delete)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error removing trip drivers: {}", e)))?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Roster de ayudantes: tres estrategias de almacenamiento
// ---------------------------------------------------------------------------

/// Ids de ayudantes del viaje según la estrategia activa
pub async fn fetch_helper_ids(
    conn: &mut PgConnection,
    caps: &SchemaCapabilities,
    trip_id: i64,
) -> AppResult<Vec<i64>> {
    match caps.helper_storage {
        HelperStorage::JunctionTable => sqlx::query_scalar::<_, i64>(
            "SELECT driver_id FROM trip_helpers WHERE trip_id = $1 ORDER BY driver_id",
        )
        .bind(trip_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error fetching trip helpers: {}", e))),

        HelperStorage::LegacyColumn => {
            let helper: Option<i64> =
                sqlx::query_scalar("SELECT helper_id FROM trips WHERE id = $1")
                    .bind(trip_id)
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(|e| {
                        AppError::DatabaseError(format!("Error fetching legacy helper: {}", e))
                    })?
                    .flatten();
            Ok(helper.into_iter().collect())
        }

        HelperStorage::TextColumn => {
            let raw: Option<String> =
                sqlx::query_scalar("SELECT helpers_text FROM trips WHERE id = $1")
                    .bind(trip_id)
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(|e| {
                        AppError::DatabaseError(format!("Error fetching helpers text: {}", e))
                    })?
                    .flatten();
            Ok(raw.map(|t| parse_helpers_text(&t)).unwrap_or_default())
        }
    }
}

/// Llevar el roster de ayudantes al objetivo. En la tabla junction se
/// aplica diferencia de conjuntos; las variantes legacy se reescriben
/// enteras (la columna única solo conserva el primer ayudante).
pub async fn replace_helpers(
    conn: &mut PgConnection,
    caps: &SchemaCapabilities,
    trip_id: i64,
    target: &[i64],
) -> AppResult<()> {
    match caps.helper_storage {
        HelperStorage::JunctionTable => {
            let current = fetch_helper_ids(conn, caps, trip_id).await?;
            let (to_insert, to_delete) = roster_diff(&current, target);

            for driver_id in to_insert {
                sqlx::query(
                    "INSERT INTO trip_helpers (trip_id, driver_id) VALUES ($1, $2) \
                     ON CONFLICT DO NOTHING",
                )
                .bind(trip_id)
                .bind(driver_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| map_roster_person_error(e, driver_id))?;
            }

            if !to_delete.is_empty() {
                sqlx::query("DELETE FROM trip_helpers WHERE trip_id = $1 AND driver_id = ANY($2)")
                    .bind(trip_id)
                    .bind(&to_delete)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        AppError::DatabaseError(format!("Error removing trip helpers: {}", e))
                    })?;
            }
        }

        HelperStorage::LegacyColumn => {
            let first = target.first().copied();
            sqlx::query("UPDATE trips SET helper_id = $2 WHERE id = $1")
                .bind(trip_id)
                .bind(first)
                .execute(&mut *conn)
                .await
                .map_err(|e| map_roster_person_error(e, first.unwrap_or_default()))?;
        }

        HelperStorage::TextColumn => {
            let text = if target.is_empty() {
                None
            } else {
                Some(join_helpers_text(target))
            };
            sqlx::query("UPDATE trips SET helpers_text = $2 WHERE id = $1")
                .bind(trip_id)
                .bind(text)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Error storing helpers text: {}", e))
                })?;
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Roster de clientes (nombres libres, ordenados)
// ---------------------------------------------------------------------------

pub async fn fetch_customer_names(conn: &mut PgConnection, trip_id: i64) -> AppResult<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        "SELECT customer_name FROM trip_customers WHERE trip_id = $1 ORDER BY position",
    )
    .bind(trip_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Error fetching trip customers: {}", e)))
}

/// Reemplazo total de la lista de clientes, sin filas remanentes
pub async fn set_customer_names(
    conn: &mut PgConnection,
    trip_id: i64,
    names: &[String],
) -> AppResult<()> {
    sqlx::query("DELETE FROM trip_customers WHERE trip_id = $1")
        .bind(trip_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error clearing trip customers: {}", e)))?;

    insert_customer_names(conn, trip_id, names, 0).await
}

/// Agregar solo los nombres que todavía no figuran (comparación sin
/// distinguir mayúsculas), al final de la lista existente
pub async fn add_customer_names(
    conn: &mut PgConnection,
    trip_id: i64,
    names: &[String],
) -> AppResult<()> {
    let existing = fetch_customer_names(conn, trip_id).await?;
    let fresh = crate::utils::validation::names_to_append(&existing, names);
    insert_customer_names(conn, trip_id, &fresh, existing.len() as i32).await
}

async fn insert_customer_names(
    conn: &mut PgConnection,
    trip_id: i64,
    names: &[String],
    start_position: i32,
) -> AppResult<()> {
    for (offset, name) in names.iter().enumerate() {
        sqlx::query(
            "INSERT INTO trip_customers (trip_id, position, customer_name) VALUES ($1, $2, $3)",
        )
        .bind(trip_id)
        .bind(start_position + offset as i32)
        .bind(name)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error adding trip customer: {}", e)))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Nota, cierre, borrado
// ---------------------------------------------------------------------------

pub async fn update_note(
    conn: &mut PgConnection,
    trip_id: i64,
    note: &str,
) -> AppResult<()> {
    sqlx::query("UPDATE trips SET note = $2 WHERE id = $1")
        .bind(trip_id)
        .bind(note)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error updating trip note: {}", e)))?;
    Ok(())
}

/// Cerrar el viaje: fija end_date/end_km y pasa a ended. El guard de
/// odómetro ya corrió; acá solo se persiste.
pub async fn close_trip(
    conn: &mut PgConnection,
    caps: &SchemaCapabilities,
    trip_id: i64,
    end_date: NaiveDate,
    end_km: i64,
) -> AppResult<()> {
    let mut sets = vec!["end_date = $2"];
    if caps.trips_have_end_km {
        sets.push("end_km = $3");
    }
    if caps.trips_have_status {
        sets.push("status = 'ended'");
    }
    let sql = format!("UPDATE trips SET {} WHERE id = $1", sets.join(", "));

    let mut query = sqlx::query(&sql).bind(trip_id).bind(end_date);
    if caps.trips_have_end_km {
        query = query.bind(end_km);
    }

    let result = query
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error closing trip {}: {}", trip_id, e)))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("trip {} not found", trip_id)));
    }

    Ok(())
}

/// Borrado duro del viaje con cascada explícita de sus filas de roster.
/// Las cascadas se ejecutan a mano porque las generaciones legacy del
/// schema no traen ON DELETE CASCADE.
pub async fn delete_trip(
    conn: &mut PgConnection,
    caps: &SchemaCapabilities,
    trip_id: i64,
) -> AppResult<()> {
    sqlx::query("DELETE FROM trip_drivers WHERE trip_id = $1")
        .bind(trip_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error cascading trip drivers: {}", e)))?;

    sqlx::query("DELETE FROM trip_customers WHERE trip_id = $1")
        .bind(trip_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error cascading trip customers: {}", e)))?;

    if caps.helper_storage == HelperStorage::JunctionTable {
        sqlx::query("DELETE FROM trip_helpers WHERE trip_id = $1")
            .bind(trip_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error cascading trip helpers: {}", e)))?;
    }

    let result = sqlx::query("DELETE FROM trips WHERE id = $1")
        .bind(trip_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error deleting trip {}: {}", trip_id, e)))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("trip {} not found", trip_id)));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Lecturas compuestas
// ---------------------------------------------------------------------------

/// Listado de viajes de un vehículo: los en curso primero, después por
/// id descendente. has_more se computa trayendo limit+1 filas.
pub async fn list_trips_for_vehicle(
    conn: &mut PgConnection,
    caps: &SchemaCapabilities,
    vehicle_id: i64,
    driver_ids_filter: Option<&[i64]>,
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<Trip>, bool)> {
    let order = format!("ORDER BY ({}) DESC, t.id DESC", ongoing_predicate(caps));

    let mut rows: Vec<Trip> = match driver_ids_filter {
        Some(filter) => {
            let sql = format!(
                "{} WHERE t.vehicle_id = $1 AND EXISTS (\
                   SELECT 1 FROM trip_drivers td \
                   WHERE td.trip_id = t.id AND td.driver_id = ANY($2)) \
                 {} LIMIT $3 OFFSET $4",
                trip_select(caps),
                order
            );
            sqlx::query_as::<_, Trip>(&sql)
                .bind(vehicle_id)
                .bind(filter)
                .bind(limit + 1)
                .bind(offset)
                .fetch_all(&mut *conn)
                .await
        }
        None => {
            let sql = format!(
                "{} WHERE t.vehicle_id = $1 {} LIMIT $2 OFFSET $3",
                trip_select(caps),
                order
            );
            sqlx::query_as::<_, Trip>(&sql)
                .bind(vehicle_id)
                .bind(limit + 1)
                .bind(offset)
                .fetch_all(&mut *conn)
                .await
        }
    }
    .map_err(|e| AppError::DatabaseError(format!("Error listing trips: {}", e)))?;

    let has_more = rows.len() as i64 > limit;
    rows.truncate(limit as usize);

    Ok((rows, has_more))
}

/// Nombres de display para un conjunto de personas, en el orden de `ids`
async fn driver_names(conn: &mut PgConnection, ids: &[i64]) -> AppResult<Vec<String>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let pairs: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM drivers WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error fetching driver names: {}", e)))?;

    Ok(ids
        .iter()
        .filter_map(|id| {
            pairs
                .iter()
                .find(|(pid, _)| pid == id)
                .map(|(_, name)| name.clone())
        })
        .collect())
}

/// Detalle completo del viaje con rosters resueltos; None si no existe
pub async fn get_trip_detail(
    conn: &mut PgConnection,
    caps: &SchemaCapabilities,
    trip_id: i64,
) -> AppResult<Option<TripDetail>> {
    let Some(trip) = find_trip(conn, caps, trip_id).await? else {
        return Ok(None);
    };

    let driver_ids = fetch_driver_ids(conn, trip_id).await?;
    let helper_ids = fetch_helper_ids(conn, caps, trip_id).await?;
    let helper_names = driver_names(conn, &helper_ids).await?;
    let customer_names = fetch_customer_names(conn, trip_id).await?;

    Ok(Some(TripDetail {
        helper_id: helper_ids.first().copied(),
        trip,
        driver_ids,
        helper_ids,
        helper_names,
        customer_names,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trip::STATUS_ONGOING;

    #[test]
    fn test_trip_select_modern_uses_real_columns() {
        let caps = SchemaCapabilities::modern();
        let sql = trip_select(&caps);
        assert!(sql.contains("t.status"));
        assert!(sql.contains("t.end_km"));
        assert!(!sql.contains("CASE WHEN"));
    }

    #[test]
    fn test_trip_select_legacy_synthesizes_status() {
        let caps = SchemaCapabilities {
            trips_have_status: false,
            trips_have_end_km: false,
            ..SchemaCapabilities::modern()
        };
        let sql = trip_select(&caps);
        assert!(sql.contains("CASE WHEN t.end_date IS NULL THEN 'ongoing'"));
        assert!(sql.contains("NULL::BIGINT AS end_km"));
    }

    #[test]
    fn test_ongoing_predicate_per_generation() {
        assert_eq!(
            ongoing_predicate(&SchemaCapabilities::modern()),
            "t.status = 'ongoing'"
        );
        let legacy = SchemaCapabilities {
            trips_have_status: false,
            ..SchemaCapabilities::modern()
        };
        assert_eq!(ongoing_predicate(&legacy), "t.end_date IS NULL");
    }

    #[test]
    fn test_trip_insert_error_without_unique_code_is_storage() {
        let err = map_trip_insert_error(sqlx::Error::Protocol("boom".into()), 7);
        assert!(matches!(err, AppError::DatabaseError(_)));
    }

    #[test]
    fn test_duplicate_ongoing_maps_to_conflict_naming_the_vehicle() {
        let err = classify_trip_insert_code(Some("23505"), 7).unwrap();
        assert!(
            matches!(err, AppError::Conflict(msg) if msg == "vehicle 7 already has an ongoing trip")
        );
    }

    #[test]
    fn test_other_sqlstates_do_not_become_conflicts() {
        assert!(classify_trip_insert_code(Some("23503"), 7).is_none());
        assert!(classify_trip_insert_code(None, 7).is_none());
    }

    #[test]
    fn test_dangling_person_id_maps_to_not_found() {
        let err = classify_roster_person_code(Some("23503"), 5).unwrap();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "driver 5 not found"));
    }

    #[test]
    fn test_roster_person_error_without_fk_code_is_storage() {
        assert!(classify_roster_person_code(Some("23505"), 5).is_none());
        let err = map_roster_person_error(sqlx::Error::Protocol("boom".into()), 5);
        assert!(matches!(err, AppError::DatabaseError(_)));
    }

    #[test]
    fn test_status_constants_match_sql_literals() {
        // Los literales del SQL dinámico deben coincidir con el modelo
        assert!(ongoing_predicate(&SchemaCapabilities::modern()).contains(STATUS_ONGOING));
    }
}
