//! Guardia de odómetro
//!
//! Invariantes de kilometraje y fecha para abrir y cerrar viajes:
//! - apertura: el km inicial no puede retroceder respecto del último
//!   cierre registrado del vehículo (la igualdad está permitida)
//! - cierre: end_km estrictamente mayor que start_km, end_date no
//!   anterior a start_date
//!
//! Los mensajes de Conflict llevan el valor límite ofendido para que el
//! usuario sepa contra qué chocó.

use chrono::NaiveDate;

use crate::database::schema_probe::SchemaCapabilities;
use crate::models::trip::Trip;
use crate::utils::errors::{AppError, AppResult};

/// Validar la apertura de un viaje contra el último cierre del vehículo.
/// En schemas sin columna end_km no hay historial de cierres que
/// respetar y el chequeo se omite.
pub async fn validate_open<'e, E>(
    executor: E,
    caps: &SchemaCapabilities,
    vehicle_id: i64,
    start_km: i64,
) -> AppResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    if !caps.trips_have_end_km {
        return Ok(());
    }

    let ended = if caps.trips_have_status {
        "status = 'ended'"
    } else {
        "end_date IS NOT NULL"
    };

    let sql = format!(
        "SELECT end_km FROM trips \
         WHERE vehicle_id = $1 AND {} AND end_km IS NOT NULL \
         ORDER BY id DESC LIMIT 1",
        ended
    );

    let last_end_km: Option<i64> = sqlx::query_scalar(&sql)
        .bind(vehicle_id)
        .fetch_optional(executor)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error fetching last ended trip: {}", e)))?;

    if let Some(last) = last_end_km {
        if start_km < last {
            return Err(AppError::Conflict(format!(
                "start km must be at least the last recorded end km ({})",
                last
            )));
        }
    }

    Ok(())
}

/// Validar el cierre de un viaje. Puro: opera sobre estado ya leído.
pub fn validate_close(trip: &Trip, end_km: i64, end_date: NaiveDate) -> AppResult<()> {
    if end_km <= trip.start_km {
        return Err(AppError::Conflict(format!(
            "end km must be greater than start km ({})",
            trip.start_km
        )));
    }

    if end_date < trip.start_date {
        return Err(AppError::Conflict(format!(
            "end date must not precede start date ({})",
            trip.start_date
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ongoing_trip(start_km: i64, start_date: NaiveDate) -> Trip {
        Trip {
            id: 1,
            vehicle_id: 7,
            start_date,
            start_km,
            end_date: None,
            end_km: None,
            status: "ongoing".to_string(),
            note: None,
            gps_lat: None,
            gps_lng: None,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_close_rejects_end_km_equal_to_start_km() {
        let trip = ongoing_trip(500, d(2026, 8, 1));
        let err = validate_close(&trip, 500, d(2026, 8, 2)).unwrap_err();
        assert!(
            matches!(err, AppError::Conflict(msg) if msg == "end km must be greater than start km (500)")
        );
    }

    #[test]
    fn test_close_rejects_end_km_below_start_km() {
        let trip = ongoing_trip(500, d(2026, 8, 1));
        assert!(validate_close(&trip, 400, d(2026, 8, 2)).is_err());
    }

    #[test]
    fn test_close_accepts_greater_end_km() {
        let trip = ongoing_trip(500, d(2026, 8, 1));
        assert!(validate_close(&trip, 600, d(2026, 8, 2)).is_ok());
    }

    #[test]
    fn test_close_rejects_end_date_before_start_date() {
        let trip = ongoing_trip(500, d(2026, 8, 10));
        let err = validate_close(&trip, 600, d(2026, 8, 9)).unwrap_err();
        assert!(
            matches!(err, AppError::Conflict(msg) if msg.contains("end date must not precede start date"))
        );
    }

    #[test]
    fn test_close_accepts_same_day_close() {
        let trip = ongoing_trip(500, d(2026, 8, 10));
        assert!(validate_close(&trip, 501, d(2026, 8, 10)).is_ok());
    }
}
