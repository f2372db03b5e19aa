//! Modelo de Trip
//!
//! Este módulo contiene el struct Trip y sus variantes de lectura.
//! Mapea a la tabla trips; en schemas legacy sin columna `status` el
//! repositorio sintetiza el campo a partir de `end_date`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Estados válidos de un viaje. Transición única: ongoing -> ended,
/// nunca al revés.
pub const STATUS_ONGOING: &str = "ongoing";
pub const STATUS_ENDED: &str = "ended";

/// Trip principal - fila de la tabla trips
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: i64,
    pub vehicle_id: i64,
    pub start_date: NaiveDate,
    pub start_km: i64,
    pub end_date: Option<NaiveDate>,
    pub end_km: Option<i64>,
    pub status: String,
    pub note: Option<String>,
    pub gps_lat: Option<f64>,
    pub gps_lng: Option<f64>,
}

impl Trip {
    pub fn is_ongoing(&self) -> bool {
        self.status == STATUS_ONGOING
    }
}

/// Detalle completo de un viaje con sus rosters resueltos
#[derive(Debug, Clone, Serialize)]
pub struct TripDetail {
    pub trip: Trip,
    pub driver_ids: Vec<i64>,
    /// Primer ayudante, expuesto aparte por compatibilidad con clientes
    /// que solo conocen el campo legacy de ayudante único
    pub helper_id: Option<i64>,
    pub helper_ids: Vec<i64>,
    pub helper_names: Vec<String>,
    pub customer_names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(status: &str) -> Trip {
        Trip {
            id: 1,
            vehicle_id: 7,
            start_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            start_km: 500,
            end_date: None,
            end_km: None,
            status: status.to_string(),
            note: None,
            gps_lat: None,
            gps_lng: None,
        }
    }

    #[test]
    fn test_is_ongoing() {
        assert!(trip(STATUS_ONGOING).is_ongoing());
        assert!(!trip(STATUS_ENDED).is_ongoing());
    }
}
