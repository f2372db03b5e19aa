//! DTOs del dominio de viajes
//!
//! Requests y responses serde del API; el shape de transporte vive acá,
//! separado de los modelos de fila.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::trip::{Trip, TripDetail};

// Request para abrir un viaje
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTripRequest {
    pub vehicle_id: i64,
    pub start_date: NaiveDate,
    pub start_km: i64,
    #[validate(length(min = 1, message = "at least one driver is required"))]
    pub driver_ids: Vec<i64>,
    #[validate(length(min = 1, message = "at least one customer name is required"))]
    pub customer_names: Vec<String>,
    pub helper_ids: Option<Vec<i64>>,
    pub note: Option<String>,
    pub gps_lat: Option<f64>,
    pub gps_lng: Option<f64>,
}

// Request para mutar el roster de un viaje en curso
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTripRequest {
    pub set_driver_ids: Option<Vec<i64>>,
    pub set_helper_ids: Option<Vec<i64>>,
    pub add_customer_names: Option<Vec<String>>,
    pub set_customer_names: Option<Vec<String>>,
    pub note: Option<String>,
}

impl UpdateTripRequest {
    /// true si el request no pide ningún cambio
    pub fn is_empty(&self) -> bool {
        self.set_driver_ids.is_none()
            && self.set_helper_ids.is_none()
            && self.add_customer_names.is_none()
            && self.set_customer_names.is_none()
            && self.note.is_none()
    }
}

// Request para cerrar un viaje con lectura de odómetro
#[derive(Debug, Deserialize)]
pub struct EndTripRequest {
    pub end_date: NaiveDate,
    pub end_km: i64,
}

// Parámetros de query del listado por vehículo
#[derive(Debug, Default, Deserialize)]
pub struct ListTripsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Ids separados por coma, ej. "3,5,9"
    pub driver_ids: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTripResponse {
    pub trip_id: i64,
}

#[derive(Debug, Serialize)]
pub struct EndTripResponse {
    pub trip_id: i64,
    pub total_km: i64,
}

// Fila del listado
#[derive(Debug, Serialize)]
pub struct TripSummaryResponse {
    pub id: i64,
    pub vehicle_id: i64,
    pub start_date: NaiveDate,
    pub start_km: i64,
    pub end_date: Option<NaiveDate>,
    pub end_km: Option<i64>,
    pub status: String,
    pub note: Option<String>,
}

impl From<Trip> for TripSummaryResponse {
    fn from(t: Trip) -> Self {
        Self {
            id: t.id,
            vehicle_id: t.vehicle_id,
            start_date: t.start_date,
            start_km: t.start_km,
            end_date: t.end_date,
            end_km: t.end_km,
            status: t.status,
            note: t.note,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TripListResponse {
    pub rows: Vec<TripSummaryResponse>,
    pub has_more: bool,
}

// Detalle con rosters resueltos. Expone tanto el helper_id legacy como
// el array completo por compatibilidad con clientes viejos.
#[derive(Debug, Serialize)]
pub struct TripDetailResponse {
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
    pub driver_ids: Vec<i64>,
    pub helper_id: Option<i64>,
    pub helper_ids: Vec<i64>,
    pub helper_names: Vec<String>,
    pub customer_names: Vec<String>,
}

impl From<TripDetail> for TripDetailResponse {
    fn from(d: TripDetail) -> Self {
        Self {
            id: d.trip.id,
            vehicle_id: d.trip.vehicle_id,
            start_date: d.trip.start_date,
            start_km: d.trip.start_km,
            end_date: d.trip.end_date,
            end_km: d.trip.end_km,
            status: d.trip.status,
            note: d.trip.note,
            gps_lat: d.trip.gps_lat,
            gps_lng: d.trip.gps_lng,
            driver_ids: d.driver_ids,
            helper_id: d.helper_id,
            helper_ids: d.helper_ids,
            helper_names: d.helper_names,
            customer_names: d.customer_names,
        }
    }
}

// Response genérica
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_request_parses_dates_iso() {
        let req: CreateTripRequest = serde_json::from_value(json!({
            "vehicle_id": 7,
            "start_date": "2026-08-18",
            "start_km": 100,
            "driver_ids": [3],
            "customer_names": ["Acme SA"]
        }))
        .unwrap();

        assert_eq!(req.start_date, NaiveDate::from_ymd_opt(2026, 8, 18).unwrap());
        assert!(req.helper_ids.is_none());
    }

    #[test]
    fn test_update_request_is_empty() {
        let req: UpdateTripRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.is_empty());

        let req: UpdateTripRequest =
            serde_json::from_value(json!({ "note": "cambio de turno" })).unwrap();
        assert!(!req.is_empty());
    }

    #[test]
    fn test_end_trip_response_shape() {
        let body = serde_json::to_value(EndTripResponse {
            trip_id: 9,
            total_km: 100,
        })
        .unwrap();
        assert_eq!(body, json!({ "trip_id": 9, "total_km": 100 }));
    }
}
