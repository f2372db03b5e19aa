//! Controller del ciclo de vida de viajes
//!
//! Máquina de estados None -> Ongoing -> Ended (terminal), con borrado
//! desde cualquier estado. Cada transición mutante corre en UNA
//! transacción que abarca fila de viaje + rosters + asignaciones; ante
//! cualquier fallo interno se revierte todo y ningún roster parcial
//! queda observable.
//!
//! La validación de campos corre antes de abrir la transacción; las
//! violaciones de invariante descubiertas adentro abortan la unidad
//! completa.

use sqlx::PgPool;
use validator::Validate;

use crate::database::schema_probe::SchemaCapabilities;
use crate::dto::trip_dto::{
    ApiResponse, CreateTripRequest, CreateTripResponse, EndTripRequest, EndTripResponse,
    ListTripsQuery, TripDetailResponse, TripListResponse, TripSummaryResponse, UpdateTripRequest,
};
use crate::middleware::auth::{AuthenticatedUser, Role};
use crate::repositories::{assignment_repository, trip_repository};
use crate::services::odometer_guard;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::{clamp_page_size, normalize_customer_names, parse_driver_ids_param};

pub struct TripController {
    pool: PgPool,
    caps: SchemaCapabilities,
}

impl TripController {
    pub fn new(pool: PgPool, caps: SchemaCapabilities) -> Self {
        Self { pool, caps }
    }

    /// Abrir un viaje: guard de odómetro, fila de viaje, rosters y
    /// asignaciones en una sola transacción. El índice único parcial
    /// serializa aperturas concurrentes sobre el mismo vehículo; el
    /// perdedor recibe Conflict, nunca un crash.
    pub async fn create(
        &self,
        user: &AuthenticatedUser,
        request: CreateTripRequest,
    ) -> AppResult<ApiResponse<CreateTripResponse>> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        if request.start_km < 0 {
            return Err(AppError::ValidationError(
                "start km must not be negative".to_string(),
            ));
        }

        let customer_names = normalize_customer_names(&request.customer_names);
        if customer_names.is_empty() {
            return Err(AppError::ValidationError(
                "at least one customer name is required".to_string(),
            ));
        }

        let helper_ids = request.helper_ids.clone().unwrap_or_default();

        // Un conductor solo puede abrir viajes que lo incluyan a él mismo
        if user.role == Role::Driver {
            let own_id = user
                .driver_id
                .ok_or_else(|| AppError::Forbidden("caller has no driver identity".to_string()))?;
            if !request.driver_ids.contains(&own_id) {
                return Err(AppError::Forbidden(
                    "drivers may only open trips that include themselves".to_string(),
                ));
            }
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Error starting transaction: {}", e))
        })?;

        let plant_id = trip_repository::vehicle_plant(&mut tx, request.vehicle_id).await?;

        odometer_guard::validate_open(&mut *tx, &self.caps, request.vehicle_id, request.start_km)
            .await?;

        let trip_id = trip_repository::insert_trip(
            &mut tx,
            &self.caps,
            &trip_repository::NewTrip {
                vehicle_id: request.vehicle_id,
                start_date: request.start_date,
                start_km: request.start_km,
                note: request.note.clone(),
                gps_lat: request.gps_lat,
                gps_lng: request.gps_lng,
            },
        )
        .await?;

        trip_repository::replace_drivers(&mut tx, trip_id, &request.driver_ids).await?;
        trip_repository::replace_helpers(&mut tx, &self.caps, trip_id, &helper_ids).await?;
        trip_repository::set_customer_names(&mut tx, trip_id, &customer_names).await?;

        for person_id in request.driver_ids.iter().chain(helper_ids.iter()) {
            assignment_repository::upsert_assignment(
                &mut tx,
                &self.caps,
                *person_id,
                request.vehicle_id,
                plant_id,
            )
            .await?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(format!("Error committing trip creation: {}", e))
        })?;

        tracing::info!(
            "Viaje {} abierto para vehículo {} por usuario {}",
            trip_id,
            request.vehicle_id,
            user.user_id
        );

        Ok(ApiResponse::success_with_message(
            CreateTripResponse { trip_id },
            "Trip opened".to_string(),
        ))
    }

    /// Mutar el roster o la nota de un viaje en curso. Un viaje cerrado
    /// rechaza cualquier mutación con Conflict.
    pub async fn update(
        &self,
        user: &AuthenticatedUser,
        trip_id: i64,
        request: UpdateTripRequest,
    ) -> AppResult<ApiResponse<()>> {
        if request.is_empty() {
            return Err(AppError::ValidationError(
                "no changes requested".to_string(),
            ));
        }

        if let Some(drivers) = &request.set_driver_ids {
            if drivers.is_empty() {
                return Err(AppError::ValidationError(
                    "a trip must keep at least one driver".to_string(),
                ));
            }
        }

        let set_customers = request
            .set_customer_names
            .as_deref()
            .map(normalize_customer_names);
        if let Some(names) = &set_customers {
            if names.is_empty() {
                return Err(AppError::ValidationError(
                    "at least one customer name is required".to_string(),
                ));
            }
        }
        let add_customers = request
            .add_customer_names
            .as_deref()
            .map(normalize_customer_names);

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Error starting transaction: {}", e))
        })?;

        let trip = trip_repository::find_trip_for_update(&mut tx, &self.caps, trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip {} not found", trip_id)))?;

        if !trip.is_ongoing() {
            return Err(AppError::Conflict(format!(
                "trip {} is already ended and can no longer be modified",
                trip_id
            )));
        }

        let plant_id = trip_repository::vehicle_plant(&mut tx, trip.vehicle_id).await?;

        if let Some(driver_ids) = &request.set_driver_ids {
            trip_repository::replace_drivers(&mut tx, trip_id, driver_ids).await?;
            for driver_id in driver_ids {
                assignment_repository::upsert_assignment(
                    &mut tx,
                    &self.caps,
                    *driver_id,
                    trip.vehicle_id,
                    plant_id,
                )
                .await?;
            }
        }

        if let Some(helper_ids) = &request.set_helper_ids {
            trip_repository::replace_helpers(&mut tx, &self.caps, trip_id, helper_ids).await?;
            for helper_id in helper_ids {
                assignment_repository::upsert_assignment(
                    &mut tx,
                    &self.caps,
                    *helper_id,
                    trip.vehicle_id,
                    plant_id,
                )
                .await?;
            }
        }

        // Reemplazo total primero; los agregados se aplican sobre el
        // resultado
        if let Some(names) = &set_customers {
            trip_repository::set_customer_names(&mut tx, trip_id, names).await?;
        }
        if let Some(names) = &add_customers {
            trip_repository::add_customer_names(&mut tx, trip_id, names).await?;
        }

        if let Some(note) = &request.note {
            trip_repository::update_note(&mut tx, trip_id, note).await?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(format!("Error committing trip update: {}", e))
        })?;

        tracing::info!("Viaje {} actualizado por usuario {}", trip_id, user.user_id);

        Ok(ApiResponse::success_with_message(
            (),
            "Trip updated".to_string(),
        ))
    }

    /// Cerrar un viaje: Ongoing -> Ended, transición única e irreversible
    pub async fn end(
        &self,
        user: &AuthenticatedUser,
        trip_id: i64,
        request: EndTripRequest,
    ) -> AppResult<ApiResponse<EndTripResponse>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Error starting transaction: {}", e))
        })?;

        let trip = trip_repository::find_trip_for_update(&mut tx, &self.caps, trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip {} not found", trip_id)))?;

        if !trip.is_ongoing() {
            return Err(AppError::Conflict(format!(
                "trip {} is already ended",
                trip_id
            )));
        }

        odometer_guard::validate_close(&trip, request.end_km, request.end_date)?;

        trip_repository::close_trip(&mut tx, &self.caps, trip_id, request.end_date, request.end_km)
            .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(format!("Error committing trip close: {}", e))
        })?;

        let total_km = request.end_km - trip.start_km;
        tracing::info!(
            "Viaje {} cerrado por usuario {}: {} km",
            trip_id,
            user.user_id,
            total_km
        );

        Ok(ApiResponse::success_with_message(
            EndTripResponse { trip_id, total_km },
            "Trip ended".to_string(),
        ))
    }

    /// Borrado duro desde cualquier estado; cascadea las filas de roster
    pub async fn delete(
        &self,
        user: &AuthenticatedUser,
        trip_id: i64,
    ) -> AppResult<ApiResponse<()>> {
        if !user.role.can_delete_trips() {
            return Err(AppError::Forbidden(
                "only supervisors may delete trips".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Error starting transaction: {}", e))
        })?;

        trip_repository::delete_trip(&mut tx, &self.caps, trip_id).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(format!("Error committing trip deletion: {}", e))
        })?;

        tracing::info!("Viaje {} borrado por usuario {}", trip_id, user.user_id);

        Ok(ApiResponse::success_with_message(
            (),
            "Trip deleted".to_string(),
        ))
    }

    /// Detalle completo con rosters resueltos
    pub async fn get_details(&self, trip_id: i64) -> AppResult<TripDetailResponse> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            AppError::DatabaseError(format!("Error acquiring connection: {}", e))
        })?;

        trip_repository::get_trip_detail(&mut conn, &self.caps, trip_id)
            .await?
            .map(TripDetailResponse::from)
            .ok_or_else(|| AppError::NotFound(format!("trip {} not found", trip_id)))
    }

    /// Listado paginado por vehículo, en curso primero
    pub async fn list(
        &self,
        vehicle_id: i64,
        query: ListTripsQuery,
    ) -> AppResult<TripListResponse> {
        let limit = clamp_page_size(query.limit);
        let offset = query.offset.unwrap_or(0).max(0);

        let driver_filter = match &query.driver_ids {
            Some(raw) => {
                let ids = parse_driver_ids_param(raw)?;
                if ids.is_empty() {
                    None
                } else {
                    Some(ids)
                }
            }
            None => None,
        };

        let mut conn = self.pool.acquire().await.map_err(|e| {
            AppError::DatabaseError(format!("Error acquiring connection: {}", e))
        })?;

        let (rows, has_more) = trip_repository::list_trips_for_vehicle(
            &mut conn,
            &self.caps,
            vehicle_id,
            driver_filter.as_deref(),
            limit,
            offset,
        )
        .await?;

        Ok(TripListResponse {
            rows: rows.into_iter().map(TripSummaryResponse::from).collect(),
            has_more,
        })
    }
}
