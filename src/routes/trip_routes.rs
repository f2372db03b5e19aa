//! Rutas del dominio de viajes

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Extension, Json, Router,
};

use crate::controllers::trip_controller::TripController;
use crate::dto::trip_dto::{
    ApiResponse, CreateTripRequest, CreateTripResponse, EndTripRequest, EndTripResponse,
    ListTripsQuery, TripDetailResponse, TripListResponse, UpdateTripRequest,
};
use crate::middleware::auth::AuthenticatedUser;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_trip_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_trip))
        .route("/:id", get(get_trip))
        .route("/:id", put(update_trip))
        .route("/:id", delete(delete_trip))
        .route("/:id/end", post(end_trip))
        .route("/vehicle/:vehicle_id", get(list_trips))
}

async fn create_trip(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateTripRequest>,
) -> Result<Json<ApiResponse<CreateTripResponse>>, AppError> {
    let controller = TripController::new(state.pool.clone(), state.caps.clone());
    let response = controller.create(&user, request).await?;
    Ok(Json(response))
}

async fn get_trip(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TripDetailResponse>, AppError> {
    let controller = TripController::new(state.pool.clone(), state.caps.clone());
    let response = controller.get_details(id).await?;
    Ok(Json(response))
}

async fn update_trip(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTripRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = TripController::new(state.pool.clone(), state.caps.clone());
    let response = controller.update(&user, id, request).await?;
    Ok(Json(response))
}

async fn end_trip(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    Json(request): Json<EndTripRequest>,
) -> Result<Json<ApiResponse<EndTripResponse>>, AppError> {
    let controller = TripController::new(state.pool.clone(), state.caps.clone());
    let response = controller.end(&user, id, request).await?;
    Ok(Json(response))
}

async fn delete_trip(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = TripController::new(state.pool.clone(), state.caps.clone());
    let response = controller.delete(&user, id).await?;
    Ok(Json(response))
}

async fn list_trips(
    State(state): State<AppState>,
    Path(vehicle_id): Path<i64>,
    Query(query): Query<ListTripsQuery>,
) -> Result<Json<TripListResponse>, AppError> {
    let controller = TripController::new(state.pool.clone(), state.caps.clone());
    let response = controller.list(vehicle_id, query).await?;
    Ok(Json(response))
}
