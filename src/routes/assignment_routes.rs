//! Rutas de asignaciones

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};

use crate::controllers::assignment_controller::AssignmentController;
use crate::dto::trip_dto::ApiResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::assignment::Assignment;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_assignment_router() -> Router<AppState> {
    Router::new()
        .route("/:driver_id", get(get_assignment))
        .route("/clear/:driver_id", post(clear_assignment))
}

async fn get_assignment(
    State(state): State<AppState>,
    Path(driver_id): Path<i64>,
) -> Result<Json<Assignment>, AppError> {
    let controller = AssignmentController::new(state.pool.clone());
    let response = controller.get_for_driver(driver_id).await?;
    Ok(Json(response))
}

async fn clear_assignment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(driver_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = AssignmentController::new(state.pool.clone());
    let response = controller.clear(&user, driver_id).await?;
    Ok(Json(response))
}
