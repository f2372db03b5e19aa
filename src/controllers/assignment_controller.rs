//! Controller de asignaciones
//!
//! Operaciones estrechas sobre la asignación vigente de un conductor:
//! consultarla y limpiarla explícitamente. El upsert sucede solo como
//! parte de las transacciones de viaje.

use sqlx::PgPool;

use crate::dto::trip_dto::ApiResponse;
use crate::middleware::auth::{AuthenticatedUser, Role};
use crate::models::assignment::Assignment;
use crate::repositories::assignment_repository;
use crate::utils::errors::{AppError, AppResult};

pub struct AssignmentController {
    pool: PgPool,
}

impl AssignmentController {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Asignación vigente de un conductor
    pub async fn get_for_driver(&self, driver_id: i64) -> AppResult<Assignment> {
        assignment_repository::find_by_driver(&self.pool, driver_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("no assignment recorded for driver {}", driver_id))
            })
    }

    /// Limpiar la asignación (vehículo a NULL). Un conductor solo puede
    /// limpiar la propia; supervisión puede limpiar cualquiera.
    pub async fn clear(
        &self,
        user: &AuthenticatedUser,
        driver_id: i64,
    ) -> AppResult<ApiResponse<()>> {
        let is_own = user.driver_id == Some(driver_id);
        if !is_own && !matches!(user.role, Role::Supervisor | Role::Admin) {
            return Err(AppError::Forbidden(
                "only supervisors may clear another driver's assignment".to_string(),
            ));
        }

        assignment_repository::clear_assignment(&self.pool, driver_id).await?;

        tracing::info!(
            "Asignación del conductor {} limpiada por usuario {}",
            driver_id,
            user.user_id
        );

        Ok(ApiResponse::success_with_message(
            (),
            "Assignment cleared".to_string(),
        ))
    }
}
