//! Ensamblado del router de la API

use axum::{response::Json, routing::get, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::middleware::auth::auth_middleware;
use crate::middleware::cors::cors_middleware;
use crate::state::AppState;

pub mod assignment_routes;
pub mod trip_routes;

/// Armar el router completo de la aplicación. Las rutas de dominio van
/// detrás del middleware de autenticación; health y test quedan públicas.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/api/trip", trip_routes::create_trip_router())
        .nest(
            "/api/assignment",
            assignment_routes::create_assignment_router(),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_endpoint))
        .route("/test", get(test_endpoint))
        .merge(protected)
        .layer(cors_middleware())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check simple
async fn health_endpoint() -> Json<serde_json::Value> {
    Json(json!({
        "service": "fleet-trips",
        "status": "healthy",
    }))
}

/// Endpoint de prueba simple
async fn test_endpoint() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Fleet trip tracker funcionando correctamente",
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
