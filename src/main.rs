use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

use fleet_trips::config::environment::EnvironmentConfig;
use fleet_trips::database::connection::create_pool;
use fleet_trips::database::schema_probe::SchemaCapabilities;
use fleet_trips::routes::build_router;
use fleet_trips::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("🚚 Fleet Trip Tracker");
    info!("=====================");

    let config = EnvironmentConfig::from_env();

    // Inicializar base de datos
    let pool = match create_pool(None).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };

    // Resolver las capacidades del schema una sola vez en el arranque
    let caps = SchemaCapabilities::detect(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Error sondeando el schema: {}", e))?;
    info!("🔍 Capacidades detectadas: {:?}", caps);

    let port = config.port;
    let app_state = AppState::new(pool, config, caps);
    let app = build_router(app_state);

    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("   GET  /test - Endpoint de prueba");
    info!("🚛 Endpoints - Trips:");
    info!("   POST /api/trip - Abrir viaje");
    info!("   GET  /api/trip/:id - Detalle de viaje");
    info!("   PUT  /api/trip/:id - Actualizar roster/nota");
    info!("   POST /api/trip/:id/end - Cerrar viaje");
    info!("   DELETE /api/trip/:id - Borrar viaje");
    info!("   GET  /api/trip/vehicle/:vehicle_id - Listar viajes por vehículo");
    info!("👷 Endpoints - Assignments:");
    info!("   GET  /api/assignment/:driver_id - Asignación vigente");
    info!("   POST /api/assignment/clear/:driver_id - Limpiar asignación");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Error del servidor: {}", e);
            anyhow::anyhow!(e)
        })?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
