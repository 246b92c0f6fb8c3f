use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{middleware, Router};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use armory_common::EnvVars;
use armory_database::init_databases;
use armory_runtime::{ArmoryClient, PostgresArmory};
use armory_service_api::{character_routes, item_routes, misc_routes, setup_tracing, timeout_envelope, ApiServerEnv};

init_databases!(
    default: [
        armory_runtime::Character,
        armory_runtime::MagicItem
    ]
);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing();

    let env = ApiServerEnv::load()?;

    let cors = CorsLayer::very_permissive();
    let trace = TraceLayer::new_for_http();

    let db_pool = Arc::new(connect(false, true).await?.clone());
    let armory = PostgresArmory::new(db_pool);

    let app = Router::new()
        .merge(misc_routes::<PostgresArmory>())
        .merge(character_routes::<PostgresArmory>())
        .merge(item_routes::<PostgresArmory>())
        .layer(TimeoutLayer::new(Duration::from_secs(env.request_timeout_secs)))
        .layer(middleware::map_response(timeout_envelope))
        .layer(cors)
        .layer(trace)
        .with_state(armory.clone());

    let listener = tokio::net::TcpListener::bind(format!(":::{}", env.port)).await?;

    tracing::info!("LISTENING ON {}", env.port);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("[{}] shutting down", PostgresArmory::NAME);
    armory.on_shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("[shutdown_signal] failed to listen for ctrl-c: {:?}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => { signal.recv().await; }
            Err(e) => {
                tracing::warn!("[shutdown_signal] failed to listen for SIGTERM: {:?}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
