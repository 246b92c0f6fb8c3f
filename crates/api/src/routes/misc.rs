use axum::{routing::get, Router};

use armory_runtime::ArmoryClient;

pub fn misc_routes<S: ArmoryClient>() -> Router<S> {
    Router::new()
        .route("/",
            get(|| async { "Armory server running" })
        )
        .route("/health",
            get(|| async { "OK" })
        )
}
