mod characters;
mod items;
mod misc;

use axum::http::StatusCode;
use uuid::Uuid;

use crate::response::AppError;

pub use characters::character_routes;
pub use items::item_routes;
pub use misc::misc_routes;

/// Path ids that are not UUIDs cannot name a stored row.
fn parse_path_id(raw: &str, entity: &'static str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw)
        .map_err(|_| AppError::new(StatusCode::NOT_FOUND, format!("{} not found: {}", entity, raw)))
}
