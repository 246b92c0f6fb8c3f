use axum::{
    extract::{Path, State}, http::StatusCode, routing::{get, post}, Router
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use armory_runtime::rules::{validate_item_creation, ItemDraft};
use armory_runtime::{ArmoryClient, ArmoryError, ItemType};

use crate::extract::ValidatedJson;
use crate::response::{AppError, AppSuccess};
use super::parse_path_id;

pub fn item_routes<S: ArmoryClient>() -> Router<S> {
    Router::new()
        .route("/items", get(list_items::<S>))
        .route("/items", post(create_item::<S>))
        .route("/items/{id}", get(get_item::<S>))

        .route("/itens", get(list_items::<S>).post(create_item::<S>))
        .route("/itens/{id}", get(get_item::<S>))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    #[serde(alias = "nome")]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[serde(rename = "type", alias = "tipo")]
    pub item_type: ItemType,
    #[serde(alias = "forca")]
    #[validate(range(min = 0, max = 10, message = "strength must be between 0 and 10"))]
    pub strength: i32,
    #[serde(alias = "defesa")]
    #[validate(range(min = 0, max = 10, message = "defense must be between 0 and 10"))]
    pub defense: i32,
}

async fn create_item<S: ArmoryClient>(
    State(state): State<S>,
    ValidatedJson(payload): ValidatedJson<CreateItemRequest>,
) -> Result<AppSuccess, AppError> {
    let item = validate_item_creation(ItemDraft {
        name: payload.name,
        item_type: payload.item_type,
        strength: payload.strength,
        defense: payload.defense,
    })?;
    let item = state.create_item(item).await?;
    tracing::info!("[item_routes::create_item] {} created ({})", item.id, item.item_type);

    Ok(AppSuccess::new(StatusCode::CREATED, json!(item)))
}

async fn list_items<S: ArmoryClient>(
    State(state): State<S>,
) -> Result<AppSuccess, AppError> {
    let items = state.list_items().await?;
    Ok(AppSuccess::new(StatusCode::OK, json!(items)))
}

async fn get_item<S: ArmoryClient>(
    State(state): State<S>,
    Path(id): Path<String>,
) -> Result<AppSuccess, AppError> {
    let id = parse_path_id(&id, "item")?;
    let item = state.find_item(id).await?
        .ok_or(ArmoryError::not_found("item", id))?;

    Ok(AppSuccess::new(StatusCode::OK, json!(item)))
}
