use axum::{
    extract::{Path, State}, http::StatusCode, routing::{delete, get, patch, post}, Router
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use armory_runtime::rules::{validate_character_creation, CharacterDraft};
use armory_runtime::{ArmoryClient, ArmoryError, CharacterClass};

use crate::extract::ValidatedJson;
use crate::response::{AppError, AppSuccess};
use super::parse_path_id;

pub fn character_routes<S: ArmoryClient>() -> Router<S> {
    Router::new()
        .route("/characters", get(list_characters::<S>))
        .route("/characters", post(create_character::<S>))
        .route("/characters/{id}", get(get_character::<S>))
        .route("/characters/{id}", delete(delete_character::<S>))
        .route("/characters/{id}/adventurer-name", patch(rename_adventurer::<S>))

        .route("/characters/{id}/items", get(list_character_items::<S>))
        .route("/characters/{id}/items", post(associate_item::<S>))
        .route("/characters/{id}/items/{item_id}", delete(disassociate_item::<S>))
        .route("/characters/{id}/amulet", get(get_amulet::<S>))

        // original Portuguese paths
        .route("/personagens", get(list_characters::<S>).post(create_character::<S>))
        .route("/personagens/{id}", get(get_character::<S>).delete(delete_character::<S>))
        .route("/personagens/{id}/nome-aventureiro", patch(rename_adventurer::<S>))
        .route("/personagens/{id}/itens", get(list_character_items::<S>).post(associate_item::<S>))
        .route("/personagens/{id}/itens/{item_id}", delete(disassociate_item::<S>))
        .route("/personagens/{id}/amuleto", get(get_amulet::<S>))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCharacterRequest {
    #[serde(alias = "nome")]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[serde(alias = "nomeAventureiro")]
    #[validate(length(min = 1, message = "adventurerName must not be empty"))]
    pub adventurer_name: String,
    #[serde(alias = "classe")]
    pub class: CharacterClass,
    #[validate(range(min = 0, message = "level must be 0 or greater"))]
    pub level: i32,
    #[serde(alias = "forcaBase")]
    #[validate(range(min = 0, max = 10, message = "baseStrength must be between 0 and 10"))]
    pub base_strength: i32,
    #[serde(alias = "defesaBase")]
    #[validate(range(min = 0, max = 10, message = "baseDefense must be between 0 and 10"))]
    pub base_defense: i32,
}

impl CreateCharacterRequest {
    fn into_draft(self) -> CharacterDraft {
        CharacterDraft {
            name: self.name,
            adventurer_name: self.adventurer_name,
            class: self.class,
            level: self.level,
            base_strength: self.base_strength,
            base_defense: self.base_defense,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RenameAdventurerRequest {
    #[serde(alias = "nomeAventureiro")]
    #[validate(length(min = 1, message = "adventurerName must not be empty"))]
    pub adventurer_name: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssociateItemRequest {
    pub item_id: Uuid,
}

async fn create_character<S: ArmoryClient>(
    State(state): State<S>,
    ValidatedJson(payload): ValidatedJson<CreateCharacterRequest>,
) -> Result<AppSuccess, AppError> {
    let character = validate_character_creation(payload.into_draft())?;
    let character = state.create_character(character).await?;
    tracing::info!("[character_routes::create_character] {} created ({})", character.id, character.class);

    Ok(AppSuccess::new(StatusCode::CREATED, json!(character)))
}

async fn list_characters<S: ArmoryClient>(
    State(state): State<S>,
) -> Result<AppSuccess, AppError> {
    let sheets = state.list_character_sheets().await?;
    Ok(AppSuccess::new(StatusCode::OK, json!(sheets)))
}

async fn get_character<S: ArmoryClient>(
    State(state): State<S>,
    Path(id): Path<String>,
) -> Result<AppSuccess, AppError> {
    let id = parse_path_id(&id, "character")?;
    let sheet = state.find_character_sheet(id).await?
        .ok_or(ArmoryError::not_found("character", id))?;

    Ok(AppSuccess::new(StatusCode::OK, json!(sheet)))
}

async fn rename_adventurer<S: ArmoryClient>(
    State(state): State<S>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<RenameAdventurerRequest>,
) -> Result<AppSuccess, AppError> {
    let id = parse_path_id(&id, "character")?;
    let character = state.rename_adventurer(id, payload.adventurer_name).await?;

    Ok(AppSuccess::new(StatusCode::OK, json!(character)))
}

async fn delete_character<S: ArmoryClient>(
    State(state): State<S>,
    Path(id): Path<String>,
) -> Result<AppSuccess, AppError> {
    let id = parse_path_id(&id, "character")?;
    let character = state.delete_character(id).await?;
    tracing::info!("[character_routes::delete_character] {} deleted", id);

    Ok(AppSuccess::new(StatusCode::OK, json!(character)))
}

async fn list_character_items<S: ArmoryClient>(
    State(state): State<S>,
    Path(id): Path<String>,
) -> Result<AppSuccess, AppError> {
    let items = match Uuid::parse_str(&id) {
        Ok(id) => state.items_of(id).await?,
        Err(_) => Vec::new(),
    };
    Ok(AppSuccess::new(StatusCode::OK, json!(items)))
}

async fn associate_item<S: ArmoryClient>(
    State(state): State<S>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<AssociateItemRequest>,
) -> Result<AppSuccess, AppError> {
    let id = parse_path_id(&id, "character")?;
    let item = state.associate_item(id, payload.item_id).await?;

    Ok(AppSuccess::new(StatusCode::OK, json!(item)))
}

async fn disassociate_item<S: ArmoryClient>(
    State(state): State<S>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<AppSuccess, AppError> {
    let id = parse_path_id(&id, "character")?;
    let item_id = parse_path_id(&item_id, "item")?;
    let item = state.disassociate_item(id, item_id).await?;

    Ok(AppSuccess::new(StatusCode::OK, json!(item)))
}

async fn get_amulet<S: ArmoryClient>(
    State(state): State<S>,
    Path(id): Path<String>,
) -> Result<AppSuccess, AppError> {
    let id = parse_path_id(&id, "character")?;
    let amulet = state.find_amulet(id).await?
        .ok_or(AppError::new(StatusCode::NOT_FOUND, "amulet not found for character"))?;

    Ok(AppSuccess::new(StatusCode::OK, json!(amulet)))
}
