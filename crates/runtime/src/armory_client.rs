use serde::Serialize;
use sqlx::types::Uuid;

use crate::rules::{compute_totals, Totals, ValidCharacter, ValidItem};
use crate::{ArmoryError, Character, MagicItem};

/// A character together with the items it holds and the totals they add up to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSheet {
    #[serde(flatten)]
    pub character: Character,
    #[serde(flatten)]
    pub totals: Totals,
    pub items: Vec<MagicItem>,
}

impl CharacterSheet {
    pub fn new(character: Character, items: Vec<MagicItem>) -> Self {
        let totals = compute_totals(&character, &items);
        Self { character, totals, items }
    }
}

/// Persistence collaborator behind the HTTP routes.
///
/// Implementations own the read-then-write sequences: whatever they load to feed
/// `rules::validate_association` / `validate_disassociation` must still hold when the
/// change is written.
#[async_trait::async_trait]
pub trait ArmoryClient: Clone + Send + Sync + 'static {
    const NAME: &'static str;

    async fn create_character(&self, character: ValidCharacter) -> Result<Character, ArmoryError>;
    async fn list_character_sheets(&self) -> Result<Vec<CharacterSheet>, ArmoryError>;
    async fn find_character_sheet(&self, id: Uuid) -> Result<Option<CharacterSheet>, ArmoryError>;
    async fn rename_adventurer(&self, id: Uuid, adventurer_name: String) -> Result<Character, ArmoryError>;
    /// Detaches every held item, then deletes the character.
    async fn delete_character(&self, id: Uuid) -> Result<Character, ArmoryError>;

    async fn create_item(&self, item: ValidItem) -> Result<MagicItem, ArmoryError>;
    async fn list_items(&self) -> Result<Vec<MagicItem>, ArmoryError>;
    async fn find_item(&self, id: Uuid) -> Result<Option<MagicItem>, ArmoryError>;

    async fn items_of(&self, character_id: Uuid) -> Result<Vec<MagicItem>, ArmoryError>;
    async fn associate_item(&self, character_id: Uuid, item_id: Uuid) -> Result<MagicItem, ArmoryError>;
    async fn disassociate_item(&self, character_id: Uuid, item_id: Uuid) -> Result<MagicItem, ArmoryError>;
    async fn find_amulet(&self, character_id: Uuid) -> Result<Option<MagicItem>, ArmoryError>;

    async fn on_shutdown(&self) -> Result<(), ArmoryError>;
}
