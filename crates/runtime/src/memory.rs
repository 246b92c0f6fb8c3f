use std::sync::Arc;

use sqlx::types::Uuid;
use tokio::sync::RwLock;

use crate::rules::{self, ValidCharacter, ValidItem};
use crate::{ArmoryClient, ArmoryError, Character, CharacterSheet, MagicItem};

#[derive(Debug, Default)]
struct Ledger {
    characters: Vec<Character>,
    items: Vec<MagicItem>,
}

impl Ledger {
    fn held_by(&self, character_id: Uuid) -> Vec<MagicItem> {
        self.items
            .iter()
            .filter(|item| item.character_id == Some(character_id))
            .cloned()
            .collect()
    }

    fn item_mut(&mut self, id: Uuid) -> Option<&mut MagicItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }
}

/// Process-local store with the same rules as `PostgresArmory`.
/// Every write holds the lock for its whole read-validate-write sequence.
#[derive(Clone, Default)]
pub struct InMemoryArmory {
    ledger: Arc<RwLock<Ledger>>,
}

impl InMemoryArmory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ArmoryClient for InMemoryArmory {
    const NAME: &'static str = "memory";

    async fn create_character(&self, character: ValidCharacter) -> Result<Character, ArmoryError> {
        let character = Character::new(character);
        self.ledger.write().await.characters.push(character.clone());
        Ok(character)
    }

    async fn list_character_sheets(&self) -> Result<Vec<CharacterSheet>, ArmoryError> {
        let ledger = self.ledger.read().await;
        Ok(ledger.characters
            .iter()
            .map(|character| CharacterSheet::new(character.clone(), ledger.held_by(character.id)))
            .collect())
    }

    async fn find_character_sheet(&self, id: Uuid) -> Result<Option<CharacterSheet>, ArmoryError> {
        let ledger = self.ledger.read().await;
        Ok(ledger.characters
            .iter()
            .find(|character| character.id == id)
            .map(|character| CharacterSheet::new(character.clone(), ledger.held_by(id))))
    }

    async fn rename_adventurer(&self, id: Uuid, adventurer_name: String) -> Result<Character, ArmoryError> {
        let mut ledger = self.ledger.write().await;
        let character = ledger.characters
            .iter_mut()
            .find(|character| character.id == id)
            .ok_or(ArmoryError::not_found("character", id))?;
        character.rename_adventurer(adventurer_name);
        Ok(character.clone())
    }

    async fn delete_character(&self, id: Uuid) -> Result<Character, ArmoryError> {
        let mut ledger = self.ledger.write().await;
        let position = ledger.characters
            .iter()
            .position(|character| character.id == id)
            .ok_or(ArmoryError::not_found("character", id))?;

        ledger.items
            .iter_mut()
            .filter(|item| item.character_id == Some(id))
            .for_each(MagicItem::detach);
        Ok(ledger.characters.remove(position))
    }

    async fn create_item(&self, item: ValidItem) -> Result<MagicItem, ArmoryError> {
        let item = MagicItem::new(item);
        self.ledger.write().await.items.push(item.clone());
        Ok(item)
    }

    async fn list_items(&self) -> Result<Vec<MagicItem>, ArmoryError> {
        Ok(self.ledger.read().await.items.clone())
    }

    async fn find_item(&self, id: Uuid) -> Result<Option<MagicItem>, ArmoryError> {
        Ok(self.ledger.read().await.items.iter().find(|item| item.id == id).cloned())
    }

    async fn items_of(&self, character_id: Uuid) -> Result<Vec<MagicItem>, ArmoryError> {
        Ok(self.ledger.read().await.held_by(character_id))
    }

    async fn associate_item(&self, character_id: Uuid, item_id: Uuid) -> Result<MagicItem, ArmoryError> {
        let mut ledger = self.ledger.write().await;
        let character = ledger.characters
            .iter()
            .find(|character| character.id == character_id)
            .cloned()
            .ok_or(ArmoryError::not_found("character", character_id))?;
        let current_items = ledger.held_by(character_id);

        let item = ledger.item_mut(item_id).ok_or(ArmoryError::not_found("item", item_id))?;
        rules::validate_association(&character, item, &current_items)?;
        item.attach_to(character_id);
        Ok(item.clone())
    }

    async fn disassociate_item(&self, character_id: Uuid, item_id: Uuid) -> Result<MagicItem, ArmoryError> {
        let mut ledger = self.ledger.write().await;
        let item = ledger.item_mut(item_id);
        rules::validate_disassociation(item.as_deref(), character_id)?;

        let item = item.ok_or(ArmoryError::not_found("item", item_id))?;
        item.detach();
        Ok(item.clone())
    }

    async fn find_amulet(&self, character_id: Uuid) -> Result<Option<MagicItem>, ArmoryError> {
        Ok(self.ledger.read().await
            .held_by(character_id)
            .into_iter()
            .find(MagicItem::is_amulet))
    }

    async fn on_shutdown(&self) -> Result<(), ArmoryError> {
        Ok(())
    }
}
