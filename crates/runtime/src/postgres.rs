use std::collections::HashMap;
use std::sync::Arc;

use sqlx::{types::Uuid, Error as SqlxError, PgPool};

use armory_database::{OrderDirection, QueryCriteria, SqlxCrud, SqlxFilterQuery};

use crate::rules::{self, RuleViolation, ValidCharacter, ValidItem};
use crate::{ArmoryClient, ArmoryError, Character, CharacterSheet, ItemType, MagicItem};

#[derive(Clone)]
pub struct PostgresArmory {
    db: Arc<PgPool>,
}

impl PostgresArmory {
    pub fn new(db: Arc<PgPool>) -> Self {
        Self { db }
    }

    pub fn get_db(&self) -> &Arc<PgPool> {
        &self.db
    }
}

fn held_by(character_id: Uuid) -> QueryCriteria {
    QueryCriteria::new()
        .add_valued_filter("character_id", "=", character_id)
        .order_by("created_at", OrderDirection::Asc)
        .order_by("id", OrderDirection::Asc)
}

/// The partial unique index on amulets catches what the row locks cannot,
/// e.g. a character created and armed concurrently.
fn amulet_conflict(err: SqlxError) -> ArmoryError {
    let is_unique = err
        .as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false);
    if is_unique {
        RuleViolation::CharacterAlreadyHasAmulet.into()
    } else {
        err.into()
    }
}

#[async_trait::async_trait]
impl ArmoryClient for PostgresArmory {
    const NAME: &'static str = "postgres";

    async fn create_character(&self, character: ValidCharacter) -> Result<Character, ArmoryError> {
        let character = Character::new(character).create(&*self.db).await?;
        tracing::info!("[PostgresArmory::create_character] created {} ({})", character.id, character.class);
        Ok(character)
    }

    async fn list_character_sheets(&self) -> Result<Vec<CharacterSheet>, ArmoryError> {
        let characters = Character::find_by_criteria(
            QueryCriteria::new()
                .order_by("created_at", OrderDirection::Asc)
                .order_by("id", OrderDirection::Asc),
            &*self.db
        ).await?;

        let held = MagicItem::find_by_criteria(
            QueryCriteria::new()
                .add_filter::<Uuid>("character_id", "IS NOT NULL", None)
                .order_by("created_at", OrderDirection::Asc)
                .order_by("id", OrderDirection::Asc),
            &*self.db
        ).await?;

        let mut by_owner: HashMap<Uuid, Vec<MagicItem>> = HashMap::new();
        for item in held {
            if let Some(owner) = item.character_id {
                by_owner.entry(owner).or_default().push(item);
            }
        }

        Ok(characters
            .into_iter()
            .map(|character| {
                let items = by_owner.remove(&character.id).unwrap_or_default();
                CharacterSheet::new(character, items)
            })
            .collect())
    }

    async fn find_character_sheet(&self, id: Uuid) -> Result<Option<CharacterSheet>, ArmoryError> {
        let character = match Character::find_by_id(id, &*self.db).await? {
            Some(character) => character,
            None => return Ok(None),
        };
        let items = MagicItem::find_by_criteria(held_by(id), &*self.db).await?;
        Ok(Some(CharacterSheet::new(character, items)))
    }

    async fn rename_adventurer(&self, id: Uuid, adventurer_name: String) -> Result<Character, ArmoryError> {
        let mut tx = self.db.begin().await?;
        let mut character = Character::find_one_by_criteria(
            QueryCriteria::by_id(id).for_update(),
            &mut *tx
        ).await?
            .ok_or(ArmoryError::not_found("character", id))?;

        character.rename_adventurer(adventurer_name);
        let character = character.update(&mut *tx).await?;
        tx.commit().await?;
        Ok(character)
    }

    async fn delete_character(&self, id: Uuid) -> Result<Character, ArmoryError> {
        let mut tx = self.db.begin().await?;
        let character = Character::find_one_by_criteria(
            QueryCriteria::by_id(id).for_update(),
            &mut *tx
        ).await?
            .ok_or(ArmoryError::not_found("character", id))?;

        let detached = MagicItem::detach_all(id, &mut *tx).await?;
        character.clone().delete(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!("[PostgresArmory::delete_character] deleted {} and detached {} items", id, detached);
        Ok(character)
    }

    async fn create_item(&self, item: ValidItem) -> Result<MagicItem, ArmoryError> {
        let item = MagicItem::new(item).create(&*self.db).await?;
        tracing::info!("[PostgresArmory::create_item] created {} ({})", item.id, item.item_type);
        Ok(item)
    }

    async fn list_items(&self) -> Result<Vec<MagicItem>, ArmoryError> {
        let items = MagicItem::find_by_criteria(
            QueryCriteria::new()
                .order_by("created_at", OrderDirection::Asc)
                .order_by("id", OrderDirection::Asc),
            &*self.db
        ).await?;
        Ok(items)
    }

    async fn find_item(&self, id: Uuid) -> Result<Option<MagicItem>, ArmoryError> {
        Ok(MagicItem::find_by_id(id, &*self.db).await?)
    }

    async fn items_of(&self, character_id: Uuid) -> Result<Vec<MagicItem>, ArmoryError> {
        Ok(MagicItem::find_by_criteria(held_by(character_id), &*self.db).await?)
    }

    async fn associate_item(&self, character_id: Uuid, item_id: Uuid) -> Result<MagicItem, ArmoryError> {
        let mut tx = self.db.begin().await?;

        // lock order: character, then item (same as delete_character)
        let character = Character::find_one_by_criteria(
            QueryCriteria::by_id(character_id).for_update(),
            &mut *tx
        ).await?
            .ok_or(ArmoryError::not_found("character", character_id))?;

        let mut item = MagicItem::find_one_by_criteria(
            QueryCriteria::by_id(item_id).for_update(),
            &mut *tx
        ).await?
            .ok_or(ArmoryError::not_found("item", item_id))?;

        let current_items = MagicItem::find_by_criteria(held_by(character_id), &mut *tx).await?;
        rules::validate_association(&character, &item, &current_items)?;

        item.attach_to(character.id);
        let item = item.update(&mut *tx).await.map_err(amulet_conflict)?;
        tx.commit().await?;

        tracing::info!("[PostgresArmory::associate_item] {} now holds {}", character_id, item_id);
        Ok(item)
    }

    async fn disassociate_item(&self, character_id: Uuid, item_id: Uuid) -> Result<MagicItem, ArmoryError> {
        let mut tx = self.db.begin().await?;
        let item = MagicItem::find_one_by_criteria(
            QueryCriteria::by_id(item_id).for_update(),
            &mut *tx
        ).await?;

        let mut item = rules::validate_disassociation(item.as_ref(), character_id)?.clone();
        item.detach();
        let item = item.update(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!("[PostgresArmory::disassociate_item] {} released {}", character_id, item_id);
        Ok(item)
    }

    async fn find_amulet(&self, character_id: Uuid) -> Result<Option<MagicItem>, ArmoryError> {
        let amulet = MagicItem::find_one_by_criteria(
            QueryCriteria::new()
                .add_valued_filter("character_id", "=", character_id)
                .add_valued_filter("item_type", "=", ItemType::Amulet.to_string()),
            &*self.db
        ).await?;
        Ok(amulet)
    }

    async fn on_shutdown(&self) -> Result<(), ArmoryError> {
        self.db.close().await;
        tracing::info!("[PostgresArmory::on_shutdown] connection pool closed");
        Ok(())
    }
}

#[cfg(test)]
mod sql_tests {
    use super::*;
    use armory_database::{create_table, SqlxSchema};
    use tokio::sync::OnceCell;

    use crate::rules::{validate_character_creation, validate_item_creation, CharacterDraft, ItemDraft};
    use crate::CharacterClass;

    static ARMORY_TEST_POOL: OnceCell<Option<Arc<PgPool>>> = OnceCell::const_new();

    // Runs only against an explicitly configured database; every test returns early otherwise.
    async fn test_armory() -> Option<PostgresArmory> {
        ARMORY_TEST_POOL.get_or_init(|| async {
            let db_url = std::env::var("DATABASE_URL").ok()?;
            let pool = PgPool::connect(&db_url).await.expect("Failed to connect to Postgres for ARMORY_TEST_POOL");
            create_table::<Character>(&pool).await.expect("characters table");
            create_table::<MagicItem>(&pool).await.expect("magic_items table");
            Some(Arc::new(pool))
        }).await
            .clone()
            .map(PostgresArmory::new)
    }

    fn hero(base_strength: i32) -> ValidCharacter {
        validate_character_creation(CharacterDraft {
            name: "Ayla".to_string(),
            adventurer_name: "Thornfoot".to_string(),
            class: CharacterClass::Archer,
            level: 2,
            base_strength,
            base_defense: 10 - base_strength,
        }).unwrap()
    }

    fn item(item_type: ItemType, strength: i32, defense: i32) -> ValidItem {
        validate_item_creation(ItemDraft {
            name: format!("test {}", item_type),
            item_type,
            strength,
            defense,
        }).unwrap()
    }

    #[tokio::test]
    async fn test_character_create_and_find() -> Result<(), anyhow::Error> {
        let Some(armory) = test_armory().await else { return Ok(()) };

        let created = armory.create_character(hero(7)).await?;
        let fetched = Character::find_by_id(created.id, &**armory.get_db()).await?
            .expect("character should be found by id");
        assert_eq!(fetched, created);
        assert_eq!(fetched.class, CharacterClass::Archer);

        let sheet = armory.find_character_sheet(created.id).await?.unwrap();
        assert_eq!(sheet.totals.total_strength, 7);
        assert_eq!(sheet.totals.total_defense, 3);
        assert!(sheet.items.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_association_lifecycle() -> Result<(), anyhow::Error> {
        let Some(armory) = test_armory().await else { return Ok(()) };

        let character = armory.create_character(hero(5)).await?;
        let sword = armory.create_item(item(ItemType::Weapon, 2, 0)).await?;
        let bow = armory.create_item(item(ItemType::Weapon, 3, 0)).await?;
        let amulet = armory.create_item(item(ItemType::Amulet, 1, 1)).await?;
        let spare_amulet = armory.create_item(item(ItemType::Amulet, 2, 2)).await?;

        armory.associate_item(character.id, sword.id).await?;
        armory.associate_item(character.id, bow.id).await?;
        armory.associate_item(character.id, amulet.id).await?;

        let sheet = armory.find_character_sheet(character.id).await?.unwrap();
        assert_eq!(sheet.totals.total_strength, 5 + 2 + 3 + 1);
        assert_eq!(sheet.totals.total_defense, 5 + 1);
        assert_eq!(sheet.items.len(), 3);

        let second = armory.associate_item(character.id, spare_amulet.id).await;
        assert!(matches!(second, Err(ArmoryError::Rule(RuleViolation::CharacterAlreadyHasAmulet))));

        let again = armory.associate_item(character.id, sword.id).await;
        assert!(matches!(again, Err(ArmoryError::Rule(RuleViolation::ItemAlreadyAssociated))));

        assert_eq!(armory.find_amulet(character.id).await?.map(|a| a.id), Some(amulet.id));

        let released = armory.disassociate_item(character.id, amulet.id).await?;
        assert_eq!(released.character_id, None);
        let missing = armory.disassociate_item(character.id, amulet.id).await;
        assert!(matches!(missing, Err(ArmoryError::Rule(RuleViolation::ItemNotOnCharacter))));
        assert!(armory.find_amulet(character.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_detaches_items() -> Result<(), anyhow::Error> {
        let Some(armory) = test_armory().await else { return Ok(()) };

        let character = armory.create_character(hero(4)).await?;
        let shield = armory.create_item(item(ItemType::Armor, 0, 4)).await?;
        armory.associate_item(character.id, shield.id).await?;

        let deleted = armory.delete_character(character.id).await?;
        assert_eq!(deleted.id, character.id);
        assert!(armory.find_character_sheet(character.id).await?.is_none());

        let shield = armory.find_item(shield.id).await?.expect("items survive character deletion");
        assert_eq!(shield.character_id, None);

        let twice = armory.delete_character(character.id).await;
        assert!(matches!(twice, Err(ArmoryError::NotFound { entity: "character", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_rename_adventurer_only_touches_that_field() -> Result<(), anyhow::Error> {
        let Some(armory) = test_armory().await else { return Ok(()) };

        let character = armory.create_character(hero(6)).await?;
        let renamed = armory.rename_adventurer(character.id, "Nightwhisper".to_string()).await?;
        assert_eq!(renamed.adventurer_name, "Nightwhisper");
        assert_eq!(renamed.name, character.name);
        assert_eq!(renamed.base_strength, character.base_strength);
        assert_eq!(renamed.created_at, character.created_at);

        let unknown = armory.rename_adventurer(Uuid::new_v4(), "Nobody".to_string()).await;
        assert!(matches!(unknown, Err(ArmoryError::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_amulet_index_rejects_unchecked_second_amulet() -> Result<(), anyhow::Error> {
        let Some(armory) = test_armory().await else { return Ok(()) };

        let character = armory.create_character(hero(5)).await?;
        let first = armory.create_item(item(ItemType::Amulet, 1, 0)).await?;
        let mut second = armory.create_item(item(ItemType::Amulet, 0, 1)).await?;
        armory.associate_item(character.id, first.id).await?;

        // written straight through SqlxCrud, skipping validate_association
        second.attach_to(character.id);
        let second_id = second.id;
        let raced = second.update(&**armory.get_db()).await.map_err(amulet_conflict);
        assert!(matches!(raced, Err(ArmoryError::Rule(RuleViolation::CharacterAlreadyHasAmulet))));

        let stored = armory.find_item(second_id).await?.expect("second amulet still stored");
        assert_eq!(stored.character_id, None);
        Ok(())
    }

    #[test]
    fn test_non_unique_errors_pass_through() {
        assert!(matches!(amulet_conflict(SqlxError::RowNotFound), ArmoryError::Database(SqlxError::RowNotFound)));
    }

    #[tokio::test]
    async fn test_update_non_existent_item() -> Result<(), anyhow::Error> {
        let Some(armory) = test_armory().await else { return Ok(()) };

        let ghost = MagicItem::new(item(ItemType::Weapon, 1, 0));
        match ghost.update(&**armory.get_db()).await {
            Err(SqlxError::RowNotFound) => {}
            other => panic!("Expected sqlx::Error::RowNotFound, got {:?}", other),
        }
        assert_eq!(MagicItem::TABLE_NAME, "magic_items");
        Ok(())
    }
}
