use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, types::Uuid, Error as SqlxError, Executor, FromRow, Postgres};
use strum_macros::{Display, EnumString};

use armory_common::get_current_timestamp;
use armory_database::{SqlxCrud, SqlxFilterQuery, SqlxSchema};

use crate::rules::ValidItem;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, Display, EnumString)]
pub enum ItemType {
    #[serde(alias = "Arma")]
    Weapon,
    #[serde(alias = "Armadura")]
    Armor,
    #[serde(alias = "Amuleto")]
    Amulet,
}

/// Where an item currently sits. The only transitions are
/// `Unassociated -> AssociatedTo(c)` and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Association {
    Unassociated,
    AssociatedTo(Uuid),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MagicItem {
    pub id: Uuid,

    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub strength: i32,
    pub defense: i32,

    pub character_id: Option<Uuid>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl MagicItem {
    /// Items are always created unassociated.
    pub fn new(item: ValidItem) -> Self {
        let draft = item.into_draft();
        let now = get_current_timestamp();
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            item_type: draft.item_type,
            strength: draft.strength,
            defense: draft.defense,
            character_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn association(&self) -> Association {
        match self.character_id {
            Some(character_id) => Association::AssociatedTo(character_id),
            None => Association::Unassociated,
        }
    }

    pub fn is_amulet(&self) -> bool {
        self.item_type == ItemType::Amulet
    }

    pub fn attach_to(&mut self, character_id: Uuid) {
        self.character_id = Some(character_id);
        self.updated_at = get_current_timestamp();
    }

    pub fn detach(&mut self) {
        self.character_id = None;
        self.updated_at = get_current_timestamp();
    }

    /// Clears the link of every item held by `character_id`, returning how many were detached.
    pub async fn detach_all<'e, E>(character_id: Uuid, executor: E) -> Result<u64, SqlxError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE magic_items SET character_id = NULL, updated_at = $2 WHERE character_id = $1"
        )
            .bind(character_id)
            .bind(get_current_timestamp())
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, FromRow)]
pub struct MagicItemRowSqlx {
    pub id: Uuid,
    pub name: String,
    pub item_type: String,
    pub strength: i32,
    pub defense: i32,
    pub character_id: Option<Uuid>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SqlxSchema for MagicItem {
    type Id = Uuid;
    type Row = MagicItemRowSqlx;

    const TABLE_NAME: &'static str = "magic_items";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "item_type",
        "strength",
        "defense",
        "character_id",
        "created_at",
        "updated_at",
    ];
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS idx_magic_items_character_id ON magic_items (character_id)",
        // at most one amulet per character, even under concurrent associations
        "CREATE UNIQUE INDEX IF NOT EXISTS uniq_magic_items_amulet_per_character \
         ON magic_items (character_id) WHERE item_type = 'Amulet' AND character_id IS NOT NULL",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn from_row(row: MagicItemRowSqlx) -> Result<Self, SqlxError> {
        let item_type = ItemType::from_str(&row.item_type)
            .map_err(|e| SqlxError::Decode(Box::new(e)))?;
        Ok(Self {
            id: row.id,
            name: row.name,
            item_type,
            strength: row.strength,
            defense: row.defense,
            character_id: row.character_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn create_table_sql() -> String {
        r#"
        CREATE TABLE IF NOT EXISTS magic_items (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL CHECK (length(name) > 0),
            item_type TEXT NOT NULL,
            strength INTEGER NOT NULL CHECK (strength BETWEEN 0 AND 10),
            defense INTEGER NOT NULL CHECK (defense BETWEEN 0 AND 10),
            character_id UUID NULL REFERENCES characters (id) ON DELETE SET NULL,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )
        "#.to_string()
    }
}

impl SqlxCrud for MagicItem {
    fn bind_insert<'q>(&self, query: QueryAs<'q, Postgres, MagicItemRowSqlx, PgArguments>)
        -> QueryAs<'q, Postgres, MagicItemRowSqlx, PgArguments>
    {
        query
            .bind(self.id)
            .bind(self.name.clone())
            .bind(self.item_type.to_string())
            .bind(self.strength)
            .bind(self.defense)
            .bind(self.character_id)
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn bind_update<'q>(&self, query: QueryAs<'q, Postgres, MagicItemRowSqlx, PgArguments>)
        -> QueryAs<'q, Postgres, MagicItemRowSqlx, PgArguments>
    {
        query
            .bind(self.name.clone())
            .bind(self.item_type.to_string())
            .bind(self.strength)
            .bind(self.defense)
            .bind(self.character_id)
            .bind(self.created_at)
            .bind(self.updated_at)
            .bind(self.id)
    }
}

impl SqlxFilterQuery for MagicItem {}
