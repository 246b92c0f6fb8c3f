use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, types::Uuid, Error as SqlxError, FromRow, Postgres};
use strum_macros::{Display, EnumString};

use armory_common::get_current_timestamp;
use armory_database::{SqlxCrud, SqlxFilterQuery, SqlxSchema};

use crate::rules::ValidCharacter;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, Display, EnumString)]
pub enum CharacterClass {
    #[serde(alias = "Guerreiro")]
    Warrior,
    #[serde(alias = "Mago")]
    Mage,
    #[serde(alias = "Arqueiro")]
    Archer,
    #[serde(alias = "Ladino")]
    Rogue,
    #[serde(alias = "Bardo")]
    Bard,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: Uuid,

    pub name: String,
    pub adventurer_name: String,
    pub class: CharacterClass,
    pub level: i32,

    pub base_strength: i32,
    pub base_defense: i32,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Character {
    pub fn new(character: ValidCharacter) -> Self {
        let draft = character.into_draft();
        let now = get_current_timestamp();
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            adventurer_name: draft.adventurer_name,
            class: draft.class,
            level: draft.level,
            base_strength: draft.base_strength,
            base_defense: draft.base_defense,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn rename_adventurer(&mut self, adventurer_name: String) {
        self.adventurer_name = adventurer_name;
        self.updated_at = get_current_timestamp();
    }
}

#[derive(Debug, FromRow)]
pub struct CharacterRowSqlx {
    pub id: Uuid,
    pub name: String,
    pub adventurer_name: String,
    pub character_class: String,
    pub level: i32,
    pub base_strength: i32,
    pub base_defense: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SqlxSchema for Character {
    type Id = Uuid;
    type Row = CharacterRowSqlx;

    const TABLE_NAME: &'static str = "characters";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "adventurer_name",
        "character_class",
        "level",
        "base_strength",
        "base_defense",
        "created_at",
        "updated_at",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn from_row(row: CharacterRowSqlx) -> Result<Self, SqlxError> {
        let class = CharacterClass::from_str(&row.character_class)
            .map_err(|e| SqlxError::Decode(Box::new(e)))?;
        Ok(Self {
            id: row.id,
            name: row.name,
            adventurer_name: row.adventurer_name,
            class,
            level: row.level,
            base_strength: row.base_strength,
            base_defense: row.base_defense,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn create_table_sql() -> String {
        r#"
        CREATE TABLE IF NOT EXISTS characters (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL CHECK (length(name) > 0),
            adventurer_name TEXT NOT NULL CHECK (length(adventurer_name) > 0),
            character_class TEXT NOT NULL,
            level INTEGER NOT NULL CHECK (level >= 0),
            base_strength INTEGER NOT NULL CHECK (base_strength BETWEEN 0 AND 10),
            base_defense INTEGER NOT NULL CHECK (base_defense BETWEEN 0 AND 10),
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )
        "#.to_string()
    }
}

impl SqlxCrud for Character {
    fn bind_insert<'q>(&self, query: QueryAs<'q, Postgres, CharacterRowSqlx, PgArguments>)
        -> QueryAs<'q, Postgres, CharacterRowSqlx, PgArguments>
    {
        query
            .bind(self.id)
            .bind(self.name.clone())
            .bind(self.adventurer_name.clone())
            .bind(self.class.to_string())
            .bind(self.level)
            .bind(self.base_strength)
            .bind(self.base_defense)
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn bind_update<'q>(&self, query: QueryAs<'q, Postgres, CharacterRowSqlx, PgArguments>)
        -> QueryAs<'q, Postgres, CharacterRowSqlx, PgArguments>
    {
        query
            .bind(self.name.clone())
            .bind(self.adventurer_name.clone())
            .bind(self.class.to_string())
            .bind(self.level)
            .bind(self.base_strength)
            .bind(self.base_defense)
            .bind(self.created_at)
            .bind(self.updated_at)
            .bind(self.id)
    }
}

impl SqlxFilterQuery for Character {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_accepts_both_spellings() {
        let classes: Vec<CharacterClass> =
            serde_json::from_str(r#"["Warrior", "Guerreiro", "Mago", "Arqueiro", "Ladino", "Bardo"]"#).unwrap();
        assert_eq!(classes, vec![
            CharacterClass::Warrior,
            CharacterClass::Warrior,
            CharacterClass::Mage,
            CharacterClass::Archer,
            CharacterClass::Rogue,
            CharacterClass::Bard,
        ]);
        assert!(serde_json::from_str::<CharacterClass>(r#""Paladin""#).is_err());
    }

    #[test]
    fn test_class_storage_text() {
        assert_eq!(CharacterClass::Rogue.to_string(), "Rogue");
        assert_eq!(CharacterClass::from_str("Bard").unwrap(), CharacterClass::Bard);
    }

    #[test]
    fn test_row_with_unknown_class_fails_to_decode() {
        let row = CharacterRowSqlx {
            id: Uuid::new_v4(),
            name: "Ayla".to_string(),
            adventurer_name: "Thornfoot".to_string(),
            character_class: "Necromancer".to_string(),
            level: 1,
            base_strength: 5,
            base_defense: 5,
            created_at: 0,
            updated_at: 0,
        };
        assert!(matches!(Character::from_row(row), Err(SqlxError::Decode(_))));
    }

    #[test]
    fn test_update_sql_binds_id_last() {
        assert_eq!(
            Character::update_by_id_sql(),
            "UPDATE characters SET name = $1, adventurer_name = $2, character_class = $3, level = $4, \
             base_strength = $5, base_defense = $6, created_at = $7, updated_at = $8 WHERE id = $9 \
             RETURNING id, name, adventurer_name, character_class, level, base_strength, base_defense, created_at, updated_at"
        );
    }
}
