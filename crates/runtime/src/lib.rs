mod armory_client;
mod character;
mod error;
mod item;
mod memory;
mod postgres;
pub mod rules;

pub use armory_client::{ArmoryClient, CharacterSheet};
pub use character::{Character, CharacterClass, CharacterRowSqlx};
pub use item::{Association, ItemType, MagicItem, MagicItemRowSqlx};
pub use error::ArmoryError;
pub use memory::InMemoryArmory;
pub use postgres::PostgresArmory;
pub use sqlx::Error as SqlxError;
