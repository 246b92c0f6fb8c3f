//! Field and relationship rules for characters and magic items.
//!
//! Everything here is pure: callers load the rows, ask these functions whether a change
//! is allowed, and persist it themselves. Shape checks (non-empty names, ranges) happen
//! before a draft reaches this module.

use serde::Serialize;
use sqlx::types::Uuid;

use crate::{Association, Character, CharacterClass, ItemType, MagicItem};

/// Points a new character must split between base strength and base defense.
pub const CREATION_STAT_POINTS: i32 = 10;
pub const STAT_MIN: i32 = 0;
pub const STAT_MAX: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    #[error("item cannot have both strength and defense equal to 0")]
    ZeroStatsItem,
    #[error("weapons must have defense equal to 0")]
    WeaponWithDefense,
    #[error("armor must have strength equal to 0")]
    ArmorWithStrength,
    #[error("base strength and base defense must add up to exactly 10 (got {0})")]
    StatSumMismatch(i32),
    #[error("item is already associated with a character")]
    ItemAlreadyAssociated,
    #[error("character already has an amulet")]
    CharacterAlreadyHasAmulet,
    #[error("item not found on character")]
    ItemNotOnCharacter,
}

impl RuleViolation {
    /// Violations that mean "the relationship you named does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, RuleViolation::ItemNotOnCharacter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub name: String,
    pub item_type: ItemType,
    pub strength: i32,
    pub defense: i32,
}

/// An item draft that passed `validate_item_creation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidItem(ItemDraft);

impl ValidItem {
    pub fn draft(&self) -> &ItemDraft {
        &self.0
    }

    pub fn into_draft(self) -> ItemDraft {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterDraft {
    pub name: String,
    pub adventurer_name: String,
    pub class: CharacterClass,
    pub level: i32,
    pub base_strength: i32,
    pub base_defense: i32,
}

/// A character draft that passed `validate_character_creation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCharacter(CharacterDraft);

impl ValidCharacter {
    pub fn draft(&self) -> &CharacterDraft {
        &self.0
    }

    pub fn into_draft(self) -> CharacterDraft {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_strength: i32,
    pub total_defense: i32,
}

/// Checks run in order and stop at the first failure.
pub fn validate_item_creation(item: ItemDraft) -> Result<ValidItem, RuleViolation> {
    if item.strength == 0 && item.defense == 0 {
        return Err(RuleViolation::ZeroStatsItem);
    }
    if item.item_type == ItemType::Weapon && item.defense != 0 {
        return Err(RuleViolation::WeaponWithDefense);
    }
    if item.item_type == ItemType::Armor && item.strength != 0 {
        return Err(RuleViolation::ArmorWithStrength);
    }
    Ok(ValidItem(item))
}

pub fn validate_character_creation(character: CharacterDraft) -> Result<ValidCharacter, RuleViolation> {
    let sum = character.base_strength + character.base_defense;
    if sum != CREATION_STAT_POINTS {
        return Err(RuleViolation::StatSumMismatch(sum));
    }
    Ok(ValidCharacter(character))
}

pub fn compute_totals<'a, I>(character: &Character, items: I) -> Totals
where
    I: IntoIterator<Item = &'a MagicItem>,
{
    items.into_iter().fold(
        Totals {
            total_strength: character.base_strength,
            total_defense: character.base_defense,
        },
        |totals, item| Totals {
            total_strength: totals.total_strength + item.strength,
            total_defense: totals.total_defense + item.defense,
        },
    )
}

/// `current_items` is what the character holds right now; entries linked elsewhere are ignored.
pub fn validate_association(
    character: &Character,
    item: &MagicItem,
    current_items: &[MagicItem],
) -> Result<(), RuleViolation> {
    if let Association::AssociatedTo(_) = item.association() {
        return Err(RuleViolation::ItemAlreadyAssociated);
    }

    if item.is_amulet() {
        let holds_amulet = current_items
            .iter()
            .filter(|held| held.association() == Association::AssociatedTo(character.id))
            .any(MagicItem::is_amulet);
        if holds_amulet {
            return Err(RuleViolation::CharacterAlreadyHasAmulet);
        }
    }

    Ok(())
}

/// Succeeds only when `item` exists and is linked to `character_id`, handing the item back.
pub fn validate_disassociation(item: Option<&MagicItem>, character_id: Uuid) -> Result<&MagicItem, RuleViolation> {
    match item {
        Some(item) if item.association() == Association::AssociatedTo(character_id) => Ok(item),
        _ => Err(RuleViolation::ItemNotOnCharacter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEM_TYPES: [ItemType; 3] = [ItemType::Weapon, ItemType::Armor, ItemType::Amulet];

    fn draft(item_type: ItemType, strength: i32, defense: i32) -> ItemDraft {
        ItemDraft { name: "Ember".to_string(), item_type, strength, defense }
    }

    fn character(base_strength: i32, base_defense: i32) -> Character {
        Character {
            id: Uuid::new_v4(),
            name: "Ayla".to_string(),
            adventurer_name: "Thornfoot".to_string(),
            class: CharacterClass::Rogue,
            level: 3,
            base_strength,
            base_defense,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn held_item(item_type: ItemType, strength: i32, defense: i32, owner: Option<Uuid>) -> MagicItem {
        MagicItem {
            id: Uuid::new_v4(),
            name: format!("{}-{}-{}", item_type, strength, defense),
            item_type,
            strength,
            defense,
            character_id: owner,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_item_creation_rejects_exactly_the_forbidden_combinations() {
        for item_type in ITEM_TYPES {
            for strength in STAT_MIN..=STAT_MAX {
                for defense in STAT_MIN..=STAT_MAX {
                    let forbidden = (strength == 0 && defense == 0)
                        || (item_type == ItemType::Weapon && defense != 0)
                        || (item_type == ItemType::Armor && strength != 0);
                    let result = validate_item_creation(draft(item_type, strength, defense));
                    assert_eq!(result.is_err(), forbidden, "{:?} {} {}", item_type, strength, defense);
                }
            }
        }
    }

    #[test]
    fn test_item_checks_short_circuit_in_order() {
        assert_eq!(validate_item_creation(draft(ItemType::Weapon, 0, 0)), Err(RuleViolation::ZeroStatsItem));
        assert_eq!(validate_item_creation(draft(ItemType::Armor, 0, 0)), Err(RuleViolation::ZeroStatsItem));
        assert_eq!(validate_item_creation(draft(ItemType::Weapon, 5, 2)), Err(RuleViolation::WeaponWithDefense));
        assert_eq!(validate_item_creation(draft(ItemType::Armor, 3, 4)), Err(RuleViolation::ArmorWithStrength));
    }

    #[test]
    fn test_weapon_example() {
        let valid = validate_item_creation(draft(ItemType::Weapon, 5, 0)).unwrap();
        assert_eq!(valid.draft().strength, 5);
        assert!(validate_item_creation(draft(ItemType::Weapon, 5, 2)).is_err());
    }

    #[test]
    fn test_amulet_may_carry_both_stats() {
        assert!(validate_item_creation(draft(ItemType::Amulet, 4, 6)).is_ok());
    }

    #[test]
    fn test_character_creation_accepts_iff_sum_is_ten() {
        for base_strength in STAT_MIN..=STAT_MAX {
            for base_defense in STAT_MIN..=STAT_MAX {
                let result = validate_character_creation(CharacterDraft {
                    name: "Ayla".to_string(),
                    adventurer_name: "Thornfoot".to_string(),
                    class: CharacterClass::Bard,
                    level: 0,
                    base_strength,
                    base_defense,
                });
                assert_eq!(result.is_ok(), base_strength + base_defense == 10);
            }
        }
    }

    #[test]
    fn test_character_example() {
        let make = |base_strength, base_defense| CharacterDraft {
            name: "Ayla".to_string(),
            adventurer_name: "Thornfoot".to_string(),
            class: CharacterClass::Warrior,
            level: 1,
            base_strength,
            base_defense,
        };
        assert!(validate_character_creation(make(7, 3)).is_ok());
        assert_eq!(validate_character_creation(make(7, 4)), Err(RuleViolation::StatSumMismatch(11)));
    }

    #[test]
    fn test_totals_sum_item_modifiers() {
        let hero = character(5, 5);
        let items = vec![
            held_item(ItemType::Weapon, 2, 0, Some(hero.id)),
            held_item(ItemType::Weapon, 3, 0, Some(hero.id)),
        ];
        let totals = compute_totals(&hero, &items);
        assert_eq!(totals, Totals { total_strength: 10, total_defense: 5 });
    }

    #[test]
    fn test_totals_without_items_are_the_base_values() {
        let hero = character(7, 3);
        assert_eq!(compute_totals(&hero, std::iter::empty::<&MagicItem>()), Totals { total_strength: 7, total_defense: 3 });
    }

    #[test]
    fn test_totals_ignore_item_order() {
        let hero = character(4, 6);
        let mut items = vec![
            held_item(ItemType::Weapon, 3, 0, Some(hero.id)),
            held_item(ItemType::Armor, 0, 7, Some(hero.id)),
            held_item(ItemType::Amulet, 2, 2, Some(hero.id)),
        ];
        let forward = compute_totals(&hero, &items);
        items.reverse();
        assert_eq!(compute_totals(&hero, &items), forward);
        items.swap(0, 1);
        assert_eq!(compute_totals(&hero, &items), forward);
        assert_eq!(forward, Totals { total_strength: 9, total_defense: 15 });
    }

    #[test]
    fn test_association_rejects_linked_item() {
        let hero = character(5, 5);
        let other = Uuid::new_v4();
        let item = held_item(ItemType::Weapon, 2, 0, Some(other));
        assert_eq!(validate_association(&hero, &item, &[]), Err(RuleViolation::ItemAlreadyAssociated));

        let own = held_item(ItemType::Weapon, 2, 0, Some(hero.id));
        assert_eq!(validate_association(&hero, &own, &[]), Err(RuleViolation::ItemAlreadyAssociated));
    }

    #[test]
    fn test_second_amulet_is_rejected() {
        let hero = character(5, 5);
        let held = vec![held_item(ItemType::Amulet, 1, 1, Some(hero.id))];
        let amulet = held_item(ItemType::Amulet, 2, 0, None);
        assert_eq!(
            validate_association(&hero, &amulet, &held),
            Err(RuleViolation::CharacterAlreadyHasAmulet)
        );
    }

    #[test]
    fn test_already_linked_wins_over_amulet_check() {
        let hero = character(5, 5);
        let held = vec![held_item(ItemType::Amulet, 1, 1, Some(hero.id))];
        let amulet = held_item(ItemType::Amulet, 2, 0, Some(Uuid::new_v4()));
        assert_eq!(validate_association(&hero, &amulet, &held), Err(RuleViolation::ItemAlreadyAssociated));
    }

    #[test]
    fn test_non_amulets_never_fail_on_amulet_rule() {
        let hero = character(5, 5);
        let held = vec![
            held_item(ItemType::Amulet, 1, 1, Some(hero.id)),
            held_item(ItemType::Weapon, 4, 0, Some(hero.id)),
        ];
        for item_type in [ItemType::Weapon, ItemType::Armor] {
            let item = held_item(item_type, 1, 0, None);
            assert_eq!(validate_association(&hero, &item, &held), Ok(()));
        }
    }

    #[test]
    fn test_amulet_held_by_someone_else_does_not_count() {
        let hero = character(5, 5);
        let held = vec![held_item(ItemType::Amulet, 1, 1, Some(Uuid::new_v4()))];
        let amulet = held_item(ItemType::Amulet, 2, 0, None);
        assert_eq!(validate_association(&hero, &amulet, &held), Ok(()));
    }

    #[test]
    fn test_disassociation_requires_link_to_that_character() {
        let hero = Uuid::new_v4();
        let linked = held_item(ItemType::Armor, 0, 3, Some(hero));
        let unlinked = held_item(ItemType::Armor, 0, 3, None);
        let elsewhere = held_item(ItemType::Armor, 0, 3, Some(Uuid::new_v4()));

        assert_eq!(validate_disassociation(Some(&linked), hero).map(|i| i.id), Ok(linked.id));
        assert_eq!(validate_disassociation(Some(&unlinked), hero), Err(RuleViolation::ItemNotOnCharacter));
        assert_eq!(validate_disassociation(Some(&elsewhere), hero), Err(RuleViolation::ItemNotOnCharacter));
        assert_eq!(validate_disassociation(None, hero), Err(RuleViolation::ItemNotOnCharacter));
        assert!(RuleViolation::ItemNotOnCharacter.is_not_found());
    }
}
