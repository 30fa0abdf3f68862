//! Player character state and cultivation realm parsing.
//!
//! The player's sheet is a flat set of named numeric stats addressed by the
//! `STATS_UPDATE` tag protocol, plus the free-text cultivation realm string
//! the model emits, which [`RealmState`] parses into a structured form.

use crate::world::{Item, Skill};
use serde::{Deserialize, Serialize};

/// The nine major cultivation realms, in ascending order.
pub const MAJOR_REALMS: [&str; 9] = [
    "Luyện Khí",
    "Trúc Cơ",
    "Kim Đan",
    "Nguyên Anh",
    "Hóa Thần",
    "Luyện Hư",
    "Hợp Thể",
    "Đại Thừa",
    "Độ Kiếp",
];

/// Display name for the non-cultivating mortal tier.
pub const MORTAL_REALM: &str = "Phàm Nhân";

/// Sentinel major realm index for mortals.
pub const MORTAL_REALM_INDEX: i32 = -1;

/// The player character.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub name: String,

    pub hp: i64,
    pub max_hp: i64,

    /// Spiritual energy (linh lực).
    pub mana: i64,
    pub max_mana: i64,

    pub atk: i64,
    pub def: i64,

    /// Cultivation experience toward the next sub-realm.
    pub exp: i64,

    /// Spirit stones (linh thạch).
    pub currency: i64,

    /// Remaining lifespan in years.
    pub lifespan: i64,

    /// Turn counter, incremented once per model turn.
    pub turn: u64,

    /// Free-text realm string as the model emits it, e.g. "Luyện Khí tầng 3".
    pub realm: String,

    pub inventory: Vec<Item>,
    pub skills: Vec<Skill>,
}

impl PlayerState {
    /// Create a fresh mortal character.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hp: 100,
            max_hp: 100,
            mana: 50,
            max_mana: 50,
            atk: 10,
            def: 10,
            exp: 0,
            currency: 0,
            lifespan: 80,
            turn: 0,
            realm: MORTAL_REALM.to_string(),
            inventory: Vec::new(),
            skills: Vec::new(),
        }
    }

    /// Parsed view of the current realm string.
    pub fn realm_state(&self) -> RealmState {
        RealmState::parse(&self.realm)
    }

    /// Find an inventory item by exact name.
    pub fn find_item(&self, name: &str) -> Option<&Item> {
        self.inventory.iter().find(|i| i.name == name)
    }

    pub fn find_item_mut(&mut self, name: &str) -> Option<&mut Item> {
        self.inventory.iter_mut().find(|i| i.name == name)
    }

    /// Find a learned skill by exact name.
    pub fn find_skill(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.name == name)
    }
}

/// Structured view of a free-text cultivation realm string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmState {
    pub major_realm_name: String,

    /// Index into [`MAJOR_REALMS`], or [`MORTAL_REALM_INDEX`] for mortals.
    pub major_realm_index: i32,

    /// Sub-realm level, 1 through 10.
    pub sub_realm_level: u8,

    pub sub_realm_name: String,

    pub display_name: String,
}

impl RealmState {
    /// Parse a realm string the model emitted.
    ///
    /// Recognizes a major realm name prefix from [`MAJOR_REALMS`] and the
    /// last integer in the string as the sub-realm level (clamped to 1–10).
    /// Anything unrecognized falls back to the mortal tier; parsing never
    /// fails.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        let major = MAJOR_REALMS
            .iter()
            .enumerate()
            .find(|(_, name)| starts_with_ignore_case(trimmed, name));

        match major {
            Some((index, name)) => {
                let level = last_integer(trimmed).unwrap_or(1).clamp(1, 10) as u8;
                let sub_realm_name = format!("Tầng {level}");
                Self {
                    major_realm_name: (*name).to_string(),
                    major_realm_index: index as i32,
                    sub_realm_level: level,
                    sub_realm_name: sub_realm_name.clone(),
                    display_name: format!("{name} {sub_realm_name}"),
                }
            }
            None => Self::mortal(trimmed),
        }
    }

    /// The mortal tier, displaying the original string when it is non-empty.
    fn mortal(raw: &str) -> Self {
        let display = if raw.is_empty() {
            MORTAL_REALM.to_string()
        } else {
            raw.to_string()
        };
        Self {
            major_realm_name: MORTAL_REALM.to_string(),
            major_realm_index: MORTAL_REALM_INDEX,
            sub_realm_level: 1,
            sub_realm_name: String::new(),
            display_name: display,
        }
    }
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack.to_lowercase().starts_with(&prefix.to_lowercase())
}

/// Last run of ASCII digits in the string, if any.
fn last_integer(s: &str) -> Option<i64> {
    let mut result = None;
    let mut current = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            current.push(c);
        } else if !current.is_empty() {
            result = current.parse().ok();
            current.clear();
        }
    }
    if !current.is_empty() {
        result = current.parse().ok();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_major_realm_with_level() {
        let realm = RealmState::parse("Luyện Khí tầng 3");
        assert_eq!(realm.major_realm_name, "Luyện Khí");
        assert_eq!(realm.major_realm_index, 0);
        assert_eq!(realm.sub_realm_level, 3);
        assert_eq!(realm.display_name, "Luyện Khí Tầng 3");
    }

    #[test]
    fn test_parse_higher_realm() {
        let realm = RealmState::parse("Kim Đan Kỳ tầng 7");
        assert_eq!(realm.major_realm_index, 2);
        assert_eq!(realm.sub_realm_level, 7);
    }

    #[test]
    fn test_parse_missing_level_defaults_to_one() {
        let realm = RealmState::parse("Trúc Cơ");
        assert_eq!(realm.major_realm_index, 1);
        assert_eq!(realm.sub_realm_level, 1);
    }

    #[test]
    fn test_parse_level_clamped() {
        let realm = RealmState::parse("Trúc Cơ tầng 15");
        assert_eq!(realm.sub_realm_level, 10);
    }

    #[test]
    fn test_parse_mortal() {
        let realm = RealmState::parse("Phàm Nhân");
        assert_eq!(realm.major_realm_index, MORTAL_REALM_INDEX);
        assert_eq!(realm.display_name, "Phàm Nhân");
    }

    #[test]
    fn test_parse_unknown_falls_back_to_mortal() {
        let realm = RealmState::parse("một kẻ vô danh");
        assert_eq!(realm.major_realm_index, MORTAL_REALM_INDEX);
        assert_eq!(realm.display_name, "một kẻ vô danh");
    }

    #[test]
    fn test_new_player_is_mortal() {
        let player = PlayerState::new("Lâm Phong");
        assert_eq!(player.turn, 0);
        assert_eq!(player.realm_state().major_realm_index, MORTAL_REALM_INDEX);
    }
}
