//! Typed state-update payloads.
//!
//! Tag names dispatch into the closed [`GameUpdate`] sum type, so the
//! reducer's match is exhaustive and adding a tag kind is a compile-checked
//! change. Constructors are permissive about optional attributes but a tag
//! missing its natural key (name/title) is malformed and yields `None`.

use crate::tags::scan::{AttrValue, RawTag};
use crate::world::{Beast, Faction, Item, Location, Lore, Npc, Quest, QuestObjective, Skill};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How a numeric stat value is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatOp {
    /// Absolute assignment: `field=value`.
    Set,
    /// Relative change: `field=+value`, `field=-value`, or `field+=value`.
    Add,
}

/// A single stat mutation from a `STATS_UPDATE` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatChange {
    pub field: String,
    pub op: StatOp,
    pub value: StatValue,
}

/// Stat values are numeric except for the realm string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatValue {
    Int(i64),
    Text(String),
}

/// A numeric change applied to an existing entity field (e.g. affinity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumChange {
    pub op: StatOp,
    pub value: i64,
}

/// A quest objective completion flag, identified by objective text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveChange {
    pub text: String,
    pub completed: bool,
}

/// Every state mutation the tag protocol can express.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameUpdate {
    ItemAcquired(Item),
    ItemConsumed {
        name: String,
        quantity: i64,
    },
    ItemUpdated {
        name: String,
        description: Option<String>,
        quantity: Option<NumChange>,
    },
    NpcDiscovered(Npc),
    NpcUpdated {
        name: String,
        affinity: Option<NumChange>,
        description: Option<String>,
        realm: Option<String>,
    },
    NpcRemoved {
        name: String,
    },
    BeastDiscovered(Beast),
    LocationDiscovered(Location),
    FactionDiscovered(Faction),
    LoreAdded(Lore),
    SkillLearned(Skill),
    StatsUpdated(Vec<StatChange>),
    QuestAssigned(Quest),
    QuestUpdated {
        title: String,
        objectives: Vec<ObjectiveChange>,
    },
    QuestCompleted {
        title: String,
    },
}

impl GameUpdate {
    /// Build a typed update from a scanned tag.
    ///
    /// `Ok(None)` means the tag name is not part of the protocol (ignored,
    /// forward-compatible); `Err` means the tag is recognized but its
    /// payload is unusable, so the single tag is dropped.
    pub fn from_raw(tag: &RawTag) -> Result<Option<GameUpdate>, TagPayloadError> {
        let update = match tag.name.as_str() {
            "ITEM_ACQUIRED" => Some(item_acquired(tag)?),
            "ITEM_CONSUMED" => Some(GameUpdate::ItemConsumed {
                name: required(tag, "name")?,
                quantity: int_attr(tag, "quantity").unwrap_or(1),
            }),
            "ITEM_UPDATE" => Some(GameUpdate::ItemUpdated {
                name: required(tag, "name")?,
                description: optional(tag, "description"),
                quantity: num_change(tag, "quantity"),
            }),
            "NPC" => Some(npc_discovered(tag)?),
            "NPC_UPDATE" => Some(GameUpdate::NpcUpdated {
                name: required(tag, "name")?,
                affinity: num_change(tag, "affinity"),
                description: optional(tag, "description"),
                realm: optional(tag, "realm"),
            }),
            "NPC_REMOVE" => Some(GameUpdate::NpcRemoved {
                name: required(tag, "name")?,
            }),
            "YEUTHU" => Some(beast_discovered(tag)?),
            "MAINLOCATION" => Some(location_discovered(tag)?),
            "FACTION_DISCOVERED" => Some(faction_discovered(tag)?),
            "WORLD_LORE_ADD" => Some(GameUpdate::LoreAdded(Lore::new(
                required(tag, "title")?,
                optional(tag, "content").unwrap_or_default(),
            ))),
            "SKILL_LEARNED" => Some(skill_learned(tag)?),
            "STATS_UPDATE" => Some(stats_updated(tag)?),
            "QUEST_ASSIGNED" => Some(quest_assigned(tag)?),
            "QUEST_UPDATED" => Some(quest_updated(tag)?),
            "QUEST_COMPLETED" => Some(GameUpdate::QuestCompleted {
                title: required(tag, "title")?,
            }),
            _ => None,
        };
        Ok(update)
    }
}

/// A recognized tag whose payload could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tag {tag}: {reason}")]
pub struct TagPayloadError {
    pub tag: String,
    pub reason: String,
}

fn payload_err(tag: &RawTag, reason: impl Into<String>) -> TagPayloadError {
    TagPayloadError {
        tag: tag.name.clone(),
        reason: reason.into(),
    }
}

// ============================================================================
// Attribute helpers
// ============================================================================

fn required(tag: &RawTag, key: &str) -> Result<String, TagPayloadError> {
    match tag.get_str(key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(payload_err(tag, format!("missing required attribute `{key}`"))),
    }
}

fn optional(tag: &RawTag, key: &str) -> Option<String> {
    tag.get_str(key)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn int_attr(tag: &RawTag, key: &str) -> Option<i64> {
    tag.get(key).and_then(AttrValue::as_i64)
}

fn bool_attr(tag: &RawTag, key: &str) -> Option<bool> {
    tag.get(key).and_then(AttrValue::as_bool)
}

/// Parse a JSON bonus map carried as a quoted string attribute.
fn json_attr(tag: &RawTag, key: &str) -> Option<serde_json::Value> {
    let raw = tag.get_str(key)?;
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(tag = %tag.name, %raw, "ignoring unparseable bonus attribute");
            None
        }
    }
}

/// Interpret an attribute as a set-or-delta numeric change.
///
/// `field=+10` and `field=-10` are deltas, `field=10` is an absolute set.
/// A compound-assign key (`field+=10`) is handled by the caller stripping
/// the trailing `+` before lookup; see [`stat_change_from_attr`].
fn num_change(tag: &RawTag, key: &str) -> Option<NumChange> {
    let value = tag.get(key)?;
    let raw = value.as_str().trim();
    let (op, digits) = split_operator(raw);
    match digits.parse::<i64>() {
        Ok(n) => Some(NumChange { op, value: n }),
        Err(_) => {
            warn!(tag = %tag.name, %raw, "ignoring non-numeric change");
            None
        }
    }
}

/// Split a raw stat value into its operator and numeric part.
///
/// `+=50` and `+50` mean add, `-50` means subtract (add negative), plain
/// digits mean set.
fn split_operator(raw: &str) -> (StatOp, String) {
    if let Some(rest) = raw.strip_prefix("+=") {
        return (StatOp::Add, rest.trim().to_string());
    }
    if let Some(rest) = raw.strip_prefix("-=") {
        return (StatOp::Add, format!("-{}", rest.trim()));
    }
    if let Some(rest) = raw.strip_prefix('+') {
        return (StatOp::Add, rest.trim().to_string());
    }
    if raw.starts_with('-') {
        return (StatOp::Add, raw.to_string());
    }
    (StatOp::Set, raw.to_string())
}

/// Build one stat change from a raw attribute pair.
///
/// Supports all three operator encodings: `field=value`, `field=+value` /
/// `field=-value`, and `field+=value` (where the scanner leaves the `+` on
/// the key). Non-numeric values become text sets (the realm string).
fn stat_change_from_attr(key: &str, value: &AttrValue) -> StatChange {
    let (field, forced_add) = match key.strip_suffix('+') {
        Some(stripped) => (stripped.trim(), true),
        None => (key, false),
    };

    let raw = value.as_str().trim();
    let (mut op, digits) = split_operator(raw);
    if forced_add {
        op = StatOp::Add;
    }

    match digits.parse::<i64>() {
        Ok(n) => StatChange {
            field: field.to_string(),
            op,
            value: StatValue::Int(n),
        },
        Err(_) => match digits.parse::<f64>() {
            Ok(f) => StatChange {
                field: field.to_string(),
                op,
                value: StatValue::Int(f as i64),
            },
            Err(_) => StatChange {
                field: field.to_string(),
                op: StatOp::Set,
                value: StatValue::Text(raw.to_string()),
            },
        },
    }
}

// ============================================================================
// Per-tag constructors
// ============================================================================

fn item_acquired(tag: &RawTag) -> Result<GameUpdate, TagPayloadError> {
    let mut item = Item::new(required(tag, "name")?, int_attr(tag, "quantity").unwrap_or(1));
    item.category = optional(tag, "category");
    item.rarity = optional(tag, "rarity");
    item.description = optional(tag, "description").unwrap_or_default();
    item.bonuses = json_attr(tag, "bonuses");
    Ok(GameUpdate::ItemAcquired(item))
}

fn npc_discovered(tag: &RawTag) -> Result<GameUpdate, TagPayloadError> {
    let mut npc = Npc::new(
        required(tag, "name")?,
        optional(tag, "description").unwrap_or_default(),
    );
    npc.gender = optional(tag, "gender");
    npc.realm = optional(tag, "realm");
    npc.faction = optional(tag, "faction");
    npc.affinity = int_attr(tag, "affinity").unwrap_or(0);
    Ok(GameUpdate::NpcDiscovered(npc))
}

fn beast_discovered(tag: &RawTag) -> Result<GameUpdate, TagPayloadError> {
    let mut beast = Beast::new(
        required(tag, "name")?,
        optional(tag, "description").unwrap_or_default(),
    );
    beast.species = optional(tag, "species");
    beast.realm = optional(tag, "realm");
    beast.is_hostile = bool_attr(tag, "hostile").unwrap_or(true);
    Ok(GameUpdate::BeastDiscovered(beast))
}

fn location_discovered(tag: &RawTag) -> Result<GameUpdate, TagPayloadError> {
    let mut location = Location::new(
        required(tag, "name")?,
        optional(tag, "description").unwrap_or_default(),
    );
    location.region = optional(tag, "region");
    location.is_safe_zone = bool_attr(tag, "safe").unwrap_or(false);
    Ok(GameUpdate::LocationDiscovered(location))
}

fn faction_discovered(tag: &RawTag) -> Result<GameUpdate, TagPayloadError> {
    let mut faction = Faction::new(
        required(tag, "name")?,
        optional(tag, "description").unwrap_or_default(),
    );
    faction.alignment = optional(tag, "alignment");
    faction.reputation = int_attr(tag, "reputation").unwrap_or(0);
    Ok(GameUpdate::FactionDiscovered(faction))
}

fn skill_learned(tag: &RawTag) -> Result<GameUpdate, TagPayloadError> {
    let mut skill = Skill::new(
        required(tag, "name")?,
        optional(tag, "description").unwrap_or_default(),
    );
    skill.skill_type = optional(tag, "type");
    skill.mastery = optional(tag, "mastery");
    skill.bonuses = json_attr(tag, "bonuses");
    Ok(GameUpdate::SkillLearned(skill))
}

fn stats_updated(tag: &RawTag) -> Result<GameUpdate, TagPayloadError> {
    if tag.attrs.is_empty() {
        return Err(payload_err(tag, "no stat attributes"));
    }
    let changes = tag
        .attrs
        .iter()
        .map(|(key, value)| stat_change_from_attr(key, value))
        .collect();
    Ok(GameUpdate::StatsUpdated(changes))
}

fn quest_assigned(tag: &RawTag) -> Result<GameUpdate, TagPayloadError> {
    let quest = Quest::new(
        required(tag, "title")?,
        optional(tag, "description").unwrap_or_default(),
    )
    .with_objectives(
        split_list(optional(tag, "objectives").as_deref().unwrap_or(""))
            .into_iter()
            .map(QuestObjective::new)
            .collect(),
    );
    Ok(GameUpdate::QuestAssigned(quest))
}

fn quest_updated(tag: &RawTag) -> Result<GameUpdate, TagPayloadError> {
    let title = required(tag, "title")?;

    // Either a single objective/completed pair, or aligned pipe lists.
    let objectives = if let Some(text) = optional(tag, "objective") {
        vec![ObjectiveChange {
            text,
            completed: bool_attr(tag, "completed").unwrap_or(false),
        }]
    } else {
        let texts = split_list(optional(tag, "objectives").as_deref().unwrap_or(""));
        let flags_raw = optional(tag, "completed").unwrap_or_default();
        let flags: Vec<bool> = flags_raw
            .split('|')
            .map(|s| s.trim().eq_ignore_ascii_case("true"))
            .collect();
        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| ObjectiveChange {
                text,
                completed: flags.get(index).copied().unwrap_or(false),
            })
            .collect()
    };

    if objectives.is_empty() {
        return Err(payload_err(tag, "no objectives"));
    }
    Ok(GameUpdate::QuestUpdated { title, objectives })
}

/// Split a pipe-separated list attribute into trimmed non-empty parts.
fn split_list(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
