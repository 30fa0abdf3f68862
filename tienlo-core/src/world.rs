//! World state types for Tiên Lộ Ký.
//!
//! Contains every named game entity the storyteller can reference through
//! the tag protocol: NPCs, beasts, locations, factions, lore, items, skills,
//! and quests, plus the world event timeline and the RAG vector store that
//! the world exclusively owns.

use crate::rag::VectorStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a stable entity id.
pub fn new_entity_id() -> String {
    Uuid::new_v4().to_string()
}

// ============================================================================
// Entity records
// ============================================================================

/// A non-player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Npc {
    pub id: String,
    pub name: String,
    pub gender: Option<String>,
    /// Free-text cultivation realm, if known.
    pub realm: Option<String>,
    pub description: String,
    /// Disposition toward the player, negative is hostile.
    pub affinity: i64,
    pub faction: Option<String>,
}

impl Npc {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: new_entity_id(),
            name: name.into(),
            gender: None,
            realm: None,
            description: description.into(),
            affinity: 0,
            faction: None,
        }
    }
}

/// A demonic beast (yêu thú).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beast {
    pub id: String,
    pub name: String,
    pub species: Option<String>,
    pub realm: Option<String>,
    pub description: String,
    pub is_hostile: bool,
}

impl Beast {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: new_entity_id(),
            name: name.into(),
            species: None,
            realm: None,
            description: description.into(),
            is_hostile: true,
        }
    }
}

/// A named location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    pub region: Option<String>,
    pub description: String,
    pub is_safe_zone: bool,
}

impl Location {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: new_entity_id(),
            name: name.into(),
            region: None,
            description: description.into(),
            is_safe_zone: false,
        }
    }
}

/// A sect, clan, or other faction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faction {
    pub id: String,
    pub name: String,
    /// Chính phái / ma đạo / trung lập.
    pub alignment: Option<String>,
    /// Player standing with the faction.
    pub reputation: i64,
    pub description: String,
}

impl Faction {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: new_entity_id(),
            name: name.into(),
            alignment: None,
            reputation: 0,
            description: description.into(),
        }
    }
}

/// A piece of discovered world lore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lore {
    pub id: String,
    pub title: String,
    pub content: String,
}

impl Lore {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: new_entity_id(),
            title: title.into(),
            content: content.into(),
        }
    }
}

/// An inventory item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    /// Đan dược / pháp bảo / tạp vật, free-form.
    pub category: Option<String>,
    pub rarity: Option<String>,
    pub quantity: i64,
    pub description: String,
    /// Stat bonuses as a JSON map, e.g. `{"atk": 10}`.
    pub bonuses: Option<serde_json::Value>,
}

impl Item {
    pub fn new(name: impl Into<String>, quantity: i64) -> Self {
        Self {
            id: new_entity_id(),
            name: name.into(),
            category: None,
            rarity: None,
            quantity,
            description: String::new(),
            bonuses: None,
        }
    }
}

/// A cultivation technique or combat skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    pub name: String,
    /// Công pháp / thần thông / kiếm quyết, free-form.
    pub skill_type: Option<String>,
    pub mastery: Option<String>,
    pub description: String,
    pub bonuses: Option<serde_json::Value>,
}

impl Skill {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: new_entity_id(),
            name: name.into(),
            skill_type: None,
            mastery: None,
            description: description.into(),
            bonuses: None,
        }
    }
}

/// A quest with ordered objectives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: String,
    pub title: String,
    pub description: String,
    pub objectives: Vec<QuestObjective>,
    pub status: QuestStatus,
}

impl Quest {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: new_entity_id(),
            title: title.into(),
            description: description.into(),
            objectives: Vec::new(),
            status: QuestStatus::Active,
        }
    }

    pub fn with_objectives(mut self, objectives: Vec<QuestObjective>) -> Self {
        self.objectives = objectives;
        self
    }

    /// Whether any objective remains incomplete.
    pub fn has_incomplete_objectives(&self) -> bool {
        self.objectives.iter().any(|o| !o.completed)
    }
}

/// A single quest objective, identified by its text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestObjective {
    pub text: String,
    pub completed: bool,
}

impl QuestObjective {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    Active,
    Completed,
}

/// An entry in the world event timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldEvent {
    pub id: String,
    /// Player turn on which the event happened.
    pub turn: u64,
    pub description: String,
}

/// The scenario seed the story was started from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartingFactors {
    pub scenario: String,
    pub background: String,
    pub opening: String,
}

// ============================================================================
// World container
// ============================================================================

/// The complete world state.
///
/// All mutation flows through the tag-update reducer; the vector store is
/// owned here and only touched by the re-index path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldState {
    pub npcs: Vec<Npc>,
    pub beasts: Vec<Beast>,
    pub locations: Vec<Location>,
    pub factions: Vec<Faction>,
    pub lore: Vec<Lore>,
    pub quests: Vec<Quest>,
    pub world_events: Vec<WorldEvent>,
    pub starting_factors: StartingFactors,
    pub rag_vector_store: VectorStore,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_npc(&self, name: &str) -> Option<&Npc> {
        self.npcs.iter().find(|n| n.name == name)
    }

    pub fn find_npc_mut(&mut self, name: &str) -> Option<&mut Npc> {
        self.npcs.iter_mut().find(|n| n.name == name)
    }

    pub fn find_beast(&self, name: &str) -> Option<&Beast> {
        self.beasts.iter().find(|b| b.name == name)
    }

    pub fn find_location(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.name == name)
    }

    pub fn find_faction(&self, name: &str) -> Option<&Faction> {
        self.factions.iter().find(|f| f.name == name)
    }

    pub fn find_faction_mut(&mut self, name: &str) -> Option<&mut Faction> {
        self.factions.iter_mut().find(|f| f.name == name)
    }

    pub fn find_lore(&self, title: &str) -> Option<&Lore> {
        self.lore.iter().find(|l| l.title == title)
    }

    pub fn find_quest(&self, title: &str) -> Option<&Quest> {
        self.quests.iter().find(|q| q.title == title)
    }

    pub fn find_quest_mut(&mut self, title: &str) -> Option<&mut Quest> {
        self.quests.iter_mut().find(|q| q.title == title)
    }

    /// Remove an NPC by exact name, returning the removed record.
    pub fn remove_npc(&mut self, name: &str) -> Option<Npc> {
        let index = self.npcs.iter().position(|n| n.name == name)?;
        Some(self.npcs.remove(index))
    }

    /// Record a world event on the timeline.
    pub fn add_event(&mut self, turn: u64, description: impl Into<String>) {
        self.world_events.push(WorldEvent {
            id: new_entity_id(),
            turn,
            description: description.into(),
        });
    }
}
