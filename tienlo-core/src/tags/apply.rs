//! Applies parsed updates to game state.
//!
//! Updates are applied strictly in document order: a later tag sees the
//! effects of an earlier one, so removal-then-acquisition of the same item
//! name nets to "item present". Creation is append-if-absent keyed by exact
//! name; update and removal tags that reference an unknown name are no-ops,
//! never errors, because the model may reference entities inconsistently.

use crate::player::PlayerState;
use crate::tags::update::{GameUpdate, NumChange, StatChange, StatOp, StatValue};
use crate::world::{QuestObjective, QuestStatus, WorldState};
use tracing::debug;

/// What happened to a single update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyStatus {
    Applied,
    /// Skipped with a reason, e.g. duplicate creation or unknown target.
    Skipped(String),
}

/// Per-update record for the raw-response debug surface.
#[derive(Debug, Clone)]
pub struct AppliedUpdate {
    pub update: GameUpdate,
    pub status: ApplyStatus,
}

/// Outcome of applying one turn's updates.
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    pub entries: Vec<AppliedUpdate>,

    /// Whether any applied stat change touched the turn counter. The
    /// orchestrator adds an implicit `+1` when the model forgot it.
    pub turn_advanced: bool,
}

impl ApplyOutcome {
    pub fn applied_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == ApplyStatus::Applied)
            .count()
    }
}

/// Apply updates in order, returning the per-update report.
pub fn apply_updates(
    player: &mut PlayerState,
    world: &mut WorldState,
    updates: &[GameUpdate],
) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();

    for update in updates {
        let status = apply_one(player, world, update, &mut outcome.turn_advanced);
        if let ApplyStatus::Skipped(reason) = &status {
            debug!(?update, %reason, "update skipped");
        }
        outcome.entries.push(AppliedUpdate {
            update: update.clone(),
            status,
        });
    }

    outcome
}

fn apply_one(
    player: &mut PlayerState,
    world: &mut WorldState,
    update: &GameUpdate,
    turn_advanced: &mut bool,
) -> ApplyStatus {
    match update {
        GameUpdate::ItemAcquired(item) => {
            if player.find_item(&item.name).is_some() {
                return skipped("duplicate item name");
            }
            player.inventory.push(item.clone());
            ApplyStatus::Applied
        }

        GameUpdate::ItemConsumed { name, quantity } => {
            let Some(item) = player.find_item_mut(name) else {
                return skipped("no such item");
            };
            item.quantity -= (*quantity).max(1);
            if item.quantity <= 0 {
                player.inventory.retain(|i| i.name != *name);
            }
            ApplyStatus::Applied
        }

        GameUpdate::ItemUpdated {
            name,
            description,
            quantity,
        } => {
            let Some(item) = player.find_item_mut(name) else {
                return skipped("no such item");
            };
            if let Some(description) = description {
                item.description = description.clone();
            }
            if let Some(change) = quantity {
                item.quantity = apply_num(item.quantity, change);
            }
            ApplyStatus::Applied
        }

        GameUpdate::NpcDiscovered(npc) => {
            if world.find_npc(&npc.name).is_some() {
                return skipped("duplicate npc name");
            }
            world.npcs.push(npc.clone());
            ApplyStatus::Applied
        }

        GameUpdate::NpcUpdated {
            name,
            affinity,
            description,
            realm,
        } => {
            let Some(npc) = world.find_npc_mut(name) else {
                return skipped("no such npc");
            };
            if let Some(change) = affinity {
                npc.affinity = apply_num(npc.affinity, change);
            }
            if let Some(description) = description {
                npc.description = description.clone();
            }
            if let Some(realm) = realm {
                npc.realm = Some(realm.clone());
            }
            ApplyStatus::Applied
        }

        GameUpdate::NpcRemoved { name } => match world.remove_npc(name) {
            Some(_) => ApplyStatus::Applied,
            None => skipped("no such npc"),
        },

        GameUpdate::BeastDiscovered(beast) => {
            if world.find_beast(&beast.name).is_some() {
                return skipped("duplicate beast name");
            }
            world.beasts.push(beast.clone());
            ApplyStatus::Applied
        }

        GameUpdate::LocationDiscovered(location) => {
            if world.find_location(&location.name).is_some() {
                return skipped("duplicate location name");
            }
            world.locations.push(location.clone());
            ApplyStatus::Applied
        }

        GameUpdate::FactionDiscovered(faction) => {
            if world.find_faction(&faction.name).is_some() {
                return skipped("duplicate faction name");
            }
            world.factions.push(faction.clone());
            ApplyStatus::Applied
        }

        GameUpdate::LoreAdded(lore) => {
            if world.find_lore(&lore.title).is_some() {
                return skipped("duplicate lore title");
            }
            world.lore.push(lore.clone());
            ApplyStatus::Applied
        }

        GameUpdate::SkillLearned(skill) => {
            if player.find_skill(&skill.name).is_some() {
                return skipped("duplicate skill name");
            }
            player.skills.push(skill.clone());
            ApplyStatus::Applied
        }

        GameUpdate::StatsUpdated(changes) => {
            let mut any = false;
            for change in changes {
                if apply_stat(player, change) {
                    any = true;
                    if change.field.eq_ignore_ascii_case("turn") {
                        *turn_advanced = true;
                    }
                }
            }
            if any {
                ApplyStatus::Applied
            } else {
                skipped("no recognized stat field")
            }
        }

        GameUpdate::QuestAssigned(quest) => {
            if world.find_quest(&quest.title).is_some() {
                return skipped("duplicate quest title");
            }
            world.quests.push(quest.clone());
            ApplyStatus::Applied
        }

        GameUpdate::QuestUpdated { title, objectives } => {
            let Some(quest) = world.find_quest_mut(title) else {
                return skipped("no such quest");
            };
            for change in objectives {
                // Objective identity is the text, not the position; the
                // model may reorder. Unknown text appends a new objective.
                match quest.objectives.iter_mut().find(|o| o.text == change.text) {
                    Some(objective) => objective.completed = change.completed,
                    None => {
                        let mut objective = QuestObjective::new(change.text.clone());
                        objective.completed = change.completed;
                        quest.objectives.push(objective);
                    }
                }
            }
            ApplyStatus::Applied
        }

        GameUpdate::QuestCompleted { title } => {
            let Some(quest) = world.find_quest_mut(title) else {
                return skipped("no such quest");
            };
            quest.status = QuestStatus::Completed;
            for objective in &mut quest.objectives {
                objective.completed = true;
            }
            ApplyStatus::Applied
        }
    }
}

fn skipped(reason: &str) -> ApplyStatus {
    ApplyStatus::Skipped(reason.to_string())
}

fn apply_num(current: i64, change: &NumChange) -> i64 {
    match change.op {
        StatOp::Set => change.value,
        StatOp::Add => current + change.value,
    }
}

/// Apply one stat change to the player sheet. Returns false for unknown
/// fields, which the protocol treats as a no-op.
fn apply_stat(player: &mut PlayerState, change: &StatChange) -> bool {
    let field = change.field.to_ascii_lowercase();

    if field == "realm" {
        if let StatValue::Text(text) = &change.value {
            player.realm = text.clone();
            return true;
        }
        return false;
    }

    let StatValue::Int(value) = change.value else {
        return false;
    };

    let slot: &mut i64 = match field.as_str() {
        "hp" | "sinhluc" => &mut player.hp,
        "maxhp" | "max_hp" => &mut player.max_hp,
        "mana" | "linhluc" => &mut player.mana,
        "maxmana" | "max_mana" => &mut player.max_mana,
        "atk" => &mut player.atk,
        "def" => &mut player.def,
        "exp" => &mut player.exp,
        "currency" | "linhthach" => &mut player.currency,
        "lifespan" | "tuoitho" => &mut player.lifespan,
        "turn" => {
            let next = match change.op {
                StatOp::Set => value.max(0) as u64,
                StatOp::Add => player.turn.saturating_add_signed(value),
            };
            player.turn = next;
            return true;
        }
        _ => return false,
    };

    *slot = apply_num(*slot, &NumChange {
        op: change.op,
        value,
    });

    // Vitals never exceed their maximums or drop below zero.
    player.hp = player.hp.clamp(0, player.max_hp);
    player.mana = player.mana.clamp(0, player.max_mana);

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Item, Npc, Quest};

    fn setup() -> (PlayerState, WorldState) {
        (PlayerState::new("Lâm Phong"), WorldState::new())
    }

    fn stat(field: &str, op: StatOp, value: i64) -> GameUpdate {
        GameUpdate::StatsUpdated(vec![StatChange {
            field: field.to_string(),
            op,
            value: StatValue::Int(value),
        }])
    }

    #[test]
    fn test_item_acquired_then_duplicate_rejected() {
        let (mut player, mut world) = setup();
        let updates = vec![
            GameUpdate::ItemAcquired(Item::new("Kiếm", 1)),
            GameUpdate::ItemAcquired(Item::new("Kiếm", 1)),
        ];

        let outcome = apply_updates(&mut player, &mut world, &updates);
        assert_eq!(outcome.applied_count(), 1);
        assert_eq!(player.inventory.len(), 1);
    }

    #[test]
    fn test_removal_then_acquisition_nets_present() {
        let (mut player, mut world) = setup();
        player.inventory.push(Item::new("Kiếm", 1));

        let updates = vec![
            GameUpdate::ItemConsumed {
                name: "Kiếm".to_string(),
                quantity: 1,
            },
            GameUpdate::ItemAcquired(Item::new("Kiếm", 1)),
        ];

        apply_updates(&mut player, &mut world, &updates);
        assert!(player.find_item("Kiếm").is_some());
    }

    #[test]
    fn test_currency_delta_and_set() {
        let (mut player, mut world) = setup();
        player.currency = 100;

        apply_updates(&mut player, &mut world, &[stat("currency", StatOp::Add, 50)]);
        assert_eq!(player.currency, 150);

        apply_updates(&mut player, &mut world, &[stat("currency", StatOp::Set, 7)]);
        assert_eq!(player.currency, 7);
    }

    #[test]
    fn test_hp_clamped_to_bounds() {
        let (mut player, mut world) = setup();

        apply_updates(&mut player, &mut world, &[stat("hp", StatOp::Add, 999)]);
        assert_eq!(player.hp, player.max_hp);

        apply_updates(&mut player, &mut world, &[stat("hp", StatOp::Add, -9999)]);
        assert_eq!(player.hp, 0);
    }

    #[test]
    fn test_turn_counter_flag() {
        let (mut player, mut world) = setup();
        let outcome = apply_updates(&mut player, &mut world, &[stat("turn", StatOp::Add, 1)]);
        assert!(outcome.turn_advanced);
        assert_eq!(player.turn, 1);

        let outcome =
            apply_updates(&mut player, &mut world, &[stat("currency", StatOp::Add, 5)]);
        assert!(!outcome.turn_advanced);
    }

    #[test]
    fn test_unknown_stat_field_is_noop() {
        let (mut player, mut world) = setup();
        let outcome =
            apply_updates(&mut player, &mut world, &[stat("khí vận", StatOp::Add, 1)]);
        assert_eq!(outcome.applied_count(), 0);
    }

    #[test]
    fn test_realm_set_via_stats() {
        let (mut player, mut world) = setup();
        let update = GameUpdate::StatsUpdated(vec![StatChange {
            field: "realm".to_string(),
            op: StatOp::Set,
            value: StatValue::Text("Luyện Khí tầng 1".to_string()),
        }]);

        apply_updates(&mut player, &mut world, &[update]);
        assert_eq!(player.realm, "Luyện Khí tầng 1");
        assert_eq!(player.realm_state().major_realm_index, 0);
    }

    #[test]
    fn test_npc_update_unknown_target_is_noop() {
        let (mut player, mut world) = setup();
        let update = GameUpdate::NpcUpdated {
            name: "Vô Danh".to_string(),
            affinity: Some(NumChange {
                op: StatOp::Add,
                value: 10,
            }),
            description: None,
            realm: None,
        };

        let outcome = apply_updates(&mut player, &mut world, &[update]);
        assert!(matches!(outcome.entries[0].status, ApplyStatus::Skipped(_)));
    }

    #[test]
    fn test_npc_affinity_delta() {
        let (mut player, mut world) = setup();
        let mut npc = Npc::new("Tô Vân", "Trưởng lão.");
        npc.affinity = 5;
        world.npcs.push(npc);

        let update = GameUpdate::NpcUpdated {
            name: "Tô Vân".to_string(),
            affinity: Some(NumChange {
                op: StatOp::Add,
                value: 10,
            }),
            description: None,
            realm: None,
        };

        apply_updates(&mut player, &mut world, &[update]);
        assert_eq!(world.find_npc("Tô Vân").unwrap().affinity, 15);
    }

    #[test]
    fn test_quest_objective_matched_by_text_not_index() {
        let (mut player, mut world) = setup();
        world.quests.push(
            Quest::new("Tìm linh thảo", "Hái thuốc.").with_objectives(vec![
                QuestObjective::new("Đến cốc"),
                QuestObjective::new("Hái 3 cây"),
            ]),
        );

        // The model reorders the objectives; text identity must still win.
        let update = GameUpdate::QuestUpdated {
            title: "Tìm linh thảo".to_string(),
            objectives: vec![crate::tags::update::ObjectiveChange {
                text: "Hái 3 cây".to_string(),
                completed: true,
            }],
        };

        apply_updates(&mut player, &mut world, &[update]);
        let quest = world.find_quest("Tìm linh thảo").unwrap();
        assert!(!quest.objectives[0].completed);
        assert!(quest.objectives[1].completed);
    }

    #[test]
    fn test_quest_completed_marks_everything() {
        let (mut player, mut world) = setup();
        world.quests.push(
            Quest::new("Tìm linh thảo", "Hái thuốc.")
                .with_objectives(vec![QuestObjective::new("Đến cốc")]),
        );

        apply_updates(
            &mut player,
            &mut world,
            &[GameUpdate::QuestCompleted {
                title: "Tìm linh thảo".to_string(),
            }],
        );

        let quest = world.find_quest("Tìm linh thảo").unwrap();
        assert_eq!(quest.status, QuestStatus::Completed);
        assert!(!quest.has_incomplete_objectives());
    }
}
