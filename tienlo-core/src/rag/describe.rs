//! Canonical entity descriptions for embedding.
//!
//! One pure function per entity kind, each rendering every salient field
//! into a single Vietnamese paragraph. The same text is embedded and later
//! injected verbatim as retrieved context, so it has to read as prose, not
//! as a field dump. Missing optional fields render as "không rõ" instead of
//! being dropped or erroring.

use crate::world::{Beast, Faction, Item, Location, Lore, Npc, Quest, Skill};

const UNKNOWN: &str = "không rõ";

fn or_unknown(field: &Option<String>) -> &str {
    field.as_deref().filter(|s| !s.is_empty()).unwrap_or(UNKNOWN)
}

/// Render a JSON bonus map as readable clauses, e.g. "atk +10, hp +50".
fn bonus_clauses(bonuses: &Option<serde_json::Value>) -> Option<String> {
    let map = bonuses.as_ref()?.as_object()?;
    if map.is_empty() {
        return None;
    }
    let clauses: Vec<String> = map
        .iter()
        .map(|(key, value)| match value {
            serde_json::Value::Number(n) => format!("{key} +{n}"),
            other => format!("{key} {}", other.to_string().trim_matches('"')),
        })
        .collect();
    Some(clauses.join(", "))
}

/// Describe an NPC for embedding.
pub fn describe_npc(npc: &Npc) -> String {
    format!(
        "Nhân vật {name}, giới tính {gender}, cảnh giới {realm}, thuộc thế lực {faction}. \
         Thiện cảm với người chơi: {affinity}. {description}",
        name = npc.name,
        gender = or_unknown(&npc.gender),
        realm = or_unknown(&npc.realm),
        faction = or_unknown(&npc.faction),
        affinity = npc.affinity,
        description = npc.description,
    )
}

/// Describe a demonic beast for embedding.
pub fn describe_beast(beast: &Beast) -> String {
    let temper = if beast.is_hostile {
        "hung dữ"
    } else {
        "ôn hòa"
    };
    format!(
        "Yêu thú {name}, chủng loại {species}, cảnh giới {realm}, tính tình {temper}. {description}",
        name = beast.name,
        species = or_unknown(&beast.species),
        realm = or_unknown(&beast.realm),
        description = beast.description,
    )
}

/// Describe a location for embedding.
pub fn describe_location(location: &Location) -> String {
    let safety = if location.is_safe_zone {
        "khu vực an toàn"
    } else {
        "khu vực nguy hiểm"
    };
    format!(
        "Địa điểm {name}, thuộc vùng {region}, {safety}. {description}",
        name = location.name,
        region = or_unknown(&location.region),
        description = location.description,
    )
}

/// Describe a faction for embedding.
pub fn describe_faction(faction: &Faction) -> String {
    format!(
        "Thế lực {name}, lập trường {alignment}, danh vọng của người chơi: {reputation}. {description}",
        name = faction.name,
        alignment = or_unknown(&faction.alignment),
        reputation = faction.reputation,
        description = faction.description,
    )
}

/// Describe a lore entry for embedding.
pub fn describe_lore(lore: &Lore) -> String {
    format!("Tri thức thế giới: {}. {}", lore.title, lore.content)
}

/// Describe an inventory item for embedding.
pub fn describe_item(item: &Item) -> String {
    let mut text = format!(
        "Vật phẩm {name}, loại {category}, phẩm chất {rarity}, số lượng {quantity}. {description}",
        name = item.name,
        category = or_unknown(&item.category),
        rarity = or_unknown(&item.rarity),
        quantity = item.quantity,
        description = item.description,
    );
    if let Some(clauses) = bonus_clauses(&item.bonuses) {
        text.push_str(&format!(" Hiệu quả: {clauses}."));
    }
    text
}

/// Describe a learned skill for embedding.
pub fn describe_skill(skill: &Skill) -> String {
    let mut text = format!(
        "Công pháp {name}, loại {skill_type}, mức độ thuần thục {mastery}. {description}",
        name = skill.name,
        skill_type = or_unknown(&skill.skill_type),
        mastery = or_unknown(&skill.mastery),
        description = skill.description,
    );
    if let Some(clauses) = bonus_clauses(&skill.bonuses) {
        text.push_str(&format!(" Hiệu quả: {clauses}."));
    }
    text
}

/// Describe a quest for embedding.
///
/// Returns an empty string when every objective is complete; a finished
/// quest is useless retrieval context, and callers must skip upserting on
/// empty output.
pub fn describe_quest(quest: &Quest) -> String {
    if !quest.has_incomplete_objectives() {
        return String::new();
    }

    let remaining: Vec<&str> = quest
        .objectives
        .iter()
        .filter(|o| !o.completed)
        .map(|o| o.text.as_str())
        .collect();

    format!(
        "Nhiệm vụ {title}: {description} Mục tiêu còn lại: {objectives}.",
        title = quest.title,
        description = quest.description,
        objectives = remaining.join("; "),
    )
}
