//! Retrieval-augmented memory.
//!
//! The world owns a [`VectorStore`] of entity descriptions. Each turn the
//! player's input is embedded and the most similar descriptions are injected
//! into the prompt. After a turn the store is re-indexed: descriptions are
//! regenerated from current state, only the ones that actually changed are
//! re-embedded (one batch call), and entries for entities that no longer
//! exist are dropped.

pub mod describe;
pub mod store;

pub use store::{cosine_similarity, EntityType, RagError, VectorMetadata, VectorStore};

use crate::player::PlayerState;
use crate::world::WorldState;
use gemini::Gemini;
use std::collections::HashSet;
use tracing::debug;

/// Outcome of a re-index pass.
#[derive(Debug, Clone, Default)]
pub struct ReindexReport {
    /// Entries embedded and upserted.
    pub embedded: usize,

    /// Entries removed because their entity is gone (or no longer
    /// embeddable, like a finished quest).
    pub removed: usize,

    /// Whether the store was rebuilt from scratch after a detected
    /// vectors/metadata misalignment.
    pub rebuilt: bool,
}

/// Render every currently embeddable entity to its canonical description.
///
/// Quests whose objectives are all complete produce empty text and are
/// omitted, which also marks their store entries for removal.
pub fn collect_descriptions(player: &PlayerState, world: &WorldState) -> Vec<VectorMetadata> {
    let mut out = Vec::new();

    for npc in &world.npcs {
        out.push(VectorMetadata {
            entity_id: npc.id.clone(),
            entity_type: EntityType::Character,
            text: describe::describe_npc(npc),
        });
    }
    for beast in &world.beasts {
        out.push(VectorMetadata {
            entity_id: beast.id.clone(),
            entity_type: EntityType::Beast,
            text: describe::describe_beast(beast),
        });
    }
    for location in &world.locations {
        out.push(VectorMetadata {
            entity_id: location.id.clone(),
            entity_type: EntityType::Location,
            text: describe::describe_location(location),
        });
    }
    for faction in &world.factions {
        out.push(VectorMetadata {
            entity_id: faction.id.clone(),
            entity_type: EntityType::Faction,
            text: describe::describe_faction(faction),
        });
    }
    for lore in &world.lore {
        out.push(VectorMetadata {
            entity_id: lore.id.clone(),
            entity_type: EntityType::Lore,
            text: describe::describe_lore(lore),
        });
    }
    for quest in &world.quests {
        let text = describe::describe_quest(quest);
        if !text.is_empty() {
            out.push(VectorMetadata {
                entity_id: quest.id.clone(),
                entity_type: EntityType::Quest,
                text,
            });
        }
    }
    for item in &player.inventory {
        out.push(VectorMetadata {
            entity_id: item.id.clone(),
            entity_type: EntityType::Item,
            text: describe::describe_item(item),
        });
    }
    for skill in &player.skills {
        out.push(VectorMetadata {
            entity_id: skill.id.clone(),
            entity_type: EntityType::Skill,
            text: describe::describe_skill(skill),
        });
    }

    out
}

/// What a re-index pass would do, computed without any network call.
#[derive(Debug, Clone, Default)]
pub struct ReindexPlan {
    /// Descriptions that are new or whose text changed since last embedding.
    pub dirty: Vec<VectorMetadata>,

    /// Store entries whose entity no longer produces a description.
    pub dead: HashSet<String>,
}

/// Diff current descriptions against the store.
pub fn plan_reindex(store: &VectorStore, descriptions: &[VectorMetadata]) -> ReindexPlan {
    let live: HashSet<&str> = descriptions.iter().map(|d| d.entity_id.as_str()).collect();

    let dead: HashSet<String> = store
        .metadata()
        .iter()
        .filter(|m| !live.contains(m.entity_id.as_str()))
        .map(|m| m.entity_id.clone())
        .collect();

    let dirty: Vec<VectorMetadata> = descriptions
        .iter()
        .filter(|d| match store.get(&d.entity_id) {
            Some(existing) => existing.text != d.text,
            None => true,
        })
        .cloned()
        .collect();

    ReindexPlan { dirty, dead }
}

/// Re-index the world's vector store against current state.
///
/// One embedding batch covers every changed description; the batch is
/// all-or-nothing, so a failed call leaves the store untouched and the same
/// entries come back as dirty next time. A misaligned store is rebuilt from
/// scratch instead of crashing.
pub async fn reindex(
    client: &Gemini,
    player: &PlayerState,
    world: &mut WorldState,
) -> Result<ReindexReport, RagError> {
    let mut report = ReindexReport::default();

    if !world.rag_vector_store.is_consistent() {
        world.rag_vector_store.clear();
        report.rebuilt = true;
    }

    let descriptions = collect_descriptions(player, world);
    let plan = plan_reindex(&world.rag_vector_store, &descriptions);

    if plan.dirty.is_empty() && plan.dead.is_empty() {
        return Ok(report);
    }
    debug!(
        dirty = plan.dirty.len(),
        dead = plan.dead.len(),
        "re-indexing vector store"
    );

    if !plan.dirty.is_empty() {
        let texts: Vec<String> = plan.dirty.iter().map(|d| d.text.clone()).collect();
        let vectors = client.embed_batch(&texts).await?;
        report.embedded = plan.dirty.len();
        world
            .rag_vector_store
            .upsert_batch(plan.dirty.into_iter().zip(vectors).collect());
    }

    report.removed = plan.dead.len();
    world.rag_vector_store.remove_ids(&plan.dead);

    Ok(report)
}
