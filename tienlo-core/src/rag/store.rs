//! In-memory vector store with brute-force cosine search.
//!
//! Vectors and metadata live in two parallel, index-aligned arrays. Entity
//! counts per story stay in the tens to low hundreds, so a linear scan per
//! query is fine; [`VectorStore::search`] is the only retrieval entry point,
//! which leaves room to swap in an approximate index later without touching
//! callers.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

/// Errors from vector operations.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("vector length mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("embedding call failed: {0}")]
    Embedding(#[from] gemini::Error),
}

/// The kind of entity a stored vector describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Character,
    Item,
    Skill,
    Location,
    Faction,
    Lore,
    Beast,
    Quest,
}

/// Metadata stored alongside each vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorMetadata {
    /// Stable id of the entity this vector describes.
    pub entity_id: String,

    pub entity_type: EntityType,

    /// The canonical text that was embedded; returned verbatim by search.
    pub text: String,
}

/// Append/overwrite collection of (vector, metadata) pairs keyed by entity id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorStore {
    vectors: Vec<Vec<f32>>,
    metadata: Vec<VectorMetadata>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// The parallel arrays must stay index-aligned; this probe is used by the
    /// re-index path to decide whether to rebuild from scratch.
    pub fn is_consistent(&self) -> bool {
        self.vectors.len() == self.metadata.len()
    }

    pub fn metadata(&self) -> &[VectorMetadata] {
        &self.metadata
    }

    /// Whether an entry exists for the given entity id.
    pub fn contains(&self, entity_id: &str) -> bool {
        self.get(entity_id).is_some()
    }

    /// Metadata for the given entity id, if stored.
    pub fn get(&self, entity_id: &str) -> Option<&VectorMetadata> {
        self.metadata.iter().find(|m| m.entity_id == entity_id)
    }

    /// Insert or overwrite the entry for `metadata.entity_id`.
    pub fn upsert(&mut self, metadata: VectorMetadata, vector: Vec<f32>) {
        match self
            .metadata
            .iter()
            .position(|m| m.entity_id == metadata.entity_id)
        {
            Some(index) => {
                self.vectors[index] = vector;
                self.metadata[index] = metadata;
            }
            None => {
                self.vectors.push(vector);
                self.metadata.push(metadata);
            }
        }
    }

    /// Upsert a whole batch, deduplicating by entity id across the batch.
    pub fn upsert_batch(&mut self, entries: Vec<(VectorMetadata, Vec<f32>)>) {
        for (metadata, vector) in entries {
            self.upsert(metadata, vector);
        }
    }

    /// Remove every entry whose entity id is in `ids`, compacting both
    /// arrays in lockstep.
    pub fn remove_ids(&mut self, ids: &HashSet<String>) {
        if ids.is_empty() {
            return;
        }
        let mut vectors = Vec::with_capacity(self.vectors.len());
        let mut metadata = Vec::with_capacity(self.metadata.len());
        for (vector, meta) in self.vectors.drain(..).zip(self.metadata.drain(..)) {
            if !ids.contains(&meta.entity_id) {
                vectors.push(vector);
                metadata.push(meta);
            }
        }
        self.vectors = vectors;
        self.metadata = metadata;
    }

    /// Drop everything. Used when rebuilding after a detected inconsistency.
    pub fn clear(&mut self) {
        self.vectors.clear();
        self.metadata.clear();
    }

    /// Return the texts of the `top_k` entries most similar to `query`,
    /// best first. Ties keep store order. Entries whose dimension does not
    /// match the query are skipped rather than failing the whole search.
    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<String> {
        if top_k == 0 || self.is_empty() {
            return Vec::new();
        }

        // Zipping bounds the scan to aligned pairs, so a misaligned store
        // degrades to partial results instead of indexing out of bounds.
        let mut scored: Vec<(usize, f32)> = Vec::with_capacity(self.len());
        for (index, (vector, meta)) in self.vectors.iter().zip(self.metadata.iter()).enumerate() {
            match cosine_similarity(query, vector) {
                Ok(score) => scored.push((index, score)),
                Err(_) => {
                    warn!(
                        entity_id = %meta.entity_id,
                        "skipping stale vector with mismatched dimension"
                    );
                }
            }
        }

        // Stable sort keeps store order on equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(top_k)
            .map(|(index, _)| self.metadata[index].text.clone())
            .collect()
    }
}

/// Cosine similarity of two vectors, in [-1, 1].
///
/// Errors on length mismatch. A zero-magnitude vector yields `0.0` ("no
/// similarity") rather than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, RagError> {
    if a.len() != b.len() {
        return Err(RagError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str, text: &str) -> VectorMetadata {
        VectorMetadata {
            entity_id: id.to_string(),
            entity_type: EntityType::Item,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        let neg: Vec<f32> = v.iter().map(|x| -x).collect();
        let sim = cosine_similarity(&v, &neg).unwrap();
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let zero = vec![0.0, 0.0, 0.0];
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&zero, &v).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_length_mismatch() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        assert!(cosine_similarity(&a, &b).is_err());
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let mut store = VectorStore::new();
        store.upsert(meta("a", "xa"), vec![0.0, 1.0]);
        store.upsert(meta("b", "gần"), vec![1.0, 0.1]);
        store.upsert(meta("c", "trung bình"), vec![1.0, 1.0]);

        let results = store.search(&[1.0, 0.0], 3);
        assert_eq!(results, vec!["gần", "trung bình", "xa"]);
    }

    #[test]
    fn test_search_empty_and_zero_k() {
        let store = VectorStore::new();
        assert!(store.search(&[1.0], 5).is_empty());

        let mut store = VectorStore::new();
        store.upsert(meta("a", "x"), vec![1.0]);
        assert!(store.search(&[1.0], 0).is_empty());
    }

    #[test]
    fn test_search_top_k_larger_than_store() {
        let mut store = VectorStore::new();
        store.upsert(meta("a", "một"), vec![1.0, 0.0]);
        store.upsert(meta("b", "hai"), vec![0.0, 1.0]);

        let results = store.search(&[1.0, 0.0], 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], "một");
    }

    #[test]
    fn test_search_ties_keep_store_order() {
        let mut store = VectorStore::new();
        store.upsert(meta("a", "trước"), vec![1.0, 0.0]);
        store.upsert(meta("b", "sau"), vec![1.0, 0.0]);

        let results = store.search(&[1.0, 0.0], 2);
        assert_eq!(results, vec!["trước", "sau"]);
    }

    #[test]
    fn test_upsert_overwrites_by_entity_id() {
        let mut store = VectorStore::new();
        store.upsert(meta("a", "cũ"), vec![1.0, 0.0]);
        store.upsert(meta("a", "mới"), vec![0.0, 1.0]);

        assert_eq!(store.len(), 1);
        assert!(store.is_consistent());
        assert_eq!(store.search(&[0.0, 1.0], 1), vec!["mới"]);
    }

    #[test]
    fn test_upsert_batch_dedups_within_batch() {
        let mut store = VectorStore::new();
        store.upsert_batch(vec![
            (meta("a", "một"), vec![1.0]),
            (meta("b", "hai"), vec![2.0]),
            (meta("a", "một sửa"), vec![3.0]),
        ]);

        assert_eq!(store.len(), 2);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_remove_ids_keeps_alignment() {
        let mut store = VectorStore::new();
        store.upsert(meta("a", "một"), vec![1.0, 0.0]);
        store.upsert(meta("b", "hai"), vec![0.0, 1.0]);
        store.upsert(meta("c", "ba"), vec![1.0, 1.0]);

        let mut dead = HashSet::new();
        dead.insert("b".to_string());
        store.remove_ids(&dead);

        assert_eq!(store.len(), 2);
        assert!(store.is_consistent());
        assert!(!store.contains("b"));
        assert!(store.contains("a"));
        assert!(store.contains("c"));
    }

    #[test]
    fn test_search_survives_misaligned_store() {
        // A corrupted save can deserialize with the parallel arrays out of
        // step; search must degrade, the re-index path rebuilds later.
        let json = r#"{
            "vectors": [[1.0, 0.0], [0.0, 1.0]],
            "metadata": [{"entityId": "a", "entityType": "item", "text": "một"}]
        }"#;
        let store: VectorStore = serde_json::from_str(json).unwrap();
        assert!(!store.is_consistent());

        let results = store.search(&[1.0, 0.0], 5);
        assert_eq!(results, vec!["một"]);
    }

    #[test]
    fn test_search_skips_mismatched_dimension() {
        let mut store = VectorStore::new();
        store.upsert(meta("a", "tốt"), vec![1.0, 0.0]);
        store.upsert(meta("b", "hỏng"), vec![1.0, 0.0, 0.0]);

        let results = store.search(&[1.0, 0.0], 5);
        assert_eq!(results, vec!["tốt"]);
    }
}
