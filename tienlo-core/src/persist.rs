//! Save game persistence.
//!
//! Saves are a single versioned JSON envelope written atomically enough for
//! a desktop game: serialize, then one `tokio::fs::write`. The envelope
//! shape is camelCase on the wire and round-trips losslessly, vector store
//! and turn log pages included.

use crate::pages::SessionLog;
use crate::player::PlayerState;
use crate::world::WorldState;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current save format version.
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("save version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
}

/// The complete save envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveGame {
    pub version: u32,
    pub player_state: PlayerState,
    pub world_state: WorldState,
    pub session_state: SessionLog,
}

impl SaveGame {
    pub fn new(player: PlayerState, world: WorldState, session: SessionLog) -> Self {
        Self {
            version: SAVE_VERSION,
            player_state: player,
            world_state: world,
            session_state: session,
        }
    }
}

/// Just enough of a save to describe it in a load menu, read without
/// deserializing the world.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMetadata {
    pub version: u32,
    pub player_state: PlayerPeek,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPeek {
    pub name: String,
    pub turn: u64,
    pub realm: String,
}

/// Write a save to disk as pretty-printed JSON.
pub async fn save(path: impl AsRef<Path>, save: &SaveGame) -> Result<(), PersistError> {
    let json = serde_json::to_string_pretty(save)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// Load and verify a save.
pub async fn load(path: impl AsRef<Path>) -> Result<SaveGame, PersistError> {
    let json = tokio::fs::read_to_string(path).await?;
    let save: SaveGame = serde_json::from_str(&json)?;
    if save.version != SAVE_VERSION {
        return Err(PersistError::VersionMismatch {
            found: save.version,
            expected: SAVE_VERSION,
        });
    }
    Ok(save)
}

/// Read only the identifying fields of a save. Unknown and missing trailing
/// fields are ignored, so this works across versions.
pub async fn peek_metadata(path: impl AsRef<Path>) -> Result<SaveMetadata, PersistError> {
    let json = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&json)?)
}

/// Conventional autosave location for a character inside `dir`.
pub fn autosave_path(dir: impl AsRef<Path>, player_name: &str) -> PathBuf {
    let slug: String = player_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .to_lowercase();
    dir.as_ref().join(format!("{slug}-autosave.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::LogKind;
    use crate::rag::{EntityType, VectorMetadata};
    use crate::world::Npc;

    fn sample_save() -> SaveGame {
        let mut player = PlayerState::new("Lâm Phong");
        player.turn = 12;
        player.realm = "Luyện Khí tầng 3".to_string();

        let mut world = WorldState::new();
        world.npcs.push(Npc::new("Tô Vân", "Trưởng lão."));
        world.rag_vector_store.upsert(
            VectorMetadata {
                entity_id: world.npcs[0].id.clone(),
                entity_type: EntityType::Character,
                text: "Tô Vân là trưởng lão.".to_string(),
            },
            vec![0.1, 0.2, 0.3],
        );

        let mut session = SessionLog::new();
        session.push(LogKind::PlayerAction, "nhìn quanh");
        session.push(LogKind::Story, "Bạn thấy rừng trúc.");
        session.close_current_page("Chương một.");

        SaveGame::new(player, world, session)
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");

        let original = sample_save();
        save(&path, &original).await.unwrap();
        let loaded = load(&path).await.unwrap();

        assert_eq!(loaded.version, SAVE_VERSION);
        assert_eq!(loaded.player_state.turn, 12);
        assert_eq!(loaded.world_state.npcs[0].name, "Tô Vân");
        assert_eq!(loaded.world_state.rag_vector_store.len(), 1);
        assert_eq!(loaded.session_state.pages.len(), 2);
        assert_eq!(loaded.session_state.pages[0].summary, "Chương một.");
    }

    #[tokio::test]
    async fn test_wire_shape_is_camel_case() {
        let json = serde_json::to_value(sample_save()).unwrap();
        assert!(json.get("playerState").is_some());
        assert!(json.get("worldState").is_some());
        assert!(json.get("sessionState").is_some());
        assert!(json["worldState"].get("ragVectorStore").is_some());
        assert!(json["sessionState"].get("currentPageIndex").is_some());
        assert_eq!(json["playerState"]["maxHp"], 100);
    }

    #[tokio::test]
    async fn test_version_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");

        let mut bad = sample_save();
        bad.version = 999;
        let json = serde_json::to_string(&bad).unwrap();
        tokio::fs::write(&path, json).await.unwrap();

        match load(&path).await {
            Err(PersistError::VersionMismatch { found, .. }) => assert_eq!(found, 999),
            other => panic!("expected version mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_peek_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        save(&path, &sample_save()).await.unwrap();

        let meta = peek_metadata(&path).await.unwrap();
        assert_eq!(meta.player_state.name, "Lâm Phong");
        assert_eq!(meta.player_state.turn, 12);
        assert_eq!(meta.player_state.realm, "Luyện Khí tầng 3");
    }

    #[test]
    fn test_autosave_path_slug() {
        let path = autosave_path("/saves", "Lâm Phong");
        assert_eq!(path.to_str().unwrap(), "/saves/lâm-phong-autosave.json");
    }
}
