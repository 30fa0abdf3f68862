//! Tiên Lộ Ký game engine.
//!
//! This crate provides:
//! - A cultivation-world data model driven by an LLM storyteller
//! - A tag micro-language parser turning model output into typed updates
//! - Retrieval-augmented memory over entity descriptions (vector store)
//! - Layered context windows for prompt assembly
//! - Versioned save game persistence
//!
//! # Quick Start
//!
//! ```ignore
//! use tienlo_core::{Storyteller, StorytellerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = gemini::Gemini::from_env()?;
//!     let config = StorytellerConfig::new().with_page_length(15);
//!
//!     let mut game = Storyteller::new(client, config, "Lâm Phong");
//!
//!     let outcome = game.process_turn("Ta nhìn quanh thôn nhỏ").await?;
//!     println!("{}", outcome.narration);
//!
//!     tienlo_core::persist::save("save.json", &game.to_save()).await?;
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod pages;
pub mod persist;
pub mod player;
pub mod prompts;
pub mod rag;
pub mod storyteller;
pub mod summary;
pub mod tags;
pub mod testing;
pub mod world;

// Primary public API
pub use context::ContextWindows;
pub use pages::{GameLogEntry, GamePage, LogKind, SessionLog};
pub use persist::{PersistError, SaveGame};
pub use player::{PlayerState, RealmState, MAJOR_REALMS, MORTAL_REALM};
pub use rag::{RagError, VectorMetadata, VectorStore};
pub use storyteller::{Storyteller, StorytellerConfig, StorytellerError, TurnOutcome};
pub use tags::{parse_response, GameUpdate, ParsedResponse};
pub use testing::{MockStoryteller, TestHarness};
pub use world::WorldState;
