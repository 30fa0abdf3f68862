//! Turn orchestration.
//!
//! [`Storyteller`] owns the full game state and drives one turn at a time:
//! log the player's action, retrieve related knowledge, assemble the memory
//! windows, make one model call, parse and apply the tag updates, log the
//! cleaned narration, re-index the vector store, and roll the chapter over
//! when it is long enough. Taking `&mut self` guarantees a single
//! outstanding call; there is no cancellation. A failed model call withdraws
//! the action log so the same input can simply be replayed.

use crate::context::ContextWindows;
use crate::pages::{LogKind, SessionLog};
use crate::persist::SaveGame;
use crate::player::PlayerState;
use crate::prompts::{self, DEFAULT_SYSTEM_PROMPT};
use crate::rag::{self, ReindexReport};
use crate::summary::{self, SUMMARY_UNAVAILABLE};
use crate::tags::{self, ApplyOutcome};
use crate::world::WorldState;
use gemini::{Gemini, Message, Request};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StorytellerError {
    #[error("model call failed: {0}")]
    Model(#[from] gemini::Error),

    #[error("page {0} is not a closed page")]
    NoSuchPage(usize),
}

/// Tunables for the storyteller, builder style.
#[derive(Debug, Clone)]
pub struct StorytellerConfig {
    /// Generation model override; the client default when `None`.
    pub model: Option<String>,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
    /// Replaces [`DEFAULT_SYSTEM_PROMPT`] wholesale when set.
    pub system_prompt: Option<String>,
    pub rag_enabled: bool,
    /// Number of retrieved texts injected per turn.
    pub rag_top_k: usize,
    /// Player actions per chapter before the page rolls over.
    pub page_length: usize,
}

impl Default for StorytellerConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 8192,
            temperature: None,
            system_prompt: None,
            rag_enabled: true,
            rag_top_k: 5,
            page_length: 20,
        }
    }
}

impl StorytellerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_rag_enabled(mut self, enabled: bool) -> Self {
        self.rag_enabled = enabled;
        self
    }

    pub fn with_rag_top_k(mut self, top_k: usize) -> Self {
        self.rag_top_k = top_k;
        self
    }

    pub fn with_page_length(mut self, page_length: usize) -> Self {
        self.page_length = page_length;
        self
    }
}

/// Everything one turn produced, kept for the raw-response debug view.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Cleaned narration, every tag span removed.
    pub narration: String,

    /// The model response verbatim, tags included.
    pub raw_response: String,

    /// Per-update apply report.
    pub report: ApplyOutcome,

    /// True when retrieval failed and the turn ran without it.
    pub retrieval_degraded: bool,

    /// Re-index report, `None` when the re-index itself failed.
    pub reindex: Option<ReindexReport>,

    /// True when this turn closed the chapter.
    pub page_closed: bool,
}

/// The game engine: model client plus the complete mutable game state.
pub struct Storyteller {
    client: Gemini,
    config: StorytellerConfig,
    pub player: PlayerState,
    pub world: WorldState,
    pub session: SessionLog,
}

impl Storyteller {
    /// Start a fresh game for the named character.
    pub fn new(client: Gemini, config: StorytellerConfig, player_name: impl Into<String>) -> Self {
        Self {
            client,
            config,
            player: PlayerState::new(player_name),
            world: WorldState::new(),
            session: SessionLog::new(),
        }
    }

    /// Resume from a loaded save.
    pub fn restore(client: Gemini, config: StorytellerConfig, save: SaveGame) -> Self {
        Self {
            client,
            config,
            player: save.player_state,
            world: save.world_state,
            session: save.session_state,
        }
    }

    /// Snapshot the current state into a save envelope.
    pub fn to_save(&self) -> SaveGame {
        SaveGame::new(
            self.player.clone(),
            self.world.clone(),
            self.session.clone(),
        )
    }

    pub fn config(&self) -> &StorytellerConfig {
        &self.config
    }

    /// Run one player turn end to end.
    pub async fn process_turn(&mut self, input: &str) -> Result<TurnOutcome, StorytellerError> {
        self.session.push(LogKind::PlayerAction, input);

        let (retrieved, retrieval_degraded) = self.retrieve(input).await;
        let windows = ContextWindows::assemble(
            &self.session.current_page().logs,
            self.session.prior_pages(),
            self.session.current_page_index,
            &retrieved,
        );
        let prompt = prompts::build_turn_prompt(&self.player, &self.world, &windows, input);

        let raw_response = match self.call_model(prompt).await {
            Ok(text) => text,
            Err(err) => {
                // Withdraw the action log so the turn can be replayed.
                self.session.current_page_mut().logs.pop();
                return Err(err.into());
            }
        };

        let parsed = tags::parse_response(&raw_response);
        let report = tags::apply_updates(&mut self.player, &mut self.world, &parsed.updates);
        if !report.turn_advanced {
            // The protocol requires turn=+1 per turn; tolerate its absence.
            self.player.turn += 1;
        }
        if !parsed.narration.is_empty() {
            self.session.push(LogKind::Story, &parsed.narration);
        }

        let reindex = match rag::reindex(&self.client, &self.player, &mut self.world).await {
            Ok(report) => Some(report),
            Err(err) => {
                warn!(%err, "re-index failed, narration stands");
                None
            }
        };

        let mut page_closed = false;
        if self.session.current_page_turns() >= self.config.page_length {
            self.close_page().await;
            page_closed = true;
        }

        debug!(
            turn = self.player.turn,
            updates = parsed.updates.len(),
            dropped = parsed.dropped_tags.len(),
            page_closed,
            "turn complete"
        );

        Ok(TurnOutcome {
            narration: parsed.narration,
            raw_response,
            report,
            retrieval_degraded,
            reindex,
            page_closed,
        })
    }

    /// Seal the open chapter with a model-written summary and open the next.
    ///
    /// Summarization failure never blocks play: the page closes with a
    /// placeholder and [`regenerate_summary`](Self::regenerate_summary) can
    /// fill it in later.
    pub async fn close_page(&mut self) {
        let summary = match summary::build_summary_prompt(self.session.current_page()) {
            Some(prompt) => match self.call_summary(prompt).await {
                Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
                Ok(_) => SUMMARY_UNAVAILABLE.to_string(),
                Err(err) => {
                    warn!(%err, "chapter summary failed, closing with placeholder");
                    SUMMARY_UNAVAILABLE.to_string()
                }
            },
            None => SUMMARY_UNAVAILABLE.to_string(),
        };
        self.session.close_current_page(summary);
    }

    /// Rewrite the summary of an already closed page.
    pub async fn regenerate_summary(&mut self, page_index: usize) -> Result<(), StorytellerError> {
        if page_index >= self.session.current_page_index {
            return Err(StorytellerError::NoSuchPage(page_index));
        }
        let Some(prompt) = summary::build_summary_prompt(&self.session.pages[page_index]) else {
            return Ok(());
        };

        let text = self.call_summary(prompt).await?;
        let text = text.trim();
        if !text.is_empty() {
            self.session.pages[page_index].summary = text.to_string();
        }
        Ok(())
    }

    /// Embed the input and search the store. Failure degrades to no
    /// retrieval instead of blocking the turn.
    async fn retrieve(&self, input: &str) -> (String, bool) {
        if !self.config.rag_enabled || self.world.rag_vector_store.is_empty() {
            return (String::new(), false);
        }

        match self.client.embed_batch(&[input.to_string()]).await {
            Ok(vectors) => {
                let hits = match vectors.first() {
                    Some(query) => self
                        .world
                        .rag_vector_store
                        .search(query, self.config.rag_top_k),
                    None => Vec::new(),
                };
                (hits.join("\n\n"), false)
            }
            Err(err) => {
                warn!(%err, "retrieval failed, continuing without it");
                (String::new(), true)
            }
        }
    }

    async fn call_model(&self, prompt: String) -> Result<String, gemini::Error> {
        let system = self
            .config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        let mut request = Request::new(vec![Message::user(prompt)])
            .with_system(system)
            .with_max_tokens(self.config.max_tokens);
        if let Some(model) = &self.config.model {
            request = request.with_model(model.clone());
        }
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }

        Ok(self.client.generate(request).await?.text)
    }

    async fn call_summary(&self, prompt: String) -> Result<String, gemini::Error> {
        let mut request = Request::new(vec![Message::user(prompt)]).with_max_tokens(1024);
        if let Some(model) = &self.config.model {
            request = request.with_model(model.clone());
        }
        Ok(self.client.generate(request).await?.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = StorytellerConfig::new()
            .with_model("gemini-2.5-pro")
            .with_max_tokens(2048)
            .with_temperature(0.9)
            .with_rag_enabled(false)
            .with_rag_top_k(3)
            .with_page_length(10);

        assert_eq!(config.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.temperature, Some(0.9));
        assert!(!config.rag_enabled);
        assert_eq!(config.rag_top_k, 3);
        assert_eq!(config.page_length, 10);
    }

    #[test]
    fn test_new_game_state() {
        let teller = Storyteller::new(
            Gemini::new("test-key"),
            StorytellerConfig::default(),
            "Lâm Phong",
        );
        assert_eq!(teller.player.name, "Lâm Phong");
        assert_eq!(teller.player.turn, 0);
        assert!(teller.world.npcs.is_empty());
        assert_eq!(teller.session.pages.len(), 1);
    }

    #[test]
    fn test_save_restore_round_trip() {
        let mut teller = Storyteller::new(
            Gemini::new("test-key"),
            StorytellerConfig::default(),
            "Lâm Phong",
        );
        teller.player.currency = 42;
        teller.session.push(LogKind::Story, "Mở đầu.");

        let save = teller.to_save();
        let restored =
            Storyteller::restore(Gemini::new("test-key"), StorytellerConfig::default(), save);

        assert_eq!(restored.player.currency, 42);
        assert_eq!(restored.session.current_page().logs.len(), 1);
    }

    #[tokio::test]
    async fn test_regenerate_summary_rejects_open_page() {
        let mut teller = Storyteller::new(
            Gemini::new("test-key"),
            StorytellerConfig::default(),
            "Lâm Phong",
        );

        match teller.regenerate_summary(0).await {
            Err(StorytellerError::NoSuchPage(0)) => {}
            other => panic!("expected NoSuchPage, got {other:?}"),
        }
    }
}
