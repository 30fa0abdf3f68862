//! Testing utilities.
//!
//! This module provides tools for integration testing:
//! - `MockStoryteller` for deterministic testing without API calls
//! - `TestHarness` for scripted game scenarios
//! - Assertion helpers for verifying game state
//!
//! Scripted responses are raw model output, tags included, and run through
//! the real scanner, constructors, and reducer, so a harness test exercises
//! the same pipeline as a live turn minus the network.

use crate::pages::{LogKind, SessionLog};
use crate::player::PlayerState;
use crate::tags::{self, ApplyOutcome};
use crate::world::WorldState;

/// A storyteller that returns scripted raw responses in order.
pub struct MockStoryteller {
    responses: Vec<String>,
    response_index: usize,
}

/// What one mock turn produced.
#[derive(Debug, Clone)]
pub struct MockTurn {
    pub narration: String,
    pub raw_response: String,
    pub report: ApplyOutcome,
}

impl MockStoryteller {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            response_index: 0,
        }
    }

    /// Add a raw response to the script.
    pub fn queue_response(&mut self, raw: impl Into<String>) {
        self.responses.push(raw.into());
    }

    /// Replay the script from the beginning.
    pub fn reset(&mut self) {
        self.response_index = 0;
    }

    /// Run one turn against the next scripted response.
    ///
    /// Mirrors the live turn flow: log the action, parse the raw response
    /// through the real tag pipeline, apply updates in order, apply the
    /// implicit turn increment, log the cleaned narration.
    pub fn process_turn(
        &mut self,
        input: &str,
        player: &mut PlayerState,
        world: &mut WorldState,
        session: &mut SessionLog,
    ) -> MockTurn {
        session.push(LogKind::PlayerAction, input);

        let raw_response = if self.response_index < self.responses.len() {
            let raw = self.responses[self.response_index].clone();
            self.response_index += 1;
            raw
        } else {
            "Người kể chuyện im lặng.[STATS_UPDATE: turn=+1]".to_string()
        };

        let parsed = tags::parse_response(&raw_response);
        let report = tags::apply_updates(player, world, &parsed.updates);
        if !report.turn_advanced {
            player.turn += 1;
        }
        if !parsed.narration.is_empty() {
            session.push(LogKind::Story, &parsed.narration);
        }

        MockTurn {
            narration: parsed.narration,
            raw_response,
            report,
        }
    }
}

/// Test harness for running scripted scenarios.
pub struct TestHarness {
    pub teller: MockStoryteller,
    pub player: PlayerState,
    pub world: WorldState,
    pub session: SessionLog,
}

impl TestHarness {
    /// Fresh mortal character, empty world, empty script.
    pub fn new() -> Self {
        Self {
            teller: MockStoryteller::new(Vec::new()),
            player: PlayerState::new("Lâm Phong"),
            world: WorldState::new(),
            session: SessionLog::new(),
        }
    }

    /// Queue one raw response.
    pub fn expect_response(&mut self, raw: impl Into<String>) -> &mut Self {
        self.teller.queue_response(raw);
        self
    }

    /// Send player input and run the next scripted turn.
    pub fn input(&mut self, text: &str) -> MockTurn {
        self.teller
            .process_turn(text, &mut self.player, &mut self.world, &mut self.session)
    }

    pub fn has_npc(&self, name: &str) -> bool {
        self.world.find_npc(name).is_some()
    }

    pub fn has_item(&self, name: &str) -> bool {
        self.player.find_item(name).is_some()
    }

    /// The last story entry on the open page.
    pub fn last_story(&self) -> Option<&str> {
        self.session
            .current_page()
            .logs
            .iter()
            .rev()
            .find(|e| e.kind == LogKind::Story)
            .map(|e| e.message.as_str())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the player carries an item with the given name.
#[track_caller]
pub fn assert_has_item(harness: &TestHarness, name: &str) {
    assert!(
        harness.has_item(name),
        "Expected item '{name}' in inventory"
    );
}

/// Assert the world knows an NPC with the given name.
#[track_caller]
pub fn assert_has_npc(harness: &TestHarness, name: &str) {
    assert!(harness.has_npc(name), "Expected NPC '{name}' to exist");
}

/// Assert the world does NOT know an NPC with the given name.
#[track_caller]
pub fn assert_no_npc(harness: &TestHarness, name: &str) {
    assert!(!harness.has_npc(name), "Expected NPC '{name}' to NOT exist");
}

/// Assert the player's turn counter.
#[track_caller]
pub fn assert_turn(harness: &TestHarness, turn: u64) {
    assert_eq!(
        harness.player.turn, turn,
        "Expected turn {turn}, got {}",
        harness.player.turn
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_basic_narration() {
        let mut harness = TestHarness::new();
        harness.expect_response("Bạn đứng giữa rừng trúc.[STATS_UPDATE: turn=+1]");

        let turn = harness.input("nhìn quanh");
        assert_eq!(turn.narration, "Bạn đứng giữa rừng trúc.");
        assert_eq!(harness.last_story(), Some("Bạn đứng giữa rừng trúc."));
        assert_turn(&harness, 1);
    }

    #[test]
    fn test_mock_implicit_turn_increment() {
        let mut harness = TestHarness::new();
        harness.expect_response("Không có gì xảy ra.");

        harness.input("chờ");
        assert_turn(&harness, 1);
    }

    #[test]
    fn test_mock_applies_tags() {
        let mut harness = TestHarness::new();
        harness.expect_response(concat!(
            "Một trưởng lão xuất hiện.",
            r#"[NPC: name="Tô Vân", description="Trưởng lão Thanh Vân Môn", affinity=10]"#,
            "[STATS_UPDATE: turn=+1]"
        ));

        harness.input("gõ cửa sơn môn");
        assert_has_npc(&harness, "Tô Vân");
        assert_eq!(harness.world.find_npc("Tô Vân").unwrap().affinity, 10);
    }

    #[test]
    fn test_mock_exhausted_script_default() {
        let mut harness = TestHarness::new();
        let turn = harness.input("nói gì đó");
        assert!(turn.narration.contains("im lặng"));
        assert_turn(&harness, 1);
    }

    #[test]
    fn test_mock_multiple_responses_in_order() {
        let mut harness = TestHarness::new();
        harness
            .expect_response("Một.[STATS_UPDATE: turn=+1]")
            .expect_response("Hai.[STATS_UPDATE: turn=+1]");

        assert_eq!(harness.input("a").narration, "Một.");
        assert_eq!(harness.input("b").narration, "Hai.");
        assert_turn(&harness, 2);
    }
}
