//! Turn log pages ("chapters").
//!
//! Play is recorded as an append-only sequence of [`GameLogEntry`] values
//! grouped into [`GamePage`]s. Exactly one page is ever mutable: the page at
//! `current_page_index`, whose summary is still empty. Closing a page writes
//! its summary exactly once and opens a fresh page.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Story,
    Event,
    PlayerAction,
    System,
    Choice,
}

impl LogKind {
    /// Whether the entry carries narrative weight for memory windows.
    ///
    /// Choices are presentation-only and excluded from every window.
    pub fn is_narrative(self) -> bool {
        matches!(
            self,
            LogKind::Story | LogKind::Event | LogKind::PlayerAction | LogKind::System
        )
    }

    /// Role prefix used when rendering an entry into a memory window.
    pub fn role_prefix(self) -> &'static str {
        match self {
            LogKind::Story => "Narrator",
            LogKind::Event => "Event",
            LogKind::PlayerAction => "Player",
            LogKind::System => "System",
            LogKind::Choice => "Choice",
        }
    }
}

/// One entry in a page's turn log. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameLogEntry {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub message: String,
}

impl GameLogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
        }
    }
}

/// One chapter of play: its raw log and, once closed, its summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePage {
    pub logs: Vec<GameLogEntry>,
    /// Empty until the page is closed, then immutable.
    pub summary: String,
}

impl GamePage {
    pub fn is_closed(&self) -> bool {
        !self.summary.is_empty()
    }
}

/// The ordered sequence of pages plus the index of the single open page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLog {
    pub pages: Vec<GamePage>,
    pub current_page_index: usize,
}

impl SessionLog {
    /// Start a session with one empty open page.
    pub fn new() -> Self {
        Self {
            pages: vec![GamePage::default()],
            current_page_index: 0,
        }
    }

    pub fn current_page(&self) -> &GamePage {
        &self.pages[self.current_page_index]
    }

    pub fn current_page_mut(&mut self) -> &mut GamePage {
        let index = self.current_page_index;
        &mut self.pages[index]
    }

    /// Pages before the current one, all closed.
    pub fn prior_pages(&self) -> &[GamePage] {
        &self.pages[..self.current_page_index]
    }

    /// Append an entry to the open page.
    pub fn push(&mut self, kind: LogKind, message: impl Into<String>) {
        self.current_page_mut()
            .logs
            .push(GameLogEntry::new(kind, message));
    }

    /// Number of player actions recorded on the open page.
    pub fn current_page_turns(&self) -> usize {
        self.current_page()
            .logs
            .iter()
            .filter(|e| e.kind == LogKind::PlayerAction)
            .count()
    }

    /// Seal the open page with its summary and open a fresh one.
    ///
    /// A page's summary is written exactly once; sealing an already closed
    /// page is a no-op.
    pub fn close_current_page(&mut self, summary: impl Into<String>) {
        if self.current_page().is_closed() {
            return;
        }
        self.current_page_mut().summary = summary.into();
        self.pages.push(GamePage::default());
        self.current_page_index = self.pages.len() - 1;
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}
