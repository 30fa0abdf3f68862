//! Memory windows for prompt assembly.
//!
//! Every turn the outbound prompt carries four nested views of the story,
//! widest first: retrieved knowledge from the vector store, long-term memory
//! (closed chapter summaries), medium-term memory (the whole current
//! chapter), and short-term memory (the last completed turn). All four are
//! always present, with fixed placeholder text when empty, so the prompt
//! structure never shifts.

use crate::pages::{GameLogEntry, GamePage, LogKind};

const NO_RETRIEVAL: &str = "None.";
const NO_CHAPTERS: &str = "No chapters recorded yet.";
const FIRST_TURN: &str = "This is the first turn of this chapter.";
const NO_PRIOR_TURN: &str = "No prior turn in this chapter.";

/// The four memory windows composing one turn's context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindows {
    /// RAG hits, or "None." when retrieval is empty or disabled.
    pub retrieved: String,

    /// Prior chapter summaries in chronological order.
    pub long_term: String,

    /// The current chapter so far, excluding the in-flight action.
    pub medium_term: String,

    /// From the previous player action to just before the in-flight one.
    pub short_term: String,
}

impl ContextWindows {
    /// Assemble the windows for one turn.
    ///
    /// `current_logs` is the open page's full log. The last player action
    /// entry is the in-flight one; it and anything after it are excluded
    /// from both the medium and short windows. Inputs are never mutated.
    pub fn assemble(
        current_logs: &[GameLogEntry],
        prior_pages: &[GamePage],
        current_page_index: usize,
        retrieved_block: &str,
    ) -> Self {
        let retrieved = if retrieved_block.trim().is_empty() {
            NO_RETRIEVAL.to_string()
        } else {
            retrieved_block.trim().to_string()
        };

        let long_term = if current_page_index == 0 {
            NO_CHAPTERS.to_string()
        } else {
            prior_pages
                .iter()
                .enumerate()
                .map(|(index, page)| format!("Chapter {}: {}", index + 1, page.summary))
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        // Everything before the in-flight action. The last player action is
        // the one being resolved, so it and any trailing entries are cut.
        let settled = match current_logs
            .iter()
            .rposition(|e| e.kind == LogKind::PlayerAction)
        {
            Some(index) => &current_logs[..index],
            None => current_logs,
        };

        let medium_term = match render_entries(settled) {
            Some(text) => text,
            None => FIRST_TURN.to_string(),
        };

        let short_term = match settled
            .iter()
            .rposition(|e| e.kind == LogKind::PlayerAction)
        {
            Some(start) => {
                render_entries(&settled[start..]).unwrap_or_else(|| NO_PRIOR_TURN.to_string())
            }
            None => NO_PRIOR_TURN.to_string(),
        };

        Self {
            retrieved,
            long_term,
            medium_term,
            short_term,
        }
    }

    /// Render the four windows into one labeled prompt section.
    pub fn to_prompt_block(&self) -> String {
        format!(
            "## Retrieved Knowledge\n{}\n\n## Long-Term Memory (Previous Chapters)\n{}\n\n\
             ## Medium-Term Memory (Current Chapter)\n{}\n\n## Short-Term Memory (Last Turn)\n{}",
            self.retrieved, self.long_term, self.medium_term, self.short_term
        )
    }
}

/// Render narratively relevant entries as role-prefixed lines.
fn render_entries(entries: &[GameLogEntry]) -> Option<String> {
    let lines: Vec<String> = entries
        .iter()
        .filter(|e| e.kind.is_narrative())
        .map(|e| format!("{}: {}", e.kind.role_prefix(), e.message))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
