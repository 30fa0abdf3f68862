//! Chapter summary generation support.
//!
//! When a page closes, its narrative lines are condensed into a chapter
//! summary by one model call. This module builds that call's input; the
//! storyteller owns the call itself and the exactly-once sealing.

use crate::pages::{GamePage, LogKind};

/// Placeholder stored when summarization fails; the page still closes and a
/// later [`regenerate_summary`](crate::storyteller::Storyteller::regenerate_summary)
/// call can replace it.
pub const SUMMARY_UNAVAILABLE: &str = "(summary unavailable)";

/// Instruction sent with the page text.
pub const SUMMARY_INSTRUCTION: &str = "Tóm tắt chương truyện sau thành một đoạn văn \
ngắn như lời dẫn của một chương tiểu thuyết tiên hiệp. Chỉ trả về đoạn tóm tắt, \
không thêm lời bình.";

/// Whether a stored summary is the failure placeholder.
pub fn is_placeholder(summary: &str) -> bool {
    summary == SUMMARY_UNAVAILABLE
}

/// Render a page's narrative lines for summarization.
///
/// Story, event, and player action entries are included; system and choice
/// entries are presentation noise and excluded. Returns `None` for a page
/// with nothing worth summarizing.
pub fn page_log_block(page: &GamePage) -> Option<String> {
    let lines: Vec<String> = page
        .logs
        .iter()
        .filter(|e| {
            matches!(
                e.kind,
                LogKind::Story | LogKind::Event | LogKind::PlayerAction
            )
        })
        .map(|e| format!("{}: {}", e.kind.role_prefix(), e.message))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// The full prompt for one page's summary call.
pub fn build_summary_prompt(page: &GamePage) -> Option<String> {
    let block = page_log_block(page)?;
    Some(format!("{SUMMARY_INSTRUCTION}\n\n{block}"))
}
