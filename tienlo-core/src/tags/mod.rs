//! The tag micro-language embedded in model narration.
//!
//! The storyteller model interleaves prose with bracketed state tags like
//! `[STATS_UPDATE: hp=-10, turn=+1]`. This module scans the raw response,
//! lifts recognized tags into typed [`GameUpdate`] values, and strips every
//! tag (valid or broken) out of the player-facing narration. A malformed tag
//! never aborts the turn; it is dropped and the rest of the response stands.

pub mod apply;
pub mod scan;
pub mod update;

pub use apply::{apply_updates, AppliedUpdate, ApplyOutcome, ApplyStatus};
pub use scan::{scan, AttrValue, RawTag, ScanResult};
pub use update::{
    GameUpdate, NumChange, ObjectiveChange, StatChange, StatOp, StatValue, TagPayloadError,
};

use tracing::{debug, warn};

/// A model response split into prose and typed updates.
#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    /// Narration with every tag span removed and whitespace tidied.
    pub narration: String,

    /// Typed updates in document order.
    pub updates: Vec<GameUpdate>,

    /// Names of recognized tags whose payloads were unusable.
    pub dropped_tags: Vec<String>,

    /// Count of malformed tag spans the scanner discarded.
    pub malformed_spans: usize,
}

/// Parse a raw model response.
///
/// This never fails: unrecognized tag names are ignored for forward
/// compatibility, and recognized tags with unusable payloads are recorded in
/// `dropped_tags` and skipped.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let scanned = scan(raw);

    let mut updates = Vec::new();
    let mut dropped_tags = Vec::new();

    for tag in &scanned.tags {
        match GameUpdate::from_raw(tag) {
            Ok(Some(update)) => updates.push(update),
            Ok(None) => {
                debug!(tag = %tag.name, "ignoring unrecognized tag");
            }
            Err(err) => {
                warn!(%err, "dropping unusable tag");
                dropped_tags.push(tag.name.clone());
            }
        }
    }

    ParsedResponse {
        narration: scanned.narration,
        updates,
        dropped_tags,
        malformed_spans: scanned.dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_response() {
        let raw = concat!(
            "Bạn vung kiếm chém yêu lang.",
            r#"[STATS_UPDATE: currency=+=50]"#,
            r#"[ITEM_ACQUIRED: name="Yêu Đan", quantity=1]"#,
            "[STATS_UPDATE: turn=+1]",
            " Yêu lang gục xuống."
        );

        let parsed = parse_response(raw);
        assert_eq!(parsed.updates.len(), 3);
        assert_eq!(
            parsed.narration,
            "Bạn vung kiếm chém yêu lang. Yêu lang gục xuống."
        );
        assert!(parsed.dropped_tags.is_empty());
    }

    #[test]
    fn test_malformed_tag_dropped_others_survive() {
        let raw = concat!(
            "Mở rương.",
            r#"[ITEM_ACQUIRED: name="Kiếm"]"#,
            "[ITEM_ACQUIRED: quantity=]",
            "[STATS_UPDATE: turn=+1]",
        );

        let parsed = parse_response(raw);
        assert_eq!(parsed.updates.len(), 2);
        assert_eq!(parsed.narration, "Mở rương.");
    }

    #[test]
    fn test_missing_required_attribute_is_dropped_not_fatal() {
        let parsed = parse_response("Gặp một người.[NPC: description=\"không tên\"]");
        assert!(parsed.updates.is_empty());
        assert_eq!(parsed.dropped_tags, vec!["NPC".to_string()]);
        assert_eq!(parsed.narration, "Gặp một người.");
    }

    #[test]
    fn test_unrecognized_tag_stripped_silently() {
        let parsed = parse_response("Trời tối.[WEATHER_UPDATE: rain=true]");
        assert!(parsed.updates.is_empty());
        assert!(parsed.dropped_tags.is_empty());
        assert_eq!(parsed.narration, "Trời tối.");
    }

    #[test]
    fn test_prose_brackets_preserved() {
        let parsed = parse_response("Hắn thì thầm [nghe không rõ] rồi bỏ đi.");
        assert!(parsed.updates.is_empty());
        assert_eq!(parsed.narration, "Hắn thì thầm [nghe không rõ] rồi bỏ đi.");
    }
}
