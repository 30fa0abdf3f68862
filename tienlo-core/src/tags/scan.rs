//! Single-pass scanner for the bracketed tag micro-language.
//!
//! The model's response interleaves prose with tags of the form
//! `[TAG_NAME: key="value", key2=123, key3=true]`. Tags never nest.
//! Attribute values are either double-quoted strings (backslash-escaped
//! quotes tolerated) or bare literals taken verbatim up to the next comma
//! or closing bracket; interpretation of bare text is left to the typed
//! constructors.
//!
//! Malformed tags are recovered from by skipping to the closing `]`
//! (quote-aware) and dropping the span from the narration; one bad tag
//! never aborts the rest of the response. Bracketed text that does not look
//! like a tag at all (no uppercase name) is kept as prose.

use tracing::warn;

/// A tokenized tag occurrence, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTag {
    pub name: String,
    pub attrs: Vec<(String, AttrValue)>,
}

impl RawTag {
    /// First value for the given attribute key.
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// String content of the given attribute, if present.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).map(|v| v.as_str())
    }
}

/// An attribute value as scanned, before typed interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A double-quoted string, unescaped.
    Quoted(String),

    /// A bare literal, verbatim (may be a number, bool, or operator-prefixed
    /// value like `+10` or `+=50`).
    Bare(String),
}

impl AttrValue {
    pub fn as_str(&self) -> &str {
        match self {
            AttrValue::Quoted(s) | AttrValue::Bare(s) => s,
        }
    }

    /// Permissive integer read: accepts signed values and decimals
    /// (truncated), quoted or bare.
    pub fn as_i64(&self) -> Option<i64> {
        let s = self.as_str().trim();
        if let Ok(n) = s.parse::<i64>() {
            return Some(n);
        }
        s.parse::<f64>().ok().map(|f| f as i64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.as_str().trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

/// Result of scanning one response.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// The prose with every tag span removed.
    pub narration: String,

    /// Successfully tokenized tags, in document order.
    pub tags: Vec<RawTag>,

    /// Count of malformed tag spans that were dropped.
    pub dropped: usize,
}

/// Scan a raw model response into prose and tags.
pub fn scan(text: &str) -> ScanResult {
    let mut narration = String::new();
    let mut tags = Vec::new();
    let mut dropped = 0usize;

    let mut rest = text;
    while let Some(pos) = rest.find('[') {
        narration.push_str(&rest[..pos]);
        let candidate = &rest[pos..];

        match parse_tag(candidate) {
            TagParse::Tag { tag, consumed } => {
                tags.push(tag);
                rest = splice(&narration, &candidate[consumed..]);
            }
            TagParse::Malformed { consumed } => {
                let span: String = candidate[..consumed].chars().take(80).collect();
                warn!(%span, "dropping malformed tag");
                dropped += 1;
                rest = splice(&narration, &candidate[consumed..]);
            }
            TagParse::NotATag => {
                narration.push('[');
                rest = &candidate[1..];
            }
        }
    }
    narration.push_str(rest);

    ScanResult {
        narration: narration.trim().to_string(),
        tags,
        dropped,
    }
}

/// Close the gap a removed tag span leaves behind: when the prose already
/// ends in whitespace, leading spaces of the continuation are dropped.
/// Whitespace elsewhere in the prose is never touched.
fn splice<'a>(narration: &str, rest: &'a str) -> &'a str {
    if narration.ends_with(char::is_whitespace) {
        rest.trim_start_matches(|c: char| c == ' ' || c == '\t')
    } else {
        rest
    }
}

enum TagParse {
    Tag { tag: RawTag, consumed: usize },
    Malformed { consumed: usize },
    NotATag,
}

/// Attempt to parse a tag at the start of `s` (which begins with `[`).
fn parse_tag(s: &str) -> TagParse {
    debug_assert!(s.starts_with('['));

    // Tag name: uppercase ASCII, digits, underscores.
    let after_open = &s[1..];
    let name_len = after_open
        .find(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'))
        .unwrap_or(after_open.len());
    let name = &after_open[..name_len];
    if name.len() < 2 || !name.starts_with(|c: char| c.is_ascii_uppercase()) {
        return TagParse::NotATag;
    }

    // Position within `s` just past the name.
    let mut pos = 1 + name_len;
    pos += count_leading_ws(&s[pos..]);

    match s[pos..].chars().next() {
        Some(']') => TagParse::Tag {
            tag: RawTag {
                name: name.to_string(),
                attrs: Vec::new(),
            },
            consumed: pos + 1,
        },
        Some(':') => parse_attrs(s, name, pos + 1),
        // Tag-shaped name with a broken body: drop it rather than leak
        // bracket syntax into the displayed prose.
        Some(_) => malformed(s, pos),
        None => malformed(s, pos),
    }
}

/// Parse the attribute list starting at byte offset `pos` in `s`.
fn parse_attrs(s: &str, name: &str, mut pos: usize) -> TagParse {
    let mut attrs = Vec::new();

    loop {
        pos += count_leading_ws(&s[pos..]);

        match s[pos..].chars().next() {
            None => return malformed(s, pos),
            Some(']') => {
                return TagParse::Tag {
                    tag: RawTag {
                        name: name.to_string(),
                        attrs,
                    },
                    consumed: pos + 1,
                };
            }
            Some(_) => {}
        }

        // Key: everything up to '='. A ',' or ']' first means a value-less
        // attribute, which this protocol does not use.
        let key_end = match s[pos..].find(|c| c == '=' || c == ',' || c == ']') {
            Some(offset) if s[pos..].as_bytes()[offset] == b'=' => pos + offset,
            _ => return malformed(s, pos),
        };
        let key = s[pos..key_end].trim();
        if key.is_empty() {
            return malformed(s, pos);
        }
        pos = key_end + 1;
        pos += count_leading_ws(&s[pos..]);

        // Value: quoted string or bare literal.
        let value = if s[pos..].starts_with('"') {
            match read_quoted(&s[pos..]) {
                Some((content, consumed)) => {
                    pos += consumed;
                    AttrValue::Quoted(content)
                }
                None => return malformed(s, pos),
            }
        } else {
            let end_offset = s[pos..]
                .find(|c| c == ',' || c == ']')
                .unwrap_or(s.len() - pos);
            let raw = s[pos..pos + end_offset].trim().to_string();
            pos += end_offset;
            AttrValue::Bare(raw)
        };

        attrs.push((key.to_string(), value));
        pos += count_leading_ws(&s[pos..]);

        match s[pos..].chars().next() {
            Some(',') => pos += 1,
            Some(']') => {
                return TagParse::Tag {
                    tag: RawTag {
                        name: name.to_string(),
                        attrs,
                    },
                    consumed: pos + 1,
                };
            }
            _ => return malformed(s, pos),
        }
    }
}

/// Recovery: skip to the closing `]` (quote-aware). When the tag is never
/// closed the rest of the input is part of the tag, so it is all dropped.
fn malformed(s: &str, from: usize) -> TagParse {
    let mut in_quotes = false;
    let mut escaped = false;
    for (offset, c) in s[from..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ']' if !in_quotes => {
                return TagParse::Malformed {
                    consumed: from + offset + 1,
                }
            }
            _ => {}
        }
    }
    TagParse::Malformed { consumed: s.len() }
}

/// Read a quoted string starting at `"`. Returns the unescaped content and
/// the byte length consumed including both quotes.
fn read_quoted(s: &str) -> Option<(String, usize)> {
    debug_assert!(s.starts_with('"'));
    let mut content = String::new();
    let mut escaped = false;
    for (offset, c) in s.char_indices().skip(1) {
        if escaped {
            content.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => return Some((content, offset + 1)),
            _ => content.push(c),
        }
    }
    None
}

fn count_leading_ws(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_plain_prose() {
        let result = scan("Bạn bước vào rừng trúc.");
        assert_eq!(result.narration, "Bạn bước vào rừng trúc.");
        assert!(result.tags.is_empty());
        assert_eq!(result.dropped, 0);
    }

    #[test]
    fn test_scan_single_tag() {
        let result = scan(r#"Bạn vung kiếm.[ITEM_ACQUIRED: name="Yêu Đan", quantity=1]"#);
        assert_eq!(result.narration, "Bạn vung kiếm.");
        assert_eq!(result.tags.len(), 1);

        let tag = &result.tags[0];
        assert_eq!(tag.name, "ITEM_ACQUIRED");
        assert_eq!(tag.get_str("name"), Some("Yêu Đan"));
        assert_eq!(tag.get("quantity").unwrap().as_i64(), Some(1));
    }

    #[test]
    fn test_scan_preserves_document_order() {
        let result = scan("[A_TAG: x=1] giữa [B_TAG: y=2]");
        let names: Vec<&str> = result.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["A_TAG", "B_TAG"]);
        assert_eq!(result.narration, "giữa");
    }

    #[test]
    fn test_scan_bare_values() {
        let result = scan("[STATS_UPDATE: currency=+=50, turn=+1, hp=-10]");
        let tag = &result.tags[0];
        assert_eq!(tag.get("currency").unwrap().as_str(), "+=50");
        assert_eq!(tag.get("turn").unwrap().as_str(), "+1");
        assert_eq!(tag.get("hp").unwrap().as_str(), "-10");
    }

    #[test]
    fn test_scan_bool_and_decimal() {
        let result = scan("[YEUTHU: name=\"Hỏa Lang\", hostile=true, power=3.7]");
        let tag = &result.tags[0];
        assert_eq!(tag.get("hostile").unwrap().as_bool(), Some(true));
        assert_eq!(tag.get("power").unwrap().as_i64(), Some(3));
    }

    #[test]
    fn test_scan_escaped_quote_in_value() {
        let result = scan(r#"[WORLD_LORE_ADD: title="Truyền thuyết \"Kiếm Tổ\"", content="xưa"]"#);
        let tag = &result.tags[0];
        assert_eq!(tag.get_str("title"), Some(r#"Truyền thuyết "Kiếm Tổ""#));
    }

    #[test]
    fn test_malformed_tag_dropped_but_rest_processed() {
        let result = scan(
            r#"Mở đầu.[NPC name no colon equals]giữa[ITEM_ACQUIRED: name="Kiếm"]kết."#,
        );
        assert_eq!(result.dropped, 1);
        assert_eq!(result.tags.len(), 1);
        assert_eq!(result.narration, "Mở đầu.giữakết.");
    }

    #[test]
    fn test_non_tag_brackets_kept_as_prose() {
        let result = scan("Hắn thì thầm [nghe không rõ] rồi bỏ đi.");
        assert!(result.tags.is_empty());
        assert_eq!(result.dropped, 0);
        assert_eq!(result.narration, "Hắn thì thầm [nghe không rõ] rồi bỏ đi.");
    }

    #[test]
    fn test_unterminated_tag_dropped() {
        let result = scan(r#"Kết thúc.[STATS_UPDATE: hp=-10, mana"#);
        assert_eq!(result.narration, "Kết thúc.");
        assert_eq!(result.dropped, 1);
    }

    #[test]
    fn test_multiline_tag_best_effort() {
        let result = scan("[NPC: name=\"Tô Vân\",\n  description=\"Trưởng lão\"]");
        assert_eq!(result.tags.len(), 1);
        assert_eq!(result.tags[0].get_str("description"), Some("Trưởng lão"));
    }

    #[test]
    fn test_comma_inside_quotes() {
        let result = scan(r#"[NPC: name="Tô Vân", description="nghiêm khắc, lạnh lùng"]"#);
        let tag = &result.tags[0];
        assert_eq!(tag.get_str("description"), Some("nghiêm khắc, lạnh lùng"));
    }

    #[test]
    fn test_no_leftover_bracket_syntax() {
        let result = scan(r#"A[STATS_UPDATE: turn=+1]B[BAD TAG !!]C"#);
        assert!(!result.narration.contains('['));
        assert!(!result.narration.contains(']'));
    }

    #[test]
    fn test_tag_removal_leaves_single_gap() {
        let result = scan("Trước [STATS_UPDATE: turn=+1] sau.");
        assert_eq!(result.narration, "Trước sau.");
    }

    #[test]
    fn test_prose_whitespace_away_from_tags_is_preserved() {
        let result = scan("Hắn dừng lại.  Một hồi lâu.[STATS_UPDATE: turn=+1]");
        assert_eq!(result.narration, "Hắn dừng lại.  Một hồi lâu.");
    }

    /// Subscriber that enables every event so logging fields are evaluated.
    struct EnableAll;

    impl tracing::Subscriber for EnableAll {
        fn enabled(&self, _: &tracing::Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _: &tracing::span::Attributes<'_>) -> tracing::span::Id {
            tracing::span::Id::from_u64(1)
        }
        fn record(&self, _: &tracing::span::Id, _: &tracing::span::Record<'_>) {}
        fn record_follows_from(&self, _: &tracing::span::Id, _: &tracing::span::Id) {}
        fn event(&self, _: &tracing::Event<'_>) {}
        fn enter(&self, _: &tracing::span::Id) {}
        fn exit(&self, _: &tracing::span::Id) {}
    }

    #[test]
    fn test_long_multibyte_malformed_span_logged_without_panic() {
        let input = format!("Mở đầu.[NPCXX {}]kết", "ư".repeat(60));
        let result = tracing::subscriber::with_default(EnableAll, || scan(&input));

        assert_eq!(result.dropped, 1);
        assert_eq!(result.narration, "Mở đầu.kết");
    }
}
