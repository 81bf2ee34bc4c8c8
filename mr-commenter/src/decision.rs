//! Review-decision filter: does an AI reply warrant a comment at all?
//!
//! Replies like "LGTM" or "无修改建议" must not produce an inline discussion.
//! The filter strips `<think>` sections, normalizes the remainder, and tests
//! it against an ordered bilingual pattern list. Long replies (over 120
//! normalized characters) are always treated as substantive findings.

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::{Error, MrResult};

/// Normalized length above which a reply cannot be a short "no suggestion".
const NO_SUGGESTION_MAX_LEN: usize = 120;

lazy_static! {
    static ref THINK_TAGS: Regex = Regex::new(r"(?is)<think[^>]*>.*?</think>").unwrap();
    static ref MARKDOWN_PUNCT: Regex = Regex::new(r"[`*_~>\[\](){}/#|]").unwrap();
    static ref EMOJI: Regex = Regex::new(r"[✅✌✊✋👍👌👏]").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    /// Ordered "no actionable suggestion" patterns, applied to normalized
    /// text. English acks are end-anchored (trailing punctuation only), so
    /// "lgtm, but ..." still posts; Chinese acks match as substrings.
    /// English first, then Chinese; first hit wins.
    static ref NO_SUGGESTION_PATTERNS: Vec<(&'static str, Regex)> = [
        r"\blgtm\b[\s,!.~！。，]*$",
        r"\blooks good(?: to me)?\b[\s,!.~！。，]*$",
        r"\b(?:no|without) (?:suggestions?|issues?|problems?|concerns?)\b[\s,!.~！。，]*$",
        r"\bnothing to (?:change|fix|comment)(?: on)?\b[\s,!.~！。，]*$",
        r"\b(?:looks|seems) (?:fine|ok|okay|good)\b[\s,!.~！。，]*$",
        r"^(?:approved?|ship it)\b[\s,!.~！。，]*$",
        r"无修改建议",
        r"无意见",
        r"没有(?:问题|意见|建议)",
        r"无需修改",
        r"(?:看起来|看上去)(?:没问题|没有问题|不错)",
        r"通过",
        r"已审阅[，,、 ]?无修改",
    ]
    .into_iter()
    .map(|p| (p, Regex::new(p).unwrap()))
    .collect();
}

/// Diagnostic detail for a suppressed comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoSuggestionMatch {
    /// Index into the ordered pattern list.
    pub index: usize,
    /// The pattern source that matched.
    pub pattern: &'static str,
    /// The matched substring of the normalized text.
    pub matched: String,
    /// The full normalized text the pattern ran against.
    pub normalized: String,
}

/// Outcome of interpreting one AI reply for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Post the stripped (not normalized) reply as an inline comment.
    Comment { body: String },
    /// Suppress the comment; the reply contained no actionable finding.
    Skip { detail: NoSuggestionMatch },
}

impl ReviewDecision {
    /// Stable machine-readable reason for a skip.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            ReviewDecision::Comment { .. } => None,
            ReviewDecision::Skip { .. } => Some("no_suggestion"),
        }
    }
}

/// Removes `<think ...>...</think>` sections (tags and contents) and trims.
///
/// Idempotent: stripping already-stripped text is a no-op.
pub fn strip_think_tags(text: &str) -> String {
    THINK_TAGS.replace_all(text, "").trim().to_string()
}

/// Lowercases, flattens markdown punctuation and common emoji to spaces,
/// and collapses whitespace.
fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let no_md = MARKDOWN_PUNCT.replace_all(&lower, " ");
    let no_emoji = EMOJI.replace_all(&no_md, " ");
    WHITESPACE.replace_all(&no_emoji, " ").trim().to_string()
}

/// Tests stripped AI text against the no-suggestion pattern list.
///
/// Returns `None` when the normalized text is longer than 120 characters
/// or no pattern matches.
pub fn no_suggestion_match(stripped: &str) -> Option<NoSuggestionMatch> {
    let normalized = normalize(stripped);
    if normalized.chars().count() > NO_SUGGESTION_MAX_LEN {
        return None;
    }
    for (index, (pattern, re)) in NO_SUGGESTION_PATTERNS.iter().enumerate() {
        if let Some(m) = re.find(&normalized) {
            return Some(NoSuggestionMatch {
                index,
                pattern,
                matched: m.as_str().to_string(),
                normalized,
            });
        }
    }
    None
}

/// Classifies a raw AI reply into a [`ReviewDecision`].
///
/// An empty-after-stripping reply is a validation error, not a skip.
pub fn decide(raw: &str) -> MrResult<ReviewDecision> {
    let stripped = strip_think_tags(raw);
    if stripped.is_empty() {
        return Err(Error::Validation("empty review body".into()));
    }
    Ok(match no_suggestion_match(&stripped) {
        Some(detail) => ReviewDecision::Skip { detail },
        None => ReviewDecision::Comment { body: stripped },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_think_sections() {
        assert_eq!(strip_think_tags("<think>secret</think>visible"), "visible");
        assert_eq!(
            strip_think_tags("<THINK attr=\"x\">\nmulti\nline\n</think> kept"),
            "kept"
        );
    }

    #[test]
    fn stripping_is_idempotent() {
        let once = strip_think_tags("<think>a</think>b <think>c</think>d");
        assert_eq!(strip_think_tags(&once), once);
    }

    #[test]
    fn short_acks_are_skipped() {
        for reply in ["LGTM", "看起来没问题", "Approved!", "无修改建议 👍", "通过"] {
            let m = no_suggestion_match(reply);
            assert!(m.is_some(), "expected a match for {reply:?}");
        }
    }

    #[test]
    fn skip_detail_reports_pattern() {
        let m = no_suggestion_match("LGTM").unwrap();
        assert_eq!(m.index, 0);
        assert_eq!(m.matched, "lgtm");
    }

    #[test]
    fn long_replies_always_comment() {
        let long = format!(
            "LGTM, but consider renaming `foo` because it shadows a builtin {}",
            "and also breaks downstream call sites in several modules. ".repeat(3)
        );
        assert!(no_suggestion_match(&long).is_none());
        match decide(&long).unwrap() {
            ReviewDecision::Comment { body } => assert!(body.starts_with("LGTM, but")),
            other => panic!("expected comment, got {other:?}"),
        }
    }

    #[test]
    fn ack_with_a_finding_attached_still_comments() {
        // End-anchored English acks: a trailing objection defeats the match.
        let d = decide("LGTM, but fix the null check").unwrap();
        assert!(matches!(d, ReviewDecision::Comment { .. }));
        assert!(no_suggestion_match("looks good, except the loop bound").is_none());
    }

    #[test]
    fn chinese_acks_match_as_substrings() {
        assert!(no_suggestion_match("代码审查通过").is_some());
    }

    #[test]
    fn substantive_short_reply_comments() {
        let d = decide("Rename `x` to something descriptive.").unwrap();
        assert!(matches!(d, ReviewDecision::Comment { .. }));
        assert_eq!(d.reason(), None);
    }

    #[test]
    fn empty_after_strip_is_an_error() {
        let err = decide("<think>only thoughts</think>  ").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
