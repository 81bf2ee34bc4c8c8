//! Range resolver: where on the file should the comment anchor?
//!
//! Two strategies, tried in order: explicit line references in the AI text
//! ("L10-20", "lines 10-20", "第10~20行"), then matching the first fenced
//! code block against the raw file at the head commit. Every failure here is
//! non-fatal; the caller degrades to the diff-derived first-changed-line.

use lazy_static::lazy_static;
use regex::Regex;

/// Which side of the diff a range refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Old,
    New,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Old => "old",
            Side::New => "new",
        }
    }
}

/// A resolved 1-based inclusive line range on one side of the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: u64,
    pub end: u64,
    pub side: Side,
}

/// Snippets longer than this are not worth substring-searching.
const MAX_SNIPPET_CHARS: usize = 4000;

lazy_static! {
    /// "lines 10-20", "line 10 到 20" (any of -, ~, ～, 到, –, — as separator).
    static ref RANGE_EN_WORD: Regex =
        Regex::new(r"(?i)\blines?\s+(\d+)\s*(?:-|~|～|到|–|—)\s*(\d+)").unwrap();
    /// "L10-20", "L10~L20".
    static ref RANGE_EN_SHORT: Regex =
        Regex::new(r"(?i)\bL(\d+)\s*(?:-|~|～|–|—)\s*L?(\d+)").unwrap();
    /// "第10~20行" and separator variants.
    static ref RANGE_CN: Regex =
        Regex::new(r"第\s*(\d+)\s*(?:-|~|～|到|–|—)\s*(\d+)\s*行").unwrap();
    /// First fenced code block, info string ignored.
    static ref FENCED_BLOCK: Regex = Regex::new(r"(?s)```[^\n]*\n(.*?)```").unwrap();
}

/// Finds an explicit line range stated in the AI text.
///
/// Bounds are normalized to `start <= end` and clamped to be at least 1.
pub fn explicit_range(text: &str) -> Option<(u64, u64)> {
    for re in [&*RANGE_CN, &*RANGE_EN_WORD, &*RANGE_EN_SHORT] {
        if let Some(caps) = re.captures(text) {
            let a: u64 = caps.get(1)?.as_str().parse().ok()?;
            let b: u64 = caps.get(2)?.as_str().parse().ok()?;
            let start = a.min(b).max(1);
            let end = a.max(b).max(1);
            return Some((start, end));
        }
    }
    None
}

/// Extracts the first fenced code block from the AI text, capped at 4000
/// characters to bound the substring search.
pub fn first_code_snippet(text: &str) -> Option<String> {
    let caps = FENCED_BLOCK.captures(text)?;
    let body = caps.get(1)?.as_str().trim_end();
    if body.trim().is_empty() {
        return None;
    }
    Some(body.chars().take(MAX_SNIPPET_CHARS).collect())
}

/// Locates a quoted snippet inside the raw head-commit file content.
///
/// Tries the snippet's leading 3, then 2, then 1 non-blank lines as a
/// literal substring, tolerating AI paraphrasing further down the block.
/// The returned end line covers the *full* snippet length from the matched
/// start, not just the needle.
pub fn snippet_range(snippet: &str, raw: &str) -> Option<(u64, u64)> {
    let snippet_line_count = snippet.lines().count() as u64;
    if snippet_line_count == 0 {
        return None;
    }
    let lines: Vec<&str> = snippet
        .lines()
        .filter(|l| !l.trim().is_empty())
        .collect();

    for take in [3usize, 2, 1] {
        if lines.len() < take {
            continue;
        }
        let needle = lines[..take].join("\n");
        if let Some(offset) = raw.find(&needle) {
            let start = raw[..offset].matches('\n').count() as u64 + 1;
            let end = start + snippet_line_count - 1;
            return Some((start, end));
        }
    }
    None
}

/// Resolves the anchor range for one file's review.
///
/// `deleted_file` selects the old side; every other change kind anchors on
/// the new side. `raw_head` is the file content at the head commit, when it
/// could be fetched.
pub fn resolve(ai_text: &str, deleted_file: bool, raw_head: Option<&str>) -> Option<ResolvedRange> {
    let side = if deleted_file { Side::Old } else { Side::New };

    if let Some((start, end)) = explicit_range(ai_text) {
        return Some(ResolvedRange { start, end, side });
    }

    let raw = raw_head?;
    let snippet = first_code_snippet(ai_text)?;
    let (start, end) = snippet_range(&snippet, raw)?;
    Some(ResolvedRange { start, end, side })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chinese_range_variants() {
        assert_eq!(explicit_range("问题位于第10~20行"), Some((10, 20)));
        assert_eq!(explicit_range("第 3 到 5 行有重复逻辑"), Some((3, 5)));
    }

    #[test]
    fn english_ranges_normalize_order() {
        assert_eq!(explicit_range("see lines 5-3"), Some((3, 5)));
        assert_eq!(explicit_range("bug at L10-20"), Some((10, 20)));
        assert_eq!(explicit_range("compare L7～L9"), Some((7, 9)));
    }

    #[test]
    fn no_range_in_prose() {
        assert_eq!(explicit_range("the 3 loops allocate 20 times"), None);
    }

    #[test]
    fn extracts_first_fenced_block() {
        let text = "issue here:\n```rust\nlet x = 1;\nlet y = 2;\n```\nand\n```\nother\n```";
        assert_eq!(
            first_code_snippet(text).as_deref(),
            Some("let x = 1;\nlet y = 2;")
        );
    }

    #[test]
    fn snippet_match_counts_full_snippet_length() {
        let mut raw = String::new();
        for i in 1..=60 {
            raw.push_str(&format!("line {i}\n"));
        }
        // Quote lines 42-44; match must end at 44, not at the file's end.
        let snippet = "line 42\nline 43\nline 44";
        assert_eq!(snippet_range(snippet, &raw), Some((42, 44)));
    }

    #[test]
    fn snippet_match_degrades_to_fewer_lines() {
        let raw = "alpha\nbeta\ngamma\ndelta\n";
        // Third line paraphrased, so the 3-line needle misses but 2 lines hit.
        let snippet = "beta\ngamma\nsomething else";
        assert_eq!(snippet_range(snippet, raw), Some((2, 4)));
    }

    #[test]
    fn resolve_prefers_explicit_over_snippet() {
        let raw = "a\nb\nc\n";
        let text = "lines 2-3\n```\na\nb\n```";
        let r = resolve(text, false, Some(raw)).unwrap();
        assert_eq!((r.start, r.end, r.side), (2, 3, Side::New));
    }

    #[test]
    fn deleted_files_anchor_old_side() {
        let r = resolve("第1~2行已删除", true, None).unwrap();
        assert_eq!(r.side, Side::Old);
    }

    #[test]
    fn resolve_is_non_fatal_without_raw_content() {
        assert_eq!(resolve("```\nunfindable\n```", false, None), None);
    }
}
