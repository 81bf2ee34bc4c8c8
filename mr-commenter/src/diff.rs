//! Unified-diff scanner recovering absolute line numbers.
//!
//! GitLab's changes endpoint hands back raw unified-diff text per file. To
//! anchor an inline comment we need 1-based absolute line numbers on the
//! old/new side, which means replaying hunk headers and counting `+`/`-`/
//! context lines.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `@@ -oldStart[,oldCount] +newStart[,newCount] @@`
    static ref HUNK_HEADER: Regex =
        Regex::new(r"^@@\s+-(\d+)(?:,(\d+))?\s+\+(\d+)(?:,(\d+))?\s+@@").unwrap();
}

/// Absolute line numbers of the first/last changed lines in one file's diff.
///
/// All fields stay `None` when the diff contains no `+`/`-` lines; callers
/// fall back to line 1 in that case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangedLines {
    /// New-side line number of the first added line.
    pub first_added_new: Option<u64>,
    /// Old-side line number of the first removed line.
    pub first_removed_old: Option<u64>,
    /// New-side line number of the last added line.
    pub last_added_new: Option<u64>,
    /// Old-side line number of the last removed line.
    pub last_removed_old: Option<u64>,
}

impl ChangedLines {
    pub fn has_additions(&self) -> bool {
        self.first_added_new.is_some()
    }

    pub fn has_removals(&self) -> bool {
        self.first_removed_old.is_some()
    }
}

/// Scans raw unified-diff text and recovers changed-line numbers.
///
/// Lines before the first hunk header are ignored, as are markers like
/// `\ No newline at end of file` (they do not advance either counter).
pub fn changed_lines(diff: &str) -> ChangedLines {
    let mut out = ChangedLines::default();
    let mut current_old: Option<u64> = None;
    let mut current_new: Option<u64> = None;

    for line in diff.lines() {
        if let Some(caps) = HUNK_HEADER.captures(line) {
            // Captures 1 and 3 are \d+ so the parses cannot fail.
            current_old = caps.get(1).and_then(|m| m.as_str().parse().ok());
            current_new = caps.get(3).and_then(|m| m.as_str().parse().ok());
            continue;
        }

        // No recording until a valid hunk header has been seen.
        let (Some(old), Some(new)) = (current_old, current_new) else {
            continue;
        };

        if line.starts_with("+++") || line.starts_with("---") {
            continue;
        }
        if line.starts_with('+') {
            out.first_added_new.get_or_insert(new);
            out.last_added_new = Some(new);
            current_new = Some(new + 1);
        } else if line.starts_with('-') {
            out.first_removed_old.get_or_insert(old);
            out.last_removed_old = Some(old);
            current_old = Some(old + 1);
        } else if line.starts_with(' ') {
            current_old = Some(old + 1);
            current_new = Some(new + 1);
        }
        // Anything else (e.g. "\ No newline at end of file") is ignored.
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_one_hunk_manually() {
        let diff = "@@ -10,3 +10,4 @@ fn demo()\n ctx1\n+added\n-removed\n ctx2\n";
        // new side: ctx1 at 10, "+added" at 11.
        // old side: ctx1 at 10, "-removed" at 11.
        let lines = changed_lines(diff);
        assert_eq!(lines.first_added_new, Some(11));
        assert_eq!(lines.first_removed_old, Some(11));
        assert_eq!(lines.last_added_new, Some(11));
        assert_eq!(lines.last_removed_old, Some(11));
    }

    #[test]
    fn second_hunk_resets_counters() {
        let diff = concat!(
            "@@ -1,2 +1,2 @@\n ctx\n ctx\n",
            "@@ -30,2 +40,3 @@\n ctx\n+late addition\n ctx\n",
        );
        let lines = changed_lines(diff);
        assert_eq!(lines.first_added_new, Some(41));
        assert_eq!(lines.first_removed_old, None);
    }

    #[test]
    fn no_changes_leaves_everything_unset() {
        let diff = "@@ -5,2 +5,2 @@\n ctx\n ctx\n";
        let lines = changed_lines(diff);
        assert_eq!(lines, ChangedLines::default());
        assert!(!lines.has_additions());
        assert!(!lines.has_removals());
    }

    #[test]
    fn ignores_prelude_and_file_headers() {
        let diff = concat!(
            "diff --git a/x.rs b/x.rs\n",
            "index 111..222 100644\n",
            "--- a/x.rs\n",
            "+++ b/x.rs\n",
            "@@ -1 +1,2 @@\n x\n+y\n",
            "\\ No newline at end of file\n",
        );
        let lines = changed_lines(diff);
        assert_eq!(lines.first_added_new, Some(2));
        assert_eq!(lines.first_removed_old, None);
    }
}
