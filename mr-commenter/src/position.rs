//! Position builder: the anchor object GitLab validates when creating an
//! inline discussion.
//!
//! GitLab rejects positions whose side/paths disagree with the change kind
//! (a new file must not carry old-side fields, a deleted file must not carry
//! new-side fields) or whose SHAs are stale. The builder therefore takes the
//! change kind and the freshest [`DiffRefs`] on every call.

use serde::Serialize;

use crate::anchor::{ResolvedRange, Side};
use crate::diff::ChangedLines;
use crate::gitlab::types::{Change, DiffRefs};

/// How a file changed inside the merge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    New,
    Deleted,
    Renamed,
    Modified,
}

impl ChangeKind {
    /// Classifies a change. Flag precedence: new > deleted > renamed.
    pub fn of(change: &Change) -> Self {
        if change.new_file {
            ChangeKind::New
        } else if change.deleted_file {
            ChangeKind::Deleted
        } else if change.renamed_file {
            ChangeKind::Renamed
        } else {
            ChangeKind::Modified
        }
    }
}

/// One bound of a multi-line comment span. The opposite side's line field is
/// serialized as an explicit `null`, which GitLab expects.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LineBound {
    #[serde(rename = "type")]
    pub side: &'static str,
    pub old_line: Option<u64>,
    pub new_line: Option<u64>,
}

/// A multi-line comment span.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LineRange {
    pub start: LineBound,
    pub end: LineBound,
}

/// GitLab inline-comment position payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Position {
    pub position_type: &'static str,
    pub base_sha: String,
    pub start_sha: String,
    pub head_sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_range: Option<LineRange>,
}

fn line_range_for(side: Side, start: u64, end: u64) -> LineRange {
    let bound = |line: u64| match side {
        Side::New => LineBound {
            side: side.as_str(),
            old_line: None,
            new_line: Some(line),
        },
        Side::Old => LineBound {
            side: side.as_str(),
            old_line: Some(line),
            new_line: None,
        },
    };
    LineRange {
        start: bound(start),
        end: bound(end),
    }
}

/// Assembles the position for one file's comment.
///
/// `lines` are the diff-derived changed-line numbers (the fallback anchor),
/// `resolved` the optional range from the AI text, and `refs` must come from
/// the freshest changes fetch.
pub fn build_position(
    change: &Change,
    lines: &ChangedLines,
    resolved: Option<&ResolvedRange>,
    refs: &DiffRefs,
) -> Position {
    let mut pos = Position {
        position_type: "text",
        base_sha: refs.base_sha.clone(),
        start_sha: refs.start_sha.clone(),
        head_sha: refs.head_sha.clone(),
        old_path: None,
        new_path: None,
        old_line: None,
        new_line: None,
        line_range: None,
    };

    let kind = ChangeKind::of(change);
    let side = match kind {
        ChangeKind::New => {
            pos.new_path = Some(change.new_path.clone());
            pos.new_line = Some(
                resolved
                    .map(|r| r.start)
                    .or(lines.first_added_new)
                    .unwrap_or(1),
            );
            Side::New
        }
        ChangeKind::Deleted => {
            pos.old_path = Some(change.old_path.clone());
            pos.old_line = Some(
                resolved
                    .map(|r| r.start)
                    .or(lines.first_removed_old)
                    .unwrap_or(1),
            );
            Side::Old
        }
        ChangeKind::Renamed => {
            // New-side anchor, both paths for traceability.
            pos.old_path = Some(change.old_path.clone());
            pos.new_path = Some(change.new_path.clone());
            pos.new_line = Some(
                resolved
                    .map(|r| r.start)
                    .or(lines.first_added_new)
                    .unwrap_or(1),
            );
            Side::New
        }
        ChangeKind::Modified => {
            pos.old_path = Some(change.old_path.clone());
            pos.new_path = Some(change.new_path.clone());
            match resolved {
                Some(r) if r.side == Side::Old => {
                    pos.old_line = Some(r.start);
                    Side::Old
                }
                Some(r) => {
                    pos.new_line = Some(r.start);
                    Side::New
                }
                None if lines.has_additions() => {
                    pos.new_line = lines.first_added_new;
                    Side::New
                }
                None if lines.has_removals() => {
                    pos.old_line = lines.first_removed_old;
                    Side::Old
                }
                None => {
                    pos.new_line = Some(1);
                    Side::New
                }
            }
        }
    };

    // Multi-line span only when the resolved range is genuinely wider than
    // one line and sits on the side we anchored to.
    if let Some(r) = resolved {
        if r.end > r.start && r.side == side {
            pos.line_range = Some(line_range_for(side, r.start, r.end));
        }
    }

    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs() -> DiffRefs {
        DiffRefs {
            base_sha: "b".repeat(40),
            start_sha: "s".repeat(40),
            head_sha: "h".repeat(40),
        }
    }

    fn change(new_file: bool, deleted_file: bool, renamed_file: bool) -> Change {
        Change {
            old_path: "src/old.rs".into(),
            new_path: "src/new.rs".into(),
            diff: String::new(),
            new_file,
            renamed_file,
            deleted_file,
        }
    }

    #[test]
    fn kind_precedence() {
        assert_eq!(ChangeKind::of(&change(true, true, true)), ChangeKind::New);
        assert_eq!(ChangeKind::of(&change(false, true, true)), ChangeKind::Deleted);
        assert_eq!(ChangeKind::of(&change(false, false, true)), ChangeKind::Renamed);
        assert_eq!(ChangeKind::of(&change(false, false, false)), ChangeKind::Modified);
    }

    #[test]
    fn new_file_anchors_new_side_only() {
        let lines = ChangedLines {
            first_added_new: Some(5),
            ..Default::default()
        };
        let pos = build_position(&change(true, false, false), &lines, None, &refs());
        assert_eq!(pos.new_line, Some(5));
        assert_eq!(pos.new_path.as_deref(), Some("src/new.rs"));
        assert!(pos.old_line.is_none() && pos.old_path.is_none());
    }

    #[test]
    fn new_file_without_additions_falls_back_to_line_one() {
        let pos = build_position(
            &change(true, false, false),
            &ChangedLines::default(),
            None,
            &refs(),
        );
        assert_eq!(pos.new_line, Some(1));
    }

    #[test]
    fn deleted_file_anchors_old_side_only() {
        let lines = ChangedLines {
            first_removed_old: Some(9),
            ..Default::default()
        };
        let pos = build_position(&change(false, true, false), &lines, None, &refs());
        assert_eq!(pos.old_line, Some(9));
        assert_eq!(pos.old_path.as_deref(), Some("src/old.rs"));
        assert!(pos.new_line.is_none() && pos.new_path.is_none());
    }

    #[test]
    fn renamed_file_keeps_both_paths() {
        let pos = build_position(
            &change(false, false, true),
            &ChangedLines::default(),
            None,
            &refs(),
        );
        assert!(pos.old_path.is_some() && pos.new_path.is_some());
        assert_eq!(pos.new_line, Some(1));
    }

    #[test]
    fn modified_prefers_additions_then_removals() {
        let c = change(false, false, false);
        let added = ChangedLines {
            first_added_new: Some(7),
            first_removed_old: Some(3),
            ..Default::default()
        };
        let pos = build_position(&c, &added, None, &refs());
        assert_eq!(pos.new_line, Some(7));
        assert!(pos.old_line.is_none());

        let removed_only = ChangedLines {
            first_removed_old: Some(3),
            ..Default::default()
        };
        let pos = build_position(&c, &removed_only, None, &refs());
        assert_eq!(pos.old_line, Some(3));
        assert!(pos.new_line.is_none());
    }

    #[test]
    fn multi_line_range_serializes_opposite_side_null() {
        let resolved = ResolvedRange {
            start: 10,
            end: 12,
            side: Side::New,
        };
        let pos = build_position(
            &change(false, false, false),
            &ChangedLines::default(),
            Some(&resolved),
            &refs(),
        );
        let v = serde_json::to_value(&pos).unwrap();
        assert_eq!(v["line_range"]["start"]["type"], "new");
        assert_eq!(v["line_range"]["start"]["new_line"], 10);
        assert!(v["line_range"]["start"]["old_line"].is_null());
        assert_eq!(v["line_range"]["end"]["new_line"], 12);
    }

    #[test]
    fn single_line_resolution_omits_line_range() {
        let resolved = ResolvedRange {
            start: 4,
            end: 4,
            side: Side::New,
        };
        let pos = build_position(
            &change(false, false, false),
            &ChangedLines::default(),
            Some(&resolved),
            &refs(),
        );
        assert_eq!(pos.new_line, Some(4));
        assert!(pos.line_range.is_none());
        let v = serde_json::to_value(&pos).unwrap();
        assert!(v.get("line_range").is_none());
        assert_eq!(v["position_type"], "text");
    }
}
