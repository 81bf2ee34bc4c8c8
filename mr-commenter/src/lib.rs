//! Public entry for the mr-commenter pipeline.
//!
//! Single high-level function to review one GitLab Merge Request:
//!
//! 1) **Step 1 — Fetch** — parse the MR URL, fetch changes and the
//!    `diff_refs` SHA triple (always fresh; stale SHAs are rejected by
//!    GitLab when posting).
//! 2) **Step 2 — Generate** — per changed file, render the review prompt
//!    and call the configured AI backend.
//! 3) **Step 3 — Decide** — strip think-tags and suppress "no suggestion"
//!    replies (LGTM and friends) instead of posting noise.
//! 4) **Step 4 — Anchor** — resolve an explicit or snippet-matched line
//!    range, falling back to the diff-derived first-changed line.
//! 5) **Step 5 — Publish** — build the position for the change kind and
//!    post through the configured payload shape (or dry-run).
//!
//! Failures in steps 2–5 are isolated per file: one file's error never
//! aborts the review of its siblings. The pipeline uses `tracing` for debug
//! logging and avoids `async-trait` and heap trait objects; AI dispatch is
//! enum-based via `ai-agent-service`.

pub mod anchor;
pub mod decision;
pub mod diff;
pub mod errors;
pub mod gitlab;
pub mod position;
pub mod publish;

use std::time::Instant;

use regex::Regex;
use tracing::{debug, info, warn};

use ai_agent_service::config::AgentConfig;
use ai_agent_service::prompt::{PromptValues, render_review_prompt};

use decision::ReviewDecision;
use errors::{Error, MrResult};
use gitlab::GitLabClient;
use gitlab::types::{Change, DiffRefs, MrRef};
use position::ChangeKind;
use publish::{PostOutcome, PublishConfig};

/// Configuration for one review run.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// GitLab personal/project access token.
    pub token: String,
    /// Optional filter: only review files whose new path matches.
    pub target: Option<Regex>,
    /// Free-form project context substituted into the prompt.
    pub context: String,
    /// Language hint substituted into the prompt.
    pub language: String,
    /// Optional prompt template override (`{{context}}`/`{{language}}`/`{{diff}}`).
    pub template: Option<String>,
    /// Payload shape and dry-run switch.
    pub publish: PublishConfig,
}

impl ReviewConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            target: None,
            context: String::new(),
            language: String::new(),
            template: None,
            publish: PublishConfig::default(),
        }
    }
}

/// What happened to one file.
#[derive(Debug)]
pub enum FileReviewOutcome {
    /// A comment was posted (or computed, in dry-run).
    Commented { outcome: PostOutcome },
    /// The AI reply contained no actionable finding.
    Skipped { reason: &'static str },
    /// This file's review failed; siblings were unaffected.
    Failed { error: Error },
}

/// Per-file result of a review run.
#[derive(Debug)]
pub struct FileReviewResult {
    /// New-side path (old path for deleted files).
    pub path: String,
    pub kind: ChangeKind,
    pub outcome: FileReviewOutcome,
}

/// Runs the whole pipeline for one merge request URL.
///
/// Returns one result per reviewed file. Transport or validation failures
/// before any file is reviewed (bad URL, missing token, changes fetch)
/// propagate; per-file failures are folded into the result list.
pub async fn run_review(
    mr_url: &str,
    agent_cfg: AgentConfig,
    cfg: &ReviewConfig,
) -> MrResult<Vec<FileReviewResult>> {
    let t0 = Instant::now();

    debug!("step1: parse MR url and init client");
    let mr = MrRef::parse(mr_url)?;
    let client = GitLabClient::new(mr, &cfg.token)?;
    let agent = ai_agent_service::service_for(agent_cfg)?;

    debug!("step1: fetch changes");
    let set = client.fetch_changes().await?;
    info!(
        "step1: changes fetched, files={} head={} ({} ms)",
        set.changes.len(),
        &set.diff_refs.head_sha[..set.diff_refs.head_sha.len().min(8)],
        t0.elapsed().as_millis()
    );

    let mut results = Vec::with_capacity(set.changes.len());
    for change in &set.changes {
        let path = display_path(change).to_string();
        if let Some(filter) = &cfg.target {
            if !filter.is_match(&path) {
                debug!("skip {path}: does not match target filter");
                continue;
            }
        }

        let kind = ChangeKind::of(change);
        let tf = Instant::now();
        let outcome = match review_one_file(&client, &agent, cfg, change, &set.diff_refs).await {
            Ok(o) => o,
            Err(error) => {
                warn!("review failed for {path}: {error}");
                FileReviewOutcome::Failed { error }
            }
        };
        debug!("file {path} done in {} ms", tf.elapsed().as_millis());
        results.push(FileReviewResult {
            path,
            kind,
            outcome,
        });
    }

    info!(
        "review done, files={} in {} ms",
        results.len(),
        t0.elapsed().as_millis()
    );
    Ok(results)
}

/// The strictly sequential per-file pipeline: generate → decide → anchor →
/// position → post.
async fn review_one_file(
    client: &GitLabClient,
    agent: &ai_agent_service::AgentService,
    cfg: &ReviewConfig,
    change: &Change,
    refs: &DiffRefs,
) -> MrResult<FileReviewOutcome> {
    let path = display_path(change);
    let lines = diff::changed_lines(&change.diff);

    debug!("step2: generate review for {path}");
    let prompt = render_review_prompt(
        cfg.template.as_deref(),
        &PromptValues {
            context: &cfg.context,
            language: &cfg.language,
            diff: &change.diff,
        },
    );
    let reply = agent.generate(&prompt).await?;

    debug!("step3: decide for {path}");
    let body = match decision::decide(&reply)? {
        ReviewDecision::Skip { detail } => {
            info!(
                "skip {path}: pattern #{} ({:?}) matched {:?}",
                detail.index, detail.pattern, detail.matched
            );
            return Ok(FileReviewOutcome::Skipped {
                reason: "no_suggestion",
            });
        }
        ReviewDecision::Comment { body } => body,
    };

    debug!("step4: resolve anchor for {path}");
    let deleted = change.deleted_file && !change.new_file;
    let raw_head = if deleted {
        None
    } else {
        // Best-effort: a failed raw fetch degrades to the diff-derived anchor.
        match client.fetch_raw_file(&change.new_path, &refs.head_sha).await {
            Ok(content) => content,
            Err(e) => {
                debug!("raw fetch failed for {path}: {e}");
                None
            }
        }
    };
    let resolved = anchor::resolve(&body, deleted, raw_head.as_deref());

    debug!("step5: build position and post for {path}");
    let pos = position::build_position(change, &lines, resolved.as_ref(), refs);
    let outcome = publish::post_review_comment(client, &cfg.publish, &body, &pos).await?;
    Ok(FileReviewOutcome::Commented { outcome })
}

fn display_path(change: &Change) -> &str {
    if change.deleted_file && !change.new_file {
        &change.old_path
    } else {
        &change.new_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::Side;
    use crate::gitlab::types::DiffRefs;

    fn refs() -> DiffRefs {
        DiffRefs {
            base_sha: "base".into(),
            start_sha: "start".into(),
            head_sha: "head".into(),
        }
    }

    // End-to-end over the pure stages: one modified file, one added line at
    // new-line 7, AI reply with neither explicit range nor snippet.
    #[test]
    fn modified_file_without_range_anchors_first_added_line() {
        let change = Change {
            old_path: "src/app.rs".into(),
            new_path: "src/app.rs".into(),
            diff: "@@ -5,3 +5,4 @@\n a\n b\n+new line\n c\n".into(),
            new_file: false,
            renamed_file: false,
            deleted_file: false,
        };
        let lines = diff::changed_lines(&change.diff);
        assert_eq!(lines.first_added_new, Some(7));

        let reply = "<think>plan</think>Consider extracting this into a helper.";
        let body = match decision::decide(reply).unwrap() {
            ReviewDecision::Comment { body } => body,
            other => panic!("expected comment, got {other:?}"),
        };
        let resolved = anchor::resolve(&body, false, None);
        assert!(resolved.is_none());

        let pos = position::build_position(&change, &lines, resolved.as_ref(), &refs());
        assert_eq!(pos.new_line, Some(7));
        assert!(pos.old_line.is_none());
        assert!(pos.line_range.is_none());
    }

    #[test]
    fn explicit_range_widens_to_line_range() {
        let change = Change {
            old_path: "src/app.rs".into(),
            new_path: "src/app.rs".into(),
            diff: "@@ -1,2 +1,3 @@\n a\n+b\n c\n".into(),
            new_file: false,
            renamed_file: false,
            deleted_file: false,
        };
        let lines = diff::changed_lines(&change.diff);
        let body = "第10~20行 存在重复逻辑";
        let resolved = anchor::resolve(body, false, None).unwrap();
        assert_eq!((resolved.start, resolved.end, resolved.side), (10, 20, Side::New));

        let pos = position::build_position(&change, &lines, Some(&resolved), &refs());
        assert_eq!(pos.new_line, Some(10));
        assert!(pos.line_range.is_some());
    }
}
