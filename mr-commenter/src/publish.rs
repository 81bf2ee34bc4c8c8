//! Publisher: turns a decided comment plus position into the GitLab call.
//!
//! GitLab deployments accept two incompatible inline-comment payloads: the
//! modern discussions endpoint (`{body, position: {...}}`) and the legacy
//! notes endpoint (`{note, position: "<json string>"}`). The shape is a
//! swappable serializer selected by [`PayloadMode`].
//!
//! Dry-run computes and logs the payload without calling the API.

use serde_json::{Value, json};
use tracing::info;

use crate::errors::{ConfigError, MrResult};
use crate::gitlab::GitLabClient;
use crate::position::Position;

/// Which wire shape the deployed GitLab accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadMode {
    /// `POST .../discussions` with `{body, position: object}`.
    #[default]
    DiscussionBody,
    /// `POST .../notes` with `{note, position: JSON-string}`.
    LegacyNote,
}

impl PayloadMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discussion" | "discussion_body" | "modern" => Some(Self::DiscussionBody),
            "note" | "legacy_note" | "legacy" => Some(Self::LegacyNote),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DiscussionBody => "discussion_body",
            Self::LegacyNote => "legacy_note",
        }
    }
}

/// Configuration for the publishing step.
#[derive(Debug, Clone, Default)]
pub struct PublishConfig {
    /// Wire shape of the comment payload.
    pub mode: PayloadMode,
    /// If true, do not actually send anything; just log what would be posted.
    pub dry_run: bool,
}

impl PublishConfig {
    /// Reads `MR_COMMENTER_PAYLOAD_MODE` and `MR_COMMENTER_DRY_RUN`.
    /// Dry-run defaults to **true** so a misconfigured run cannot spam an MR.
    pub fn from_env() -> MrResult<Self> {
        let mode = match std::env::var("MR_COMMENTER_PAYLOAD_MODE") {
            Ok(v) if !v.trim().is_empty() => {
                PayloadMode::parse(&v).ok_or(ConfigError::UnknownPayloadMode(v))?
            }
            _ => PayloadMode::default(),
        };
        Ok(Self {
            mode,
            dry_run: env_bool("MR_COMMENTER_DRY_RUN", true),
        })
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

/// Modern payload: position travels as a nested JSON object.
pub fn discussion_payload(body: &str, position: &Position) -> MrResult<Value> {
    Ok(json!({
        "body": body,
        "position": serde_json::to_value(position)?,
    }))
}

/// Legacy payload: position travels as a JSON-encoded *string* under `note`.
pub fn legacy_note_payload(body: &str, position: &Position) -> MrResult<Value> {
    Ok(json!({
        "note": body,
        "position": serde_json::to_string(position)?,
    }))
}

/// What happened to one comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    /// A network POST was performed.
    Posted,
    /// Dry-run: payload computed and logged only.
    DryRun,
}

/// Posts one inline comment through the configured payload shape.
pub async fn post_review_comment(
    client: &GitLabClient,
    cfg: &PublishConfig,
    body: &str,
    position: &Position,
) -> MrResult<PostOutcome> {
    let payload = match cfg.mode {
        PayloadMode::DiscussionBody => discussion_payload(body, position)?,
        PayloadMode::LegacyNote => legacy_note_payload(body, position)?,
    };

    if cfg.dry_run {
        info!(
            mode = cfg.mode.as_str(),
            "dry-run: would post {}",
            payload
        );
        return Ok(PostOutcome::DryRun);
    }

    match cfg.mode {
        PayloadMode::DiscussionBody => client.create_discussion(&payload).await?,
        PayloadMode::LegacyNote => client.create_legacy_note(&payload).await?,
    }
    Ok(PostOutcome::Posted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{ResolvedRange, Side};
    use crate::diff::ChangedLines;
    use crate::gitlab::types::{Change, DiffRefs};
    use crate::position::build_position;

    fn sample_position() -> Position {
        let change = Change {
            old_path: "a.rs".into(),
            new_path: "a.rs".into(),
            diff: String::new(),
            new_file: false,
            renamed_file: false,
            deleted_file: false,
        };
        let refs = DiffRefs {
            base_sha: "base".into(),
            start_sha: "start".into(),
            head_sha: "head".into(),
        };
        let resolved = ResolvedRange {
            start: 3,
            end: 5,
            side: Side::New,
        };
        build_position(&change, &ChangedLines::default(), Some(&resolved), &refs)
    }

    #[test]
    fn modern_payload_nests_position_object() {
        let p = sample_position();
        let v = discussion_payload("finding", &p).unwrap();
        assert_eq!(v["body"], "finding");
        assert_eq!(v["position"]["position_type"], "text");
        assert_eq!(v["position"]["new_line"], 3);
        assert!(v["position"]["line_range"].is_object());
    }

    #[test]
    fn legacy_payload_stringifies_position() {
        let p = sample_position();
        let v = legacy_note_payload("finding", &p).unwrap();
        assert_eq!(v["note"], "finding");
        let s = v["position"].as_str().expect("position must be a string");
        let inner: Value = serde_json::from_str(s).unwrap();
        assert_eq!(inner["base_sha"], "base");
        assert_eq!(inner["new_line"], 3);
    }

    #[test]
    fn mode_parsing() {
        assert_eq!(PayloadMode::parse("modern"), Some(PayloadMode::DiscussionBody));
        assert_eq!(PayloadMode::parse("LEGACY"), Some(PayloadMode::LegacyNote));
        assert_eq!(PayloadMode::parse("soap"), None);
    }
}
