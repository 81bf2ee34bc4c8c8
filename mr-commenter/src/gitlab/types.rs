//! Wire types for the GitLab merge-request changes endpoint, plus the
//! parsed merge-request reference.

use serde::Deserialize;

use crate::errors::{ConfigError, MrResult};

/// A merge request located from its web URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MrRef {
    /// Scheme + host, e.g. `https://gitlab.example.com`.
    pub host: String,
    /// Full project path, unencoded, e.g. `group/sub/project`.
    pub project: String,
    /// Merge-request iid (project-scoped, as used by the REST API).
    pub iid: u64,
}

impl MrRef {
    /// Parses a merge-request web URL.
    ///
    /// Accepts both the modern `/-/merge_requests/:iid` form and the legacy
    /// `/merge_requests/:iid` form; trailing segments like `/diffs` or query
    /// strings are ignored.
    pub fn parse(url: &str) -> MrResult<Self> {
        let invalid = || ConfigError::InvalidMrUrl(url.to_string());

        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(invalid)?;
        let scheme = if url.starts_with("https://") { "https" } else { "http" };

        let (host, path) = rest.split_once('/').ok_or_else(invalid)?;
        let (project_part, tail) = path.split_once("/merge_requests/").ok_or_else(invalid)?;

        let project = project_part.trim_end_matches("/-").trim_matches('/');
        if project.is_empty() || project == "-" {
            return Err(invalid().into());
        }

        let iid_str: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
        let iid: u64 = iid_str.parse().map_err(|_| invalid())?;

        Ok(Self {
            host: format!("{scheme}://{host}"),
            project: project.to_string(),
            iid,
        })
    }

    /// REST base for this project, with the path URL-encoded.
    pub fn api_base(&self) -> String {
        format!(
            "{}/api/v4/projects/{}",
            self.host,
            urlencoding::encode(&self.project)
        )
    }
}

/// The SHA triple versioning a merge request's diff.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DiffRefs {
    pub base_sha: String,
    pub start_sha: String,
    pub head_sha: String,
}

/// One file's entry in the changes response.
#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    pub old_path: String,
    pub new_path: String,
    #[serde(default)]
    pub diff: String,
    #[serde(default)]
    pub new_file: bool,
    #[serde(default)]
    pub renamed_file: bool,
    #[serde(default)]
    pub deleted_file: bool,
}

/// Response of `GET /projects/:path/merge_requests/:iid/changes`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub changes: Vec<Change>,
    pub diff_refs: DiffRefs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modern_mr_url() {
        let mr = MrRef::parse("https://gitlab.example.com/group/sub/proj/-/merge_requests/42/diffs")
            .unwrap();
        assert_eq!(mr.host, "https://gitlab.example.com");
        assert_eq!(mr.project, "group/sub/proj");
        assert_eq!(mr.iid, 42);
        assert_eq!(
            mr.api_base(),
            "https://gitlab.example.com/api/v4/projects/group%2Fsub%2Fproj"
        );
    }

    #[test]
    fn parses_legacy_mr_url() {
        let mr = MrRef::parse("http://git.local/team/app/merge_requests/7").unwrap();
        assert_eq!(mr.project, "team/app");
        assert_eq!(mr.iid, 7);
    }

    #[test]
    fn rejects_non_mr_urls() {
        assert!(MrRef::parse("https://gitlab.example.com/group/proj").is_err());
        assert!(MrRef::parse("ftp://gitlab.example.com/a/-/merge_requests/1").is_err());
        assert!(MrRef::parse("https://gitlab.example.com/-/merge_requests/1").is_err());
    }

    #[test]
    fn change_flags_default_to_false() {
        let raw = r#"{"old_path":"a.rs","new_path":"a.rs","diff":"@@ -1 +1 @@\n-x\n+y\n"}"#;
        let c: Change = serde_json::from_str(raw).unwrap();
        assert!(!c.new_file && !c.renamed_file && !c.deleted_file);
    }
}
