//! Minimal GitLab REST client for the review pipeline.
//!
//! Three calls only: fetch the MR changes (diff text + SHA triple), fetch
//! raw file content at a commit, and create the inline comment (modern
//! discussions endpoint or legacy notes endpoint).

pub mod types;

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::errors::{ConfigError, MrResult, ProviderError, status_error};
use types::{ChangeSet, MrRef};

/// Authenticated client bound to one merge request.
#[derive(Debug)]
pub struct GitLabClient {
    http: reqwest::Client,
    mr: MrRef,
    token: String,
}

impl GitLabClient {
    /// Creates a client for one merge request.
    pub fn new(mr: MrRef, token: impl Into<String>) -> MrResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ConfigError::MissingToken.into());
        }
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http, mr, token })
    }

    pub fn mr(&self) -> &MrRef {
        &self.mr
    }

    /// `GET /projects/:path/merge_requests/:iid/changes`.
    #[instrument(skip(self), fields(iid = self.mr.iid))]
    pub async fn fetch_changes(&self) -> MrResult<ChangeSet> {
        let url = format!("{}/merge_requests/{}/changes", self.mr.api_base(), self.mr.iid);
        debug!("GET {url}");
        let resp = self
            .http
            .get(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;
        let resp = self.check(resp).await?;
        let set: ChangeSet = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(set)
    }

    /// Raw file content at `sha` via the `/-/raw/:sha/:path` web route.
    ///
    /// A missing file (404) is not an error here; range resolution treats it
    /// as "no raw content" and degrades.
    #[instrument(skip(self, sha))]
    pub async fn fetch_raw_file(&self, path: &str, sha: &str) -> MrResult<Option<String>> {
        let url = format!("{}/{}/-/raw/{}/{}", self.mr.host, self.mr.project, sha, path);
        debug!("GET {url}");
        let resp = self
            .http
            .get(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        let resp = self.check(resp).await?;
        Ok(Some(resp.text().await?))
    }

    /// `POST .../discussions` with a prebuilt payload (modern API).
    pub async fn create_discussion(&self, payload: &Value) -> MrResult<()> {
        let url = format!(
            "{}/merge_requests/{}/discussions",
            self.mr.api_base(),
            self.mr.iid
        );
        self.post_comment(&url, payload).await
    }

    /// `POST .../notes` with a prebuilt payload (legacy API).
    pub async fn create_legacy_note(&self, payload: &Value) -> MrResult<()> {
        let url = format!("{}/merge_requests/{}/notes", self.mr.api_base(), self.mr.iid);
        self.post_comment(&url, payload).await
    }

    async fn post_comment(&self, url: &str, payload: &Value) -> MrResult<()> {
        debug!("POST {url}");
        let resp = self
            .http
            .post(url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(payload)
            .send()
            .await?;
        self.check(resp).await?;
        Ok(())
    }

    /// Maps a non-success response to a [`ProviderError`], keeping the body
    /// snippet (GitLab reports position-validation failures there).
    async fn check(&self, resp: reqwest::Response) -> MrResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(status_error(status.as_u16(), &body).into())
    }
}
