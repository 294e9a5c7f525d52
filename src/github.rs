//! GitHub API Client
//!
//! Module for managing interactions with the GitHub API

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Repository;
use crate::error::{Error, Result};

/// Encode a string for use in URL path segments (RFC 3986 with UTF-8 support)
///
/// Only unreserved characters (A-Z, a-z, 0-9, -, ., _, ~) are left unencoded.
fn encode_path_segment(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' | '_' | '~' => c.to_string(),
            _ => c
                .to_string()
                .bytes()
                .map(|b| format!("%{:02X}", b))
                .collect::<String>(),
        })
        .collect()
}

/// Route of a single label resource
fn label_route(repo: &Repository, name: &str) -> String {
    format!(
        "/repos/{}/{}/labels/{}",
        repo.owner,
        repo.name,
        encode_path_segment(name)
    )
}

/// Map octocrab failures, turning a 404 into [`Error::NotFound`]
fn classify(err: octocrab::Error, resource: impl FnOnce() -> String) -> Error {
    match &err {
        octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 404 => {
            Error::NotFound(resource())
        }
        _ => Error::GitHubApi(err),
    }
}

/// GitHub Label Information
///
/// Represents label information retrieved from the GitHub API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitHubLabel {
    /// Label name
    pub name: String,

    /// Label color (6-digit hexadecimal, without #)
    pub color: String,

    /// Label description
    #[serde(default)]
    pub description: Option<String>,
}

impl From<octocrab::models::Label> for GitHubLabel {
    fn from(label: octocrab::models::Label) -> Self {
        Self {
            name: label.name,
            color: label.color,
            description: label.description,
        }
    }
}

/// Label operations on a single repository
///
/// Every call is a live round-trip; a missing label is reported as
/// [`Error::NotFound`].
#[async_trait]
pub trait LabelService: Send + Sync {
    /// Fetch a label by name
    async fn show_label(&self, repo: &Repository, name: &str) -> Result<GitHubLabel>;

    /// Create a label
    async fn create_label(&self, repo: &Repository, name: &str, color: &str)
        -> Result<GitHubLabel>;

    /// Rename and/or recolor an existing label
    async fn update_label(
        &self,
        repo: &Repository,
        current_name: &str,
        new_name: &str,
        color: &str,
    ) -> Result<GitHubLabel>;

    /// Delete a label
    async fn delete_label(&self, repo: &Repository, name: &str) -> Result<()>;
}

#[derive(Serialize)]
struct UpdateLabelRequest<'a> {
    new_name: &'a str,
    color: &'a str,
}

/// GitHub API Client
///
/// Client responsible for interactions with the GitHub API
pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    /// Create a new GitHub client
    ///
    /// # Arguments
    /// - `access_token`: GitHub access token
    ///
    /// # Errors
    /// Returns an error if client initialization fails
    pub fn new(access_token: &str) -> Result<Self> {
        let octocrab = Octocrab::builder()
            .personal_token(access_token.to_string())
            .build()
            .map_err(|e| Error::generic(format!("Failed to create GitHub client: {}", e)))?;

        Ok(Self { octocrab })
    }

    /// Create a client talking to a different API root (GitHub Enterprise, test servers)
    ///
    /// # Errors
    /// Returns an error if the URI is invalid or client initialization fails
    pub fn with_base_uri(access_token: &str, base_uri: &str) -> Result<Self> {
        let octocrab = Octocrab::builder()
            .personal_token(access_token.to_string())
            .base_uri(base_uri)?
            .build()
            .map_err(|e| Error::generic(format!("Failed to create GitHub client: {}", e)))?;

        Ok(Self { octocrab })
    }

    /// Get rate limit information
    ///
    /// # Returns
    /// Rate limit status of the core API
    pub async fn get_rate_limit(&self) -> Result<RateLimitInfo> {
        let rate_limit = self
            .octocrab
            .ratelimit()
            .get()
            .await
            .map_err(Error::GitHubApi)?;

        let core = rate_limit.resources.core;
        Ok(RateLimitInfo {
            limit: core.limit as u32,
            remaining: core.remaining as u32,
            reset_at: DateTime::from_timestamp(core.reset as i64, 0).unwrap_or_else(Utc::now),
        })
    }
}

#[async_trait]
impl LabelService for GitHubClient {
    async fn show_label(&self, repo: &Repository, name: &str) -> Result<GitHubLabel> {
        let route = label_route(repo, name);
        debug!(%repo, label = name, "fetching label");
        let label: octocrab::models::Label = self
            .octocrab
            .get(&route, None::<&()>)
            .await
            .map_err(|e| classify(e, || format!("{repo} label '{name}'")))?;

        Ok(label.into())
    }

    async fn create_label(
        &self,
        repo: &Repository,
        name: &str,
        color: &str,
    ) -> Result<GitHubLabel> {
        debug!(%repo, label = name, color, "creating label");
        let label = self
            .octocrab
            .issues(&repo.owner, &repo.name)
            .create_label(name, color, "")
            .await
            .map_err(|e| classify(e, || repo.to_string()))?;

        Ok(label.into())
    }

    async fn update_label(
        &self,
        repo: &Repository,
        current_name: &str,
        new_name: &str,
        color: &str,
    ) -> Result<GitHubLabel> {
        let route = label_route(repo, current_name);
        let body = UpdateLabelRequest { new_name, color };
        debug!(%repo, label = current_name, new_name, color, "updating label");
        let label: octocrab::models::Label = self
            .octocrab
            .patch(&route, Some(&body))
            .await
            .map_err(|e| classify(e, || format!("{repo} label '{current_name}'")))?;

        Ok(label.into())
    }

    async fn delete_label(&self, repo: &Repository, name: &str) -> Result<()> {
        let route = label_route(repo, name);
        debug!(%repo, label = name, "deleting label");
        let resource = || format!("{repo} label '{name}'");

        // The raw delete hands back any status, so the response is checked here
        let response = self
            .octocrab
            ._delete(route.as_str(), None::<&()>)
            .await
            .map_err(|e| classify(e, resource))?;
        octocrab::map_github_error(response)
            .await
            .map_err(|e| classify(e, resource))?;

        Ok(())
    }
}

/// Rate Limit Information
///
/// Represents GitHub API rate limit status
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitInfo {
    /// Hourly limit
    pub limit: u32,

    /// Remaining usage count
    pub remaining: u32,

    /// Reset time
    pub reset_at: DateTime<Utc>,
}

impl RateLimitInfo {
    /// Whether no calls are left until the reset
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Whole minutes from `now` until the reset, rounded up
    pub fn minutes_until_reset(&self, now: DateTime<Utc>) -> i64 {
        let seconds = (self.reset_at - now).num_seconds().max(0);
        (seconds + 59) / 60
    }
}
