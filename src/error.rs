//! Error Handling
//!
//! Error type definitions used in fleet-labeler

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error types for fleet-labeler
#[derive(Error, Debug)]
pub enum Error {
    #[error("GitHub API error: {0}")]
    GitHubApi(#[from] octocrab::Error),

    /// The GitHub API answered 404 for the addressed resource
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    ConfigValidation(String),

    #[error("GITHUB_ACCESS_TOKEN is not available in the environment!")]
    MissingAccessToken,

    #[error("Invalid repository format: {0} (expected 'owner/repo')")]
    InvalidRepositoryFormat(String),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("{0}")]
    Generic(String),
}

impl Error {
    /// Create a new configuration validation error
    pub fn config_validation<S: Into<String>>(message: S) -> Self {
        Error::ConfigValidation(message.into())
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Error::Generic(message.into())
    }

    /// Whether the remote side reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
