//! # fleet-labeler
//!
//! Keeps GitHub issue labels consistent across a fleet of repositories
//!
//! ## Features
//! - Label rename, color upsert and removal across many repositories
//! - Remote module list as the source of repositories
//! - GitHub API rate limit inspection

pub mod config;
pub mod error;
pub mod github;
pub mod modules;
pub mod sync;

pub use config::{LabelConfig, Repository, TemplateLoader};
pub use error::{Error, Result};
pub use github::{GitHubClient, LabelService, RateLimitInfo};
pub use modules::{SupportedModuleFilter, SupportedModuleLoader};
pub use sync::{LabelSyncer, SyncProgress, SyncResult, SyncTally};

