//! Label Synchronization Functionality
//!
//! Reconciles each repository's labels toward the declared [`LabelConfig`]:
//! renames first, then color upserts, then removals.

use crate::config::{LabelConfig, Repository, PLACEHOLDER_COLOR};
use crate::error::{Error, Result};
use crate::github::LabelService;

/// Types of label synchronization operations
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOperation {
    /// Rename a label (color set to the placeholder)
    Rename { current_name: String, new_name: String },

    /// Recolor an existing managed label
    Update { name: String, color: String },

    /// Create a missing managed label
    Create { name: String, color: String },

    /// Delete a label
    Delete { name: String },

    /// Operation skipped because the label does not exist
    Skipped { name: String, reason: String },
}

/// Synchronization result for one repository
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    /// List of executed operations
    pub operations: Vec<SyncOperation>,

    /// Number of labels renamed
    pub renamed: u32,

    /// Number of labels updated
    pub updated: u32,

    /// Number of labels created
    pub created: u32,

    /// Number of labels deleted
    pub deleted: u32,

    /// Number of operations skipped as not found
    pub skipped: u32,

    /// Operations that failed without aborting the repository
    pub errors: Vec<String>,
}

impl SyncResult {
    /// Create a new empty synchronization result
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation and update statistics
    pub fn add_operation(&mut self, operation: SyncOperation) {
        match &operation {
            SyncOperation::Rename { .. } => self.renamed += 1,
            SyncOperation::Update { .. } => self.updated += 1,
            SyncOperation::Create { .. } => self.created += 1,
            SyncOperation::Delete { .. } => self.deleted += 1,
            SyncOperation::Skipped { .. } => self.skipped += 1,
        }
        self.operations.push(operation);
    }

    /// Add an error
    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    /// Whether anything was changed remotely
    pub fn has_changes(&self) -> bool {
        self.renamed > 0 || self.updated > 0 || self.created > 0 || self.deleted > 0
    }

    /// Get total number of recorded operations
    pub fn total_operations(&self) -> u32 {
        self.renamed + self.updated + self.created + self.deleted + self.skipped
    }
}

/// Aggregate outcome across repositories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncTally {
    /// Repositories synchronized without a fatal error
    pub success: u32,

    /// Repositories whose synchronization failed
    pub error: u32,
}

impl SyncTally {
    /// Number of repositories processed
    pub fn total(&self) -> u32 {
        self.success + self.error
    }
}

/// Progress callbacks for a multi-repository run
///
/// All methods default to doing nothing; `()` is the silent observer.
pub trait SyncProgress {
    /// A repository is about to be processed (`index` is 1-based)
    fn repository_started(&self, _index: usize, _total: usize, _slug: &str) {}

    /// One configured label operation is about to run
    fn step(&self) {}

    /// A repository finished; `result` may still carry non-fatal errors
    fn repository_finished(&self, _slug: &str, _result: &SyncResult) {}

    /// A repository failed and was left partially synchronized
    fn repository_failed(&self, _slug: &str, _error: &Error) {}
}

impl SyncProgress for () {}

/// Label Synchronization Engine
///
/// Applies one label configuration to repositories through a [`LabelService`]
pub struct LabelSyncer<'a, S: LabelService + ?Sized> {
    service: &'a S,
    config: &'a LabelConfig,
}

impl<'a, S: LabelService + ?Sized> LabelSyncer<'a, S> {
    /// Create a new label synchronization engine
    pub fn new(service: &'a S, config: &'a LabelConfig) -> Self {
        Self { service, config }
    }

    /// Synchronize every repository slug in order
    ///
    /// A failing repository is reported and counted, and the run moves on.
    pub async fn sync_all<I, T>(&self, slugs: I, progress: &dyn SyncProgress) -> SyncTally
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
        T: AsRef<str>,
    {
        let slugs = slugs.into_iter();
        let total = slugs.len();
        let mut tally = SyncTally::default();

        for (index, slug) in slugs.enumerate() {
            let slug = slug.as_ref();
            progress.repository_started(index + 1, total, slug);

            let outcome = match Repository::parse(slug) {
                Ok(repo) => self.sync_repository(&repo, progress).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(result) => {
                    tracing::info!(
                        repository = slug,
                        created = result.created,
                        updated = result.updated,
                        renamed = result.renamed,
                        deleted = result.deleted,
                        "repository synchronized"
                    );
                    progress.repository_finished(slug, &result);
                    tally.success += 1;
                }
                Err(e) => {
                    tracing::warn!(repository = slug, error = %e, "repository sync failed");
                    progress.repository_failed(slug, &e);
                    tally.error += 1;
                }
            }
        }

        tally
    }

    /// Synchronize labels of a single repository
    ///
    /// # Errors
    /// Returns an error if creating or recoloring a managed label fails. Work
    /// already done on the repository is not rolled back.
    pub async fn sync_repository(
        &self,
        repo: &Repository,
        progress: &dyn SyncProgress,
    ) -> Result<SyncResult> {
        let mut result = SyncResult::new();

        self.rename_labels(repo, progress, &mut result).await;
        self.upsert_labels(repo, progress, &mut result).await?;
        self.remove_labels(repo, progress, &mut result).await;

        Ok(result)
    }

    async fn rename_labels(
        &self,
        repo: &Repository,
        progress: &dyn SyncProgress,
        result: &mut SyncResult,
    ) {
        for (old_name, new_name) in &self.config.rename_labels {
            progress.step();

            match self
                .service
                .update_label(repo, old_name, new_name, PLACEHOLDER_COLOR)
                .await
            {
                Ok(_) => result.add_operation(SyncOperation::Rename {
                    current_name: old_name.clone(),
                    new_name: new_name.clone(),
                }),
                Err(e) if e.is_not_found() => result.add_operation(SyncOperation::Skipped {
                    name: old_name.clone(),
                    reason: "rename source does not exist".to_string(),
                }),
                Err(e) => {
                    tracing::warn!(%repo, label = %old_name, error = %e, "rename failed");
                    result.add_error(format!("Renaming '{}' to '{}': {}", old_name, new_name, e));
                }
            }
        }
    }

    async fn upsert_labels(
        &self,
        repo: &Repository,
        progress: &dyn SyncProgress,
        result: &mut SyncResult,
    ) -> Result<()> {
        for (name, color) in &self.config.default_labels {
            progress.step();

            // Any lookup failure counts as "does not exist"; a transient error
            // surfaces from the create call instead.
            let exists = match self.service.show_label(repo, name).await {
                Ok(_) => true,
                Err(e) => {
                    if !e.is_not_found() {
                        tracing::debug!(%repo, label = %name, error = %e, "label lookup failed");
                    }
                    false
                }
            };

            if exists {
                self.service.update_label(repo, name, name, color).await?;
                result.add_operation(SyncOperation::Update {
                    name: name.clone(),
                    color: color.clone(),
                });
            } else {
                self.service.create_label(repo, name, color).await?;
                result.add_operation(SyncOperation::Create {
                    name: name.clone(),
                    color: color.clone(),
                });
            }
        }

        Ok(())
    }

    async fn remove_labels(
        &self,
        repo: &Repository,
        progress: &dyn SyncProgress,
        result: &mut SyncResult,
    ) {
        for name in &self.config.remove_labels {
            progress.step();

            match self.service.delete_label(repo, name).await {
                Ok(()) => result.add_operation(SyncOperation::Delete { name: name.clone() }),
                Err(e) if e.is_not_found() => result.add_operation(SyncOperation::Skipped {
                    name: name.clone(),
                    reason: "label does not exist".to_string(),
                }),
                Err(e) => {
                    tracing::warn!(%repo, label = %name, error = %e, "delete failed");
                    result.add_error(format!("Deleting '{}': {}", name, e));
                }
            }
        }
    }
}
