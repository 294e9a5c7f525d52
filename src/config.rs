//! Configuration Management
//!
//! Repository identifiers, the declarative label configuration and the
//! template loader that reads it from disk

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Directory searched for template files when none is configured
pub const DEFAULT_TEMPLATES_DIR: &str = "templates";

/// Template holding the label configuration
pub const DEFAULT_LABELS_FILE: &str = "labels.json";

/// Color assigned to a renamed label until the upsert phase corrects it
pub const PLACEHOLDER_COLOR: &str = "FFFFFF";

/// GitHub repository identifier
///
/// Parsed from an `owner/name` slug
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository {
    /// Organization or user owning the repository
    pub owner: String,

    /// Repository name
    pub name: String,
}

impl Repository {
    /// Parse a repository slug
    ///
    /// # Arguments
    /// - `slug`: Repository string in "owner/repo" format
    ///
    /// # Errors
    /// Returns an error if the slug does not contain exactly one separator
    pub fn parse(slug: &str) -> Result<Self> {
        let (owner, name) = parse_repository(slug)?;
        Ok(Self { owner, name })
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Parse repository string into owner and name
///
/// # Arguments
/// - `repo`: Repository string in "owner/repo" format
///
/// # Errors
/// Returns an error if the format is invalid
pub fn parse_repository(repo: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = repo.split('/').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(Error::InvalidRepositoryFormat(repo.to_string()));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

/// Label Configuration
///
/// Desired label state applied to every repository. The collections are
/// applied in the order rename, upsert, remove, each in document order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LabelConfig {
    /// Managed labels and their colors (6-digit hex, without #)
    #[serde(default)]
    pub default_labels: IndexMap<String, String>,

    /// Old label name to new label name
    #[serde(default)]
    pub rename_labels: IndexMap<String, String>,

    /// Labels to delete outright
    #[serde(default)]
    pub remove_labels: Vec<String>,
}

impl LabelConfig {
    /// Whether the configuration declares nothing at all
    pub fn is_empty(&self) -> bool {
        self.default_labels.is_empty()
            && self.rename_labels.is_empty()
            && self.remove_labels.is_empty()
    }

    /// Number of remote operations one repository sync walks through
    pub fn operation_count(&self) -> usize {
        self.default_labels.len() + self.rename_labels.len() + self.remove_labels.len()
    }

    /// Parse a label configuration, detecting format by file name extension
    ///
    /// `.yaml` and `.yml` are read as YAML, everything else as JSON.
    ///
    /// # Errors
    /// If parsing fails
    pub fn parse(content: &str, filename: &str) -> Result<Self> {
        let config: Self = match Path::new(filename).extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(content)?,
            _ => serde_json::from_str(content)?,
        };
        Ok(config)
    }
}

/// Template Loader
///
/// Reads named template files from a configured directory
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    templates_dir: PathBuf,
}

impl Default for TemplateLoader {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATES_DIR)
    }
}

impl TemplateLoader {
    /// Create a loader reading from `templates_dir`
    pub fn new<P: Into<PathBuf>>(templates_dir: P) -> Self {
        Self {
            templates_dir: templates_dir.into(),
        }
    }

    /// Directory templates are read from
    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    /// Read a template file
    ///
    /// # Returns
    /// The file contents, or an empty string if the file cannot be read
    pub fn get(&self, filename: &str) -> String {
        let path = self.templates_dir.join(filename);
        match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "template could not be read");
                String::new()
            }
        }
    }

    /// Load the label configuration from a template file
    ///
    /// # Errors
    /// If the file is missing, unparseable, or declares no labels at all
    pub fn load_label_config(&self, filename: &str) -> Result<LabelConfig> {
        let not_loaded = || Error::config_validation(format!("{filename} data could not be loaded!"));

        let content = self.get(filename);
        if content.trim().is_empty() {
            return Err(not_loaded());
        }

        let config = LabelConfig::parse(&content, filename).map_err(|e| {
            tracing::debug!(file = filename, error = %e, "label configuration failed to parse");
            not_loaded()
        })?;

        if config.is_empty() {
            return Err(not_loaded());
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repository() {
        assert!(parse_repository("owner/repo").is_ok());
        assert!(parse_repository("silverstripe/silverstripe-framework").is_ok());

        assert!(parse_repository("repo").is_err()); // No slash
        assert!(parse_repository("/repo").is_err()); // No owner
        assert!(parse_repository("owner/").is_err()); // No repo name
        assert!(parse_repository("owner/repo/sub").is_err()); // Too many parts
    }

    #[test]
    fn test_repository_display_round_trips_slug() {
        let repo = Repository::parse("silverstripe/silverstripe-cms").unwrap();
        assert_eq!(repo.owner, "silverstripe");
        assert_eq!(repo.name, "silverstripe-cms");
        assert_eq!(repo.to_string(), "silverstripe/silverstripe-cms");
    }

    #[test]
    fn test_label_config_from_json() {
        let content = r#"{
            "default_labels": {"type/bug": "d73a4a", "affects/v4": "5319e7"},
            "rename_labels": {"bug": "type/bug"},
            "remove_labels": ["wontfix", "invalid"]
        }"#;
        let config = LabelConfig::parse(content, "labels.json").unwrap();

        assert_eq!(config.default_labels.len(), 2);
        assert_eq!(config.default_labels["type/bug"], "d73a4a");
        assert_eq!(config.rename_labels["bug"], "type/bug");
        assert_eq!(config.remove_labels, vec!["wontfix", "invalid"]);
        assert_eq!(config.operation_count(), 5);
    }

    #[test]
    fn test_label_config_keeps_document_order() {
        let content = r#"{
            "default_labels": {"type/enhancement": "0e8a16", "affects/v4": "5319e7"},
            "rename_labels": {"feature": "type/enhancement", "enhancement": "type/enhancement"}
        }"#;
        let config = LabelConfig::parse(content, "labels.json").unwrap();

        let renames: Vec<&str> = config.rename_labels.keys().map(String::as_str).collect();
        assert_eq!(renames, vec!["feature", "enhancement"]);
        let managed: Vec<&str> = config.default_labels.keys().map(String::as_str).collect();
        assert_eq!(managed, vec!["type/enhancement", "affects/v4"]);
    }

    #[test]
    fn test_label_config_yaml_keeps_document_order() {
        let content = "rename_labels:\n  b: c\n  a: b\n";
        let config = LabelConfig::parse(content, "labels.yaml").unwrap();
        let renames: Vec<&str> = config.rename_labels.keys().map(String::as_str).collect();
        assert_eq!(renames, vec!["b", "a"]);
    }

    #[test]
    fn test_label_config_missing_fields_default_to_empty() {
        let config = LabelConfig::parse(r#"{"remove_labels": ["duplicate"]}"#, "labels.json").unwrap();
        assert!(config.default_labels.is_empty());
        assert!(config.rename_labels.is_empty());
        assert!(!config.is_empty());
    }

    #[test]
    fn test_label_config_from_yaml() {
        let content = "default_labels:\n  bug: d73a4a\nremove_labels:\n  - wontfix\n";
        let config = LabelConfig::parse(content, "labels.yml").unwrap();
        assert_eq!(config.default_labels["bug"], "d73a4a");
        assert_eq!(config.remove_labels, vec!["wontfix"]);
    }

    #[test]
    fn test_template_loader_get_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loader = TemplateLoader::new(dir.path());
        assert_eq!(loader.get("nope.json"), "");
    }

    #[test]
    fn test_load_label_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("labels.json"),
            r#"{"default_labels": {"bug": "d73a4a"}, "rename_labels": {}, "remove_labels": []}"#,
        )
        .unwrap();

        let loader = TemplateLoader::new(dir.path());
        let config = loader.load_label_config("labels.json").unwrap();
        assert_eq!(config.default_labels.len(), 1);
    }

    #[test]
    fn test_load_label_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = TemplateLoader::new(dir.path());
        let err = loader.load_label_config("labels.json").unwrap_err();
        assert!(err.to_string().contains("labels.json data could not be loaded!"));
    }

    #[test]
    fn test_load_label_config_unparseable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("labels.json"), "not json").unwrap();
        let loader = TemplateLoader::new(dir.path());
        assert!(loader.load_label_config("labels.json").is_err());
    }

    #[test]
    fn test_load_label_config_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("labels.json"), "{}").unwrap();
        let loader = TemplateLoader::new(dir.path());
        assert!(matches!(
            loader.load_label_config("labels.json"),
            Err(Error::ConfigValidation(_))
        ));
    }

    #[test]
    fn test_default_template_loader_dir() {
        assert_eq!(
            TemplateLoader::default().templates_dir(),
            Path::new(DEFAULT_TEMPLATES_DIR)
        );
    }
}
