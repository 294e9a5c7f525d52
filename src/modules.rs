//! Supported Module List
//!
//! Fetches the list of repositories to process from a remote JSON document

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Published list of supported modules
pub const DEFAULT_MODULES_URL: &str =
    "https://raw.githubusercontent.com/silverstripe/supported-modules/gh-pages/modules.json";

/// Module type tag kept by [`SupportedModuleFilter`]
pub const TYPE_SUPPORTED_MODULE: &str = "supported-module";

/// Entry of the remote module list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Module {
    /// GitHub slug (`owner/repo`)
    pub github: String,

    /// Composer package name
    pub composer: String,

    /// Module type tag
    #[serde(rename = "type", default)]
    pub module_type: Option<String>,
}

/// Narrows down the module list before it is processed
pub trait ModuleFilter: Send + Sync {
    fn filter(&self, modules: Vec<Module>) -> Vec<Module>;
}

/// Keeps only modules tagged `supported-module`
#[derive(Debug, Clone, Copy, Default)]
pub struct SupportedModuleFilter;

impl ModuleFilter for SupportedModuleFilter {
    fn filter(&self, modules: Vec<Module>) -> Vec<Module> {
        modules
            .into_iter()
            .filter(|module| module.module_type.as_deref() == Some(TYPE_SUPPORTED_MODULE))
            .collect()
    }
}

/// Supported Module Loader
///
/// Loads the module list over HTTP and maps composer names to GitHub slugs
pub struct SupportedModuleLoader {
    client: reqwest::Client,
    data_url: Url,
    filter: Option<Box<dyn ModuleFilter>>,
}

impl SupportedModuleLoader {
    /// Create a loader pointed at [`DEFAULT_MODULES_URL`] with no filter
    ///
    /// # Errors
    /// Returns an error if the default URL cannot be parsed
    pub fn new(client: reqwest::Client) -> Result<Self> {
        let data_url = Url::parse(DEFAULT_MODULES_URL)
            .map_err(|e| Error::config_validation(format!("Invalid modules URL: {e}")))?;

        Ok(Self {
            client,
            data_url,
            filter: None,
        })
    }

    /// Fetch the module list from `data_url` instead
    pub fn with_data_url(mut self, data_url: Url) -> Self {
        self.data_url = data_url;
        self
    }

    /// Apply `filter` to the fetched list
    pub fn with_filter(mut self, filter: Box<dyn ModuleFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// URL the module list is fetched from
    pub fn data_url(&self) -> &Url {
        &self.data_url
    }

    /// Get modules to process
    ///
    /// # Returns
    /// Composer package name to GitHub slug. Empty if the list could not be
    /// fetched or parsed.
    pub async fn get_modules(&self) -> BTreeMap<String, String> {
        let modules = match self.fetch_modules().await {
            Ok(modules) => modules,
            Err(e) => {
                tracing::warn!(url = %self.data_url, error = %e, "failed to load module list");
                return BTreeMap::new();
            }
        };

        let modules = match &self.filter {
            Some(filter) => filter.filter(modules),
            None => modules,
        };

        modules
            .into_iter()
            .map(|module| (module.composer, module.github))
            .collect()
    }

    async fn fetch_modules(&self) -> Result<Vec<Module>> {
        tracing::debug!(url = %self.data_url, "fetching module list");
        let entries = self
            .client
            .get(self.data_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<serde_json::Value>>()
            .await?;

        // Entries without both a slug and a package name are dropped, not fatal
        let modules = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Module>(entry) {
                Ok(module) => Some(module),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping incomplete module entry");
                    None
                }
            })
            .collect();

        Ok(modules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn module_list() -> serde_json::Value {
        serde_json::json!([
            {
                "github": "silverstripe/silverstripe-framework",
                "composer": "silverstripe/framework",
                "type": "supported-module"
            },
            {
                "github": "silverstripe/silverstripe-cms",
                "composer": "silverstripe/cms",
                "type": "supported-module"
            },
            {
                "github": "silverstripe/silverstripe-behat-extension",
                "composer": "silverstripe/behat-extension",
                "type": "supported-dependency"
            },
            {
                "github": "silverstripe/recipe-core",
                "composer": "silverstripe/recipe-core"
            }
        ])
    }

    fn loader_for(server: &MockServer) -> SupportedModuleLoader {
        let url = Url::parse(&format!("{}/modules.json", server.uri())).unwrap();
        SupportedModuleLoader::new(reqwest::Client::new())
            .unwrap()
            .with_data_url(url)
    }

    #[test]
    fn test_supported_module_filter() {
        let modules: Vec<Module> = serde_json::from_value(module_list()).unwrap();
        let filtered = SupportedModuleFilter.filter(modules);

        assert_eq!(filtered.len(), 2);
        assert!(filtered
            .iter()
            .all(|m| m.module_type.as_deref() == Some("supported-module")));
    }

    #[test]
    fn test_default_data_url() {
        let loader = SupportedModuleLoader::new(reqwest::Client::new()).unwrap();
        assert_eq!(loader.data_url().as_str(), DEFAULT_MODULES_URL);
    }

    #[tokio::test]
    async fn test_get_modules_unfiltered() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/modules.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(module_list()))
            .mount(&server)
            .await;

        let modules = loader_for(&server).get_modules().await;
        assert_eq!(modules.len(), 4);
        assert_eq!(
            modules["silverstripe/framework"],
            "silverstripe/silverstripe-framework"
        );
    }

    #[tokio::test]
    async fn test_get_modules_filtered() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/modules.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(module_list()))
            .mount(&server)
            .await;

        let modules = loader_for(&server)
            .with_filter(Box::new(SupportedModuleFilter))
            .get_modules()
            .await;

        assert_eq!(
            modules.into_iter().collect::<Vec<_>>(),
            vec![
                (
                    "silverstripe/cms".to_string(),
                    "silverstripe/silverstripe-cms".to_string()
                ),
                (
                    "silverstripe/framework".to_string(),
                    "silverstripe/silverstripe-framework".to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_modules_skips_incomplete_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/modules.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "github": "silverstripe/silverstripe-framework",
                    "composer": "silverstripe/framework",
                    "type": "supported-module"
                },
                {
                    "github": null,
                    "composer": "silverstripe/gitlab-only",
                    "type": "supported-module"
                },
                {
                    "composer": "silverstripe/no-slug"
                },
                {
                    "github": "silverstripe/silverstripe-admin",
                    "type": "supported-module"
                }
            ])))
            .mount(&server)
            .await;

        let modules = loader_for(&server).get_modules().await;
        assert_eq!(modules.len(), 1);
        assert_eq!(
            modules["silverstripe/framework"],
            "silverstripe/silverstripe-framework"
        );
    }

    #[tokio::test]
    async fn test_get_modules_http_failure_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/modules.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(loader_for(&server).get_modules().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_modules_invalid_json_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/modules.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        assert!(loader_for(&server).get_modules().await.is_empty());
    }
}
