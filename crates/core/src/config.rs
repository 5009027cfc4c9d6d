//! Application configuration management.

use serde::Deserialize;

use crate::storage::{StorageConfig, StorageProvider, UploadPolicy};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Storage configuration.
    pub storage: StorageSettings,
}

/// Storage configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Public URL prefix override.
    ///
    /// Defaults to a provider-derived base; set it for stores that serve
    /// public objects under a dedicated prefix (e.g. Supabase's
    /// `/storage/v1/object/public/{bucket}`).
    #[serde(default)]
    pub public_url_base: Option<String>,
    /// Maximum upload size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed upload extensions.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_max_file_size() -> u64 {
    UploadPolicy::DEFAULT_MAX_FILE_SIZE
}

fn default_allowed_extensions() -> Vec<String> {
    UploadPolicy::default_extensions()
}

impl StorageSettings {
    /// Provider and URL configuration for constructing the store.
    #[must_use]
    pub fn storage_config(&self) -> StorageConfig {
        let config = StorageConfig::new(self.provider.clone());
        match &self.public_url_base {
            Some(base) => config.with_public_url_base(base.clone()),
            None => config,
        }
    }

    /// Validation limits for the uploader.
    #[must_use]
    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy::new()
            .with_max_file_size(self.max_file_size)
            .with_allowed_extensions(self.allowed_extensions.clone())
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("ATELIER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
