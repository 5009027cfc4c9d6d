//! Object store seam and the OpenDAL-backed implementation.

use bytes::Bytes;
use opendal::{ErrorKind, Operator, services};

use super::config::{StorageConfig, StorageProvider};
use super::error::StorageError;

/// A single object listed under a directory.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    /// Object base name within the listed directory.
    pub name: String,
}

/// Remote object store operations consumed by the uploader.
///
/// The client is constructed by the application's startup routine and
/// injected; the uploader owns no client of its own. Tests implement this
/// trait in memory.
pub trait ObjectStore: Send + Sync {
    /// List objects directly under `dir`.
    fn list(
        &self,
        dir: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ObjectEntry>, StorageError>> + Send;

    /// Write `payload` at `key`.
    ///
    /// With `upsert` the write replaces any existing object and always
    /// succeeds at the requested key. Without it the write must fail with
    /// [`StorageError::Conflict`] when the key is already taken; this is the
    /// authoritative collision check, racing writers included.
    fn put(
        &self,
        key: &str,
        payload: Bytes,
        upsert: bool,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Stable public URL for `key`.
    fn public_url(&self, key: &str) -> String;
}

/// Object store backed by an OpenDAL operator.
pub struct OpendalStore {
    operator: Operator,
    config: StorageConfig,
}

impl OpendalStore {
    /// Create a store from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self { operator, config })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
                    .pipe(Ok)
            }
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
                    .pipe(Ok)
            }
        }
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.config.provider.bucket()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

impl ObjectStore for OpendalStore {
    async fn list(&self, dir: &str) -> Result<Vec<ObjectEntry>, StorageError> {
        // OpenDAL lists directories only when the path ends with a slash.
        let dir = if dir.is_empty() || dir.ends_with('/') {
            dir.to_string()
        } else {
            format!("{dir}/")
        };

        let entries = self.operator.list(&dir).await.map_err(StorageError::from)?;

        Ok(entries
            .into_iter()
            .map(|e| ObjectEntry {
                name: e.name().trim_end_matches('/').to_string(),
            })
            .collect())
    }

    async fn put(&self, key: &str, payload: Bytes, upsert: bool) -> Result<(), StorageError> {
        let result = if upsert {
            self.operator.write(key, payload).await
        } else {
            self.operator.write_with(key, payload).if_not_exists(true).await
        };

        result.map(|_| ()).map_err(|e| match e.kind() {
            ErrorKind::ConditionNotMatch | ErrorKind::AlreadyExists => StorageError::conflict(key),
            _ => StorageError::from(e),
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.config.public_url_base.trim_end_matches('/'))
    }
}

/// Extension trait for pipe operator.
trait Pipe: Sized {
    fn pipe<F, R>(self, f: F) -> R
    where
        F: FnOnce(Self) -> R,
    {
        f(self)
    }
}

impl<T> Pipe for T {}
