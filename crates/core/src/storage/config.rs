//! Storage configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// S3-compatible storage: Supabase Storage, Cloudflare R2, AWS S3
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// AWS access key ID.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// AWS region.
        region: String,
    },
    /// Local filesystem (development only)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
}

impl StorageProvider {
    /// Create S3-compatible provider (Supabase Storage, Cloudflare R2, AWS S3).
    #[must_use]
    pub fn s3(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::S3 {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
        }
    }

    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Get the provider name for logging and diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::LocalFs { .. } => "local",
        }
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::S3 { bucket, .. } => bucket,
            Self::LocalFs { root } => root.to_str().unwrap_or("local"),
        }
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Prefix joined with a storage key to form the object's public URL.
    pub public_url_base: String,
}

impl StorageConfig {
    /// Create a new storage config with a provider-derived public URL base.
    ///
    /// For S3-compatible stores the default base is `{endpoint}/{bucket}`
    /// (path-style). Stores that serve public objects under a different
    /// prefix, e.g. Supabase's `/storage/v1/object/public/{bucket}`, should
    /// override it via [`Self::with_public_url_base`].
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        let public_url_base = match &provider {
            StorageProvider::S3 { endpoint, bucket, .. } => {
                format!("{}/{bucket}", endpoint.trim_end_matches('/'))
            }
            StorageProvider::LocalFs { root } => format!("file://{}", root.display()),
        };
        Self {
            provider,
            public_url_base,
        }
    }

    /// Set the public URL base.
    #[must_use]
    pub fn with_public_url_base(mut self, base: impl Into<String>) -> Self {
        self.public_url_base = base.into();
        self
    }
}

/// Upload validation limits, applied before any store round trip.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Maximum upload size in bytes.
    pub max_file_size: u64,
    /// Allowed upload extensions (compared case-insensitively).
    ///
    /// Names without an extension are treated as opaque binary and pass.
    pub allowed_extensions: Vec<String>,
}

impl UploadPolicy {
    /// Default max upload size: 200MB (videos are the largest asset class).
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 200 * 1024 * 1024;

    /// Create a policy with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: Self::default_extensions(),
        }
    }

    /// Set maximum upload size.
    #[must_use]
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set allowed upload extensions.
    #[must_use]
    pub fn with_allowed_extensions(mut self, extensions: Vec<String>) -> Self {
        self.allowed_extensions = extensions;
        self
    }

    /// Default allowed extensions for site media.
    #[must_use]
    pub fn default_extensions() -> Vec<String> {
        [
            // Video uploads
            "mp4", "avi", "mov", "wmv", "flv", "webm", "mkv",
            // Images and icons
            "png", "jpg", "jpeg", "gif", "webp", "svg",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    /// Check if an extension is allowed.
    #[must_use]
    pub fn is_extension_allowed(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.allowed_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new()
    }
}
