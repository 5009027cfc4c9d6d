//! Upload types and data structures.

use serde::{Deserialize, Serialize};

/// Options controlling collision behavior for a single upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    /// Upsert at the exact requested key; the store never renames.
    pub overwrite: bool,
    /// On a key collision, retry once under a fresh unique key.
    pub rename_on_conflict: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            rename_on_conflict: true,
        }
    }
}

/// Result of a successful upload. Produced exactly once per call and
/// immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// Final storage key the object was committed under.
    pub key: String,
    /// Stable public URL for the object.
    pub url: String,
}

/// Logical upload folders used by the website.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaFolder {
    /// Uploaded video files.
    Videos,
    /// Video thumbnail images.
    Thumbnails,
    /// Custom service icon images.
    ServiceIcons,
    /// Site-wide assets (logo, hero imagery).
    Site,
}

impl MediaFolder {
    /// Folder prefix within the bucket.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Videos => "videos",
            Self::Thumbnails => "thumbnails",
            Self::ServiceIcons => "service_icons",
            Self::Site => "site",
        }
    }

    /// Parse from a folder prefix.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "videos" => Some(Self::Videos),
            "thumbnails" => Some(Self::Thumbnails),
            "service_icons" => Some(Self::ServiceIcons),
            "site" => Some(Self::Site),
            _ => None,
        }
    }
}
