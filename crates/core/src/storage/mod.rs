//! Object storage uploads for site media using Apache OpenDAL.
//!
//! This module turns an untrusted file name plus raw bytes into a stored
//! object with a stable public URL. Vendor-agnostic with support for:
//! - S3-compatible: Supabase Storage, Cloudflare R2, AWS S3
//! - Local filesystem (development only)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Uploader::upload                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ validate(name, size)    │ policy limits, no store round trip     │
//! │ normalize(payload)      │ image -> JPEG q80, else passthrough    │
//! │ unique_key(folder, ...) │ sanitized stem + 128-bit random token  │
//! │ put(key, if-not-exists) │ authoritative conflict check, 1 retry  │
//! │ public_url(key)         │ stable URL handed back to the caller   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod key;
mod normalize;
mod service;
mod store;
mod types;

pub use config::{StorageConfig, StorageProvider, UploadPolicy};
pub use error::StorageError;
pub use key::{exact_key, sanitize_stem, unique_key};
pub use normalize::{Normalized, normalize};
pub use service::Uploader;
pub use store::{ObjectEntry, ObjectStore, OpendalStore};
pub use types::{MediaFolder, UploadOptions, UploadResult};
