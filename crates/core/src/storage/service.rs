//! Upload service implementation.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use super::config::UploadPolicy;
use super::error::StorageError;
use super::key;
use super::normalize::{self, Normalized};
use super::store::ObjectStore;
use super::types::{UploadOptions, UploadResult};

/// Collision retries after the first no-overwrite write fails.
///
/// Deliberately capped: with 128-bit random key tokens, two collisions in a
/// row mean something other than bad luck, so the conflict surfaces to the
/// caller instead of looping.
const CONFLICT_RETRIES: u32 = 1;

/// Upload service for site media.
///
/// Stateless between calls; the store client is injected and owned by the
/// application's startup routine.
pub struct Uploader<S: ObjectStore> {
    store: Arc<S>,
    policy: UploadPolicy,
}

impl<S: ObjectStore> Uploader<S> {
    /// Create a new uploader.
    #[must_use]
    pub fn new(store: Arc<S>, policy: UploadPolicy) -> Self {
        Self { store, policy }
    }

    /// Validate an upload against policy limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is too large or the file extension
    /// is not allowed. Names without an extension pass.
    pub fn validate(&self, name: &str, size: u64) -> Result<(), StorageError> {
        if size > self.policy.max_file_size {
            return Err(StorageError::file_too_large(size, self.policy.max_file_size));
        }

        if let Some(extension) = key::extension(name) {
            if !self.policy.is_extension_allowed(&extension) {
                return Err(StorageError::extension_not_allowed(extension));
            }
        }

        Ok(())
    }

    /// Upload `payload` under `folder`, resolving name collisions.
    ///
    /// Image payloads are re-encoded as JPEG at fixed quality; everything
    /// else is stored byte-for-byte. The final key carries a random token
    /// unless `overwrite` is set or renaming is disabled, in which case it
    /// is exactly the sanitized requested key.
    ///
    /// # Errors
    ///
    /// - [`StorageError::FileTooLarge`] / [`StorageError::ExtensionNotAllowed`]
    ///   before any store round trip.
    /// - [`StorageError::Conflict`] when the key is taken and the rename
    ///   retry budget is spent (or renaming is disabled).
    /// - [`StorageError::Unavailable`] on transport failure, never retried.
    pub async fn upload(
        &self,
        folder: &str,
        desired_name: &str,
        payload: Bytes,
        options: UploadOptions,
    ) -> Result<UploadResult, StorageError> {
        let size = u64::try_from(payload.len()).unwrap_or(u64::MAX);
        self.validate(desired_name, size)?;

        let normalized = normalize::normalize(payload, desired_name);
        if let Normalized::Opaque { reason, .. } = &normalized {
            debug!(name = %desired_name, %reason, "payload stored without image normalization");
        }
        let (payload, name) = normalized.into_parts();

        if options.overwrite {
            // Upsert: stable key, e.g. reseeded brand assets.
            let key = key::exact_key(folder, &name);
            self.store.put(&key, payload, true).await?;
            return Ok(self.result(key));
        }

        if !options.rename_on_conflict {
            // Caller wants the exact key or nothing; a conflict surfaces as-is.
            let key = key::exact_key(folder, &name);
            self.store.put(&key, payload, false).await?;
            return Ok(self.result(key));
        }

        let mut attempt = 0;
        loop {
            let key = key::unique_key(folder, &name);
            match self.store.put(&key, payload.clone(), false).await {
                Ok(()) => return Ok(self.result(key)),
                Err(e @ StorageError::Conflict { .. }) => {
                    if attempt >= CONFLICT_RETRIES {
                        return Err(e);
                    }
                    attempt += 1;
                    warn!(%key, attempt, "upload conflict, retrying under a fresh key");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn result(&self, key: String) -> UploadResult {
        let url = self.store.public_url(&key);
        UploadResult { key, url }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::ObjectEntry;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// In-memory object store for tests.
    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<BTreeMap<String, Bytes>>,
        /// No-overwrite writes that report a conflict regardless of contents.
        forced_conflicts: AtomicU32,
        /// Every write fails as a transport error when set.
        unavailable: bool,
        puts: AtomicU32,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self::default()
        }

        fn with_forced_conflicts(n: u32) -> Self {
            Self {
                forced_conflicts: AtomicU32::new(n),
                ..Self::default()
            }
        }

        fn offline() -> Self {
            Self {
                unavailable: true,
                ..Self::default()
            }
        }

        fn get(&self, key: &str) -> Option<Bytes> {
            self.objects.lock().unwrap().get(key).cloned()
        }

        fn object_count(&self) -> usize {
            self.objects.lock().unwrap().len()
        }

        fn put_count(&self) -> u32 {
            self.puts.load(Ordering::SeqCst)
        }

        fn only_key(&self) -> String {
            let objects = self.objects.lock().unwrap();
            assert_eq!(objects.len(), 1);
            objects.keys().next().unwrap().clone()
        }
    }

    impl ObjectStore for MemoryStore {
        async fn list(&self, dir: &str) -> Result<Vec<ObjectEntry>, StorageError> {
            let prefix = format!("{}/", dir.trim_end_matches('/'));
            Ok(self
                .objects
                .lock()
                .unwrap()
                .keys()
                .filter_map(|k| k.strip_prefix(&prefix))
                .filter(|rest| !rest.contains('/'))
                .map(|name| ObjectEntry {
                    name: name.to_string(),
                })
                .collect())
        }

        async fn put(&self, key: &str, payload: Bytes, upsert: bool) -> Result<(), StorageError> {
            self.puts.fetch_add(1, Ordering::SeqCst);

            if self.unavailable {
                return Err(StorageError::unavailable("store offline"));
            }

            if !upsert && self.forced_conflicts.load(Ordering::SeqCst) > 0 {
                self.forced_conflicts.fetch_sub(1, Ordering::SeqCst);
                return Err(StorageError::conflict(key));
            }

            let mut objects = self.objects.lock().unwrap();
            if !upsert && objects.contains_key(key) {
                return Err(StorageError::conflict(key));
            }
            objects.insert(key.to_string(), payload);
            Ok(())
        }

        fn public_url(&self, key: &str) -> String {
            format!("https://cdn.test/{key}")
        }
    }

    fn uploader(store: &Arc<MemoryStore>) -> Uploader<MemoryStore> {
        Uploader::new(Arc::clone(store), UploadPolicy::new())
    }

    fn assert_tokenized(key: &str, prefix: &str, suffix: &str) {
        let token = key
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
            .unwrap_or_else(|| panic!("key {key} does not match {prefix}<token>{suffix}"));
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn test_same_name_twice_yields_distinct_keys() {
        let store = Arc::new(MemoryStore::new());
        let uploader = uploader(&store);
        let payload = Bytes::from_static(b"raw video bytes");

        let first = uploader
            .upload("videos", "clip.mp4", payload.clone(), UploadOptions::default())
            .await
            .expect("first upload");
        let second = uploader
            .upload("videos", "clip.mp4", payload, UploadOptions::default())
            .await
            .expect("second upload");

        assert_ne!(first.key, second.key);
        assert_ne!(first.url, second.url);
        assert!(store.get(&first.key).is_some());
        assert!(store.get(&second.key).is_some());
    }

    #[tokio::test]
    async fn test_overwrite_uses_exact_requested_key() {
        let store = Arc::new(MemoryStore::new());
        let uploader = uploader(&store);
        let options = UploadOptions {
            overwrite: true,
            rename_on_conflict: false,
        };

        let first = uploader
            .upload("site", "Logo Dark.SVG", Bytes::from_static(b"<svg one/>"), options)
            .await
            .expect("first upload");
        let second = uploader
            .upload("site", "Logo Dark.SVG", Bytes::from_static(b"<svg two/>"), options)
            .await
            .expect("overwrite upload");

        assert_eq!(first.key, "site/logo_dark.svg");
        assert_eq!(second.key, "site/logo_dark.svg");
        assert_eq!(store.object_count(), 1);
        assert_eq!(store.get("site/logo_dark.svg").unwrap(), Bytes::from_static(b"<svg two/>"));
    }

    #[tokio::test]
    async fn test_conflict_retries_once_then_succeeds() {
        let store = Arc::new(MemoryStore::with_forced_conflicts(1));
        let uploader = uploader(&store);

        let result = uploader
            .upload("videos", "clip.mp4", Bytes::from_static(b"bytes"), UploadOptions::default())
            .await
            .expect("retry should succeed");

        assert_eq!(store.put_count(), 2);
        assert_tokenized(&result.key, "videos/clip-", ".mp4");
        assert_eq!(store.only_key(), result.key);
    }

    #[tokio::test]
    async fn test_conflict_exhausts_retry_budget() {
        let store = Arc::new(MemoryStore::with_forced_conflicts(2));
        let uploader = uploader(&store);

        let err = uploader
            .upload("videos", "clip.mp4", Bytes::from_static(b"bytes"), UploadOptions::default())
            .await
            .expect_err("second conflict is terminal");

        assert!(matches!(err, StorageError::Conflict { .. }));
        // One initial attempt plus exactly one retry, never a loop.
        assert_eq!(store.put_count(), 2);
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn test_no_rename_mode_surfaces_conflict_immediately() {
        let store = Arc::new(MemoryStore::new());
        let uploader = uploader(&store);
        let options = UploadOptions {
            overwrite: false,
            rename_on_conflict: false,
        };

        let first = uploader
            .upload("videos", "clip.mp4", Bytes::from_static(b"one"), options)
            .await
            .expect("first upload");
        assert_eq!(first.key, "videos/clip.mp4");

        let err = uploader
            .upload("videos", "clip.mp4", Bytes::from_static(b"two"), options)
            .await
            .expect_err("exact key is taken");

        assert!(matches!(err, StorageError::Conflict { .. }));
        assert_eq!(store.put_count(), 2);
        assert_eq!(store.get("videos/clip.mp4").unwrap(), Bytes::from_static(b"one"));
    }

    #[tokio::test]
    async fn test_transport_errors_are_not_retried() {
        let store = Arc::new(MemoryStore::offline());
        let uploader = uploader(&store);

        let err = uploader
            .upload("videos", "clip.mp4", Bytes::from_static(b"bytes"), UploadOptions::default())
            .await
            .expect_err("store is offline");

        assert!(matches!(err, StorageError::Unavailable(_)));
        assert_eq!(store.put_count(), 1);
    }

    #[tokio::test]
    async fn test_non_image_payload_stored_byte_identical() {
        let store = Arc::new(MemoryStore::new());
        let uploader = uploader(&store);
        let payload = Bytes::from_static(b"\x00\x01binary video payload");

        let result = uploader
            .upload("videos", "Launch Reel.webm", payload.clone(), UploadOptions::default())
            .await
            .expect("upload");

        assert_tokenized(&result.key, "videos/launch_reel-", ".webm");
        assert_eq!(store.get(&result.key).unwrap(), payload);
    }

    #[tokio::test]
    async fn test_image_payload_reencoded_as_jpeg() {
        let store = Arc::new(MemoryStore::new());
        let uploader = uploader(&store);

        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]));
        let mut png = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .expect("png encoding");

        let result = uploader
            .upload("thumbnails", "Cover.png", Bytes::from(png), UploadOptions::default())
            .await
            .expect("upload");

        assert_tokenized(&result.key, "thumbnails/cover-", ".jpg");
        let stored = store.get(&result.key).unwrap();
        assert_eq!(&stored[..2], &[0xFF, 0xD8]);
        assert_eq!(result.url, format!("https://cdn.test/{}", result.key));
    }

    #[tokio::test]
    async fn test_normalized_key_structure_for_undecodable_png() {
        let store = Arc::new(MemoryStore::new());
        let uploader = uploader(&store);

        let result = uploader
            .upload(
                "thumbnails",
                "My Photo!!.PNG",
                Bytes::from_static(b"not a real png"),
                UploadOptions::default(),
            )
            .await
            .expect("upload");

        // Extension survives because the payload never decoded.
        assert_tokenized(&result.key, "thumbnails/my_photo__-", ".png");
        assert_eq!(store.get(&result.key).unwrap(), Bytes::from_static(b"not a real png"));
    }

    #[tokio::test]
    async fn test_oversized_payload_rejected_before_any_write() {
        let store = Arc::new(MemoryStore::new());
        let policy = UploadPolicy::new().with_max_file_size(8);
        let uploader = Uploader::new(Arc::clone(&store), policy);

        let err = uploader
            .upload("videos", "clip.mp4", Bytes::from_static(b"way past the limit"), UploadOptions::default())
            .await
            .expect_err("payload exceeds limit");

        assert!(matches!(err, StorageError::FileTooLarge { max: 8, .. }));
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_disallowed_extension_rejected_before_any_write() {
        let store = Arc::new(MemoryStore::new());
        let uploader = uploader(&store);

        let err = uploader
            .upload("site", "installer.exe", Bytes::from_static(b"MZ"), UploadOptions::default())
            .await
            .expect_err("extension is not allowed");

        assert!(matches!(err, StorageError::ExtensionNotAllowed { .. }));
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_uploaded_objects_visible_in_listing() {
        let store = Arc::new(MemoryStore::new());
        let uploader = uploader(&store);

        uploader
            .upload("videos", "a.mp4", Bytes::from_static(b"a"), UploadOptions::default())
            .await
            .expect("upload");
        uploader
            .upload("videos", "b.mp4", Bytes::from_static(b"b"), UploadOptions::default())
            .await
            .expect("upload");

        let listed = store.list("videos").await.expect("list");
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|e| e.name.ends_with(".mp4")));
    }
}
