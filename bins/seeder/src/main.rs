//! Brand asset seeder for Atelier.
//!
//! Uploads the site's static brand assets (logo, service icons, video
//! thumbnails) to object storage under stable keys, so reseeding overwrites
//! rather than accumulating renamed copies.
//!
//! Usage: cargo run --bin seeder [ASSETS_DIR]
//!
//! Assets live under per-folder subdirectories of ASSETS_DIR (default
//! `./assets`), e.g. `assets/site/logo.png`, `assets/service_icons/code.svg`.
//! Configuration comes from `config/*.toml` or `ATELIER__`-prefixed
//! environment variables, e.g.:
//!
//! ```text
//! ATELIER__STORAGE__PROVIDER__TYPE=s3
//! ATELIER__STORAGE__PROVIDER__ENDPOINT=https://xyz.supabase.co/storage/v1/s3
//! ATELIER__STORAGE__PROVIDER__BUCKET=media
//! ATELIER__STORAGE__PROVIDER__ACCESS_KEY_ID=...
//! ATELIER__STORAGE__PROVIDER__SECRET_ACCESS_KEY=...
//! ATELIER__STORAGE__PROVIDER__REGION=auto
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atelier_core::AppConfig;
use atelier_core::storage::{MediaFolder, OpendalStore, UploadOptions, Uploader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;

    let assets_dir = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("./assets"), PathBuf::from);

    let store = Arc::new(OpendalStore::from_config(config.storage.storage_config())?);
    info!(
        provider = store.provider_name(),
        bucket = store.bucket(),
        "storage configured"
    );

    let uploader = Uploader::new(store, config.storage.upload_policy());

    let folders = [
        MediaFolder::Site,
        MediaFolder::ServiceIcons,
        MediaFolder::Thumbnails,
        MediaFolder::Videos,
    ];

    let mut uploaded = 0_usize;
    for folder in folders {
        let dir = assets_dir.join(folder.as_str());
        if !dir.is_dir() {
            continue;
        }
        uploaded += seed_folder(&uploader, folder, &dir).await?;
    }

    info!(uploaded, "seeding complete");
    Ok(())
}

/// Uploads every regular file in `dir` under the given media folder.
async fn seed_folder(
    uploader: &Uploader<OpendalStore>,
    folder: MediaFolder,
    dir: &Path,
) -> anyhow::Result<usize> {
    let options = UploadOptions {
        overwrite: true,
        rename_on_conflict: false,
    };

    let mut count = 0_usize;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            warn!(path = %path.display(), "skipping asset with non-UTF-8 name");
            continue;
        };

        let payload = Bytes::from(std::fs::read(&path)?);
        let result = uploader.upload(folder.as_str(), name, payload, options).await?;
        info!(key = %result.key, url = %result.url, "asset uploaded");
        count += 1;
    }

    Ok(count)
}
