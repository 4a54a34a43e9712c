use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use chrono::Utc;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::{debug, warn};

/// Route under which uploaded images are served.
pub(crate) const IMAGE_ROUTE: &str = "/schoolImages";

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Stores uploaded school images in a local directory.
pub(crate) struct LocalAssetStore {
    dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredAsset {
    path: PathBuf,
    public_path: String,
}

impl StoredAsset {
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Path under which the asset is reachable over HTTP.
    pub(crate) fn public_path(&self) -> &str {
        &self.public_path
    }
}

impl LocalAssetStore {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `bytes` as `<unix millis>_<sanitized name>` and returns where it went.
    ///
    /// Existing files are never replaced; a taken name gets a counter after
    /// the timestamp, `<unix millis>_<n>_<sanitized name>`.
    pub(crate) async fn save(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> anyhow::Result<StoredAsset> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Cannot create upload directory {}", self.dir.display()))?;

        let name = sanitize_file_name(original_name);
        let millis = Utc::now().timestamp_millis();
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = match attempt {
                0 => format!("{millis}_{name}"),
                n => format!("{millis}_{n}_{name}"),
            };
            let path = self.dir.join(&file_name);
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => {
                    return Err(err).with_context(|| format!("Cannot create image {}", path.display()))
                }
            };
            file.write_all(bytes)
                .await
                .with_context(|| format!("Cannot write image {}", path.display()))?;
            file.flush()
                .await
                .with_context(|| format!("Cannot write image {}", path.display()))?;
            debug!("Stored {} bytes at {}", bytes.len(), path.display());

            return Ok(StoredAsset {
                path,
                public_path: format!("{IMAGE_ROUTE}/{file_name}"),
            });
        }
        Err(anyhow!("No free file name for {name} at {millis}"))
    }

    /// Best effort, failures are only logged.
    pub(crate) async fn remove(&self, asset: &StoredAsset) {
        if let Err(err) = tokio::fs::remove_file(asset.path()).await {
            warn!("Cannot remove image {}: {}", asset.path().display(), err);
        }
    }
}

fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}
