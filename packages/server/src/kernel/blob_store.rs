use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use super::traits::BaseBlobStore;

/// Filesystem-backed blob store.
///
/// Keys are `<owner>/<timestamp>.<ext>` paths beneath a configured root.
/// Write-once: a key that already exists is rejected, never overwritten.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        // Keys are generated internally, but reject anything path-like that
        // could escape the root.
        if key.is_empty()
            || key.starts_with('/')
            || key
                .split('/')
                .any(|part| part.is_empty() || part == "." || part == "..")
        {
            bail!("invalid blob key: {key:?}");
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BaseBlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<()> {
        let path = self.resolve(key)?;
        let exists = tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("stat blob {}", path.display()))?;
        if exists {
            bail!("blob already exists: {key}");
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create blob directory {}", parent.display()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("write blob {}", path.display()))?;
        tracing::debug!(key, size = bytes.len(), "stored receipt image");
        Ok(())
    }
}
