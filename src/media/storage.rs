//! Object storage for images that were not sent to the image host.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found")]
    NotFound,

    #[error("invalid object reference: {0}")]
    InvalidReference(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Deletes the object the public `url` refers to.
    async fn delete(&self, url: &str) -> Result<(), StorageError>;
}

/// Files under `root`, served publicly under `public_prefix`.
pub struct LocalObjectStorage {
    root: PathBuf,
    public_prefix: String,
}

fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && !key.contains("..")
        && !key.contains('\\')
        && !key.contains('\0')
        && !key.starts_with('/')
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into(),
        }
    }

    fn resolve(&self, url: &str) -> Result<PathBuf, StorageError> {
        let key = url
            .find(&self.public_prefix)
            .map(|i| &url[i + self.public_prefix.len()..])
            .ok_or_else(|| StorageError::InvalidReference(url.to_string()))?;
        let key = key.split(['?', '#']).next().unwrap_or_default();

        if !is_safe_key(key) {
            return Err(StorageError::InvalidReference(url.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let path = self.resolve(url)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "stored image deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}
