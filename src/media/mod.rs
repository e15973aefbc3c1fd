/*!
 * Media
 * Image ingestion (validate, compress, upload to the image host) and
 * cleanup of images kept in object storage
 */
pub mod compress;
pub mod host;
pub mod storage;

use std::sync::Arc;

use uuid::Uuid;

pub use compress::{compress, CompressionOptions};
pub use host::{ImageHost, UnsignedUploadHost};
pub use storage::{LocalObjectStorage, ObjectStorage, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// The upload itself is unacceptable; the message is shown to the user.
    #[error("{0}")]
    Rejected(String),

    #[error("image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image host request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("image host returned status {0}")]
    Status(u16),

    #[error("image host response has no secure_url")]
    MissingUrl,

    #[error("compression task failed: {0}")]
    Task(String),
}

/// Sniffs the content type from the leading bytes.
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

/// True when `url` points at the image host rather than object storage.
pub fn is_hosted_image(url: &str, marker: &str) -> bool {
    !marker.is_empty() && url.contains(marker)
}

/// Validate, compress, then upload; the returned URL is what documents store.
pub struct ImageIngest {
    host: Arc<dyn ImageHost>,
    options: CompressionOptions,
    max_upload_bytes: usize,
}

impl ImageIngest {
    pub fn new(host: Arc<dyn ImageHost>, options: CompressionOptions, max_upload_bytes: usize) -> Self {
        Self {
            host,
            options,
            max_upload_bytes,
        }
    }

    fn validate(&self, bytes: &[u8]) -> Result<&'static str, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::Rejected("Empty file".to_string()));
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(MediaError::Rejected(format!(
                "File too large. Maximum size is {} MB.",
                self.max_upload_bytes / (1024 * 1024)
            )));
        }
        sniff_image_type(bytes).ok_or_else(|| {
            MediaError::Rejected(
                "Unsupported file type. Allowed: JPEG, PNG, WebP, GIF.".to_string(),
            )
        })
    }

    /// Runs to completion once started; compression happens on the
    /// blocking pool and the upload only after it succeeds.
    pub async fn ingest(&self, bytes: Vec<u8>) -> Result<String, MediaError> {
        let mime = self.validate(&bytes)?;
        let original_size = bytes.len();
        let options = self.options;

        let compressed = tokio::task::spawn_blocking(move || compress(&bytes, options))
            .await
            .map_err(|e| MediaError::Task(e.to_string()))??;

        tracing::debug!(
            mime = mime,
            original_size,
            compressed_size = compressed.len(),
            "image compressed"
        );

        let filename = format!("{}.jpg", Uuid::new_v4());
        let url = self.host.upload(compressed, filename).await?;
        tracing::info!(url = %url, "image uploaded");
        Ok(url)
    }
}
