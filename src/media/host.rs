use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::MediaError;

/// Remote image host; returns the public URL of the stored image.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, filename: String) -> Result<String, MediaError>;
}

#[derive(Debug, Deserialize)]
struct UploadReply {
    secure_url: Option<String>,
}

/// Unsigned multipart upload: the preset is the only credential.
pub struct UnsignedUploadHost {
    client: reqwest::Client,
    endpoint: String,
    preset: String,
}

impl UnsignedUploadHost {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, preset: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            preset: preset.into(),
        }
    }
}

#[async_trait]
impl ImageHost for UnsignedUploadHost {
    async fn upload(&self, bytes: Vec<u8>, filename: String) -> Result<String, MediaError> {
        let file = Part::bytes(bytes)
            .file_name(filename)
            .mime_str("image/jpeg")?;
        let form = Form::new()
            .text("upload_preset", self.preset.clone())
            .part("file", file);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), endpoint = %self.endpoint, "image host rejected upload");
            return Err(MediaError::Status(status.as_u16()));
        }

        let reply: UploadReply = response.json().await?;
        reply.secure_url.ok_or(MediaError::MissingUrl)
    }
}
