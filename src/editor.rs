/*!
 * Editor
 * Form-to-store workflows for blog posts and portfolio works, and the
 * image-then-document delete lifecycle
 */
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::db::models::{
    Author, BlogPatch, BlogPost, NewBlogPost, NewPortfolioWork, PortfolioWork, WorkPatch,
};
use crate::error::AppError;
use crate::identity::Identity;
use crate::media::{is_hosted_image, ObjectStorage, StorageError};
use crate::store::{Clock, Collection, IdGenerator, StoreError};

const NOT_SIGNED_IN: &str = "You must be logged in to create a post.";
const SAVE_BLOG_FAILED: &str = "Failed to save blog post. Please try again.";
const DELETE_BLOG_FAILED: &str = "Failed to delete blog post. Please try again.";
const SAVE_WORK_FAILED: &str = "Failed to save work. Please try again.";
const DELETE_WORK_FAILED: &str = "Failed to delete work. Please try again.";

/// Comma-separated tags, trimmed, empties dropped, order kept.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

/// Absent keeps the stored image; an empty value clears it.
fn image_change(url: Option<String>) -> Option<Option<String>> {
    url.map(|u| non_empty(Some(u)))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl BlogForm {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("title", "Title is required"));
        }
        if self.content.trim().is_empty() {
            return Err(AppError::validation("content", "Content is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "id", rename_all = "lowercase")]
pub enum EditorOutcome {
    Created(String),
    Updated(String),
}

impl EditorOutcome {
    pub fn id(&self) -> &str {
        match self {
            EditorOutcome::Created(id) | EditorOutcome::Updated(id) => id,
        }
    }
}

/// Best-effort removal of a stored image, then the document delete.
///
/// Images on the image host are never touched. A failed storage delete,
/// missing object included, is logged and does not stop the document delete.
pub(crate) async fn delete_with_image<F>(
    storage: &dyn ObjectStorage,
    hosted_marker: &str,
    image_url: Option<&str>,
    delete_document: F,
) -> Result<(), StoreError>
where
    F: Future<Output = Result<(), StoreError>>,
{
    if let Some(url) = image_url.filter(|u| !u.is_empty()) {
        if is_hosted_image(url, hosted_marker) {
            tracing::debug!(url = %url, "hosted image left in place");
        } else {
            match storage.delete(url).await {
                Ok(()) => {}
                Err(StorageError::NotFound) => {
                    tracing::warn!(url = %url, "Image not found in storage, deleting document anyway");
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Image delete failed, deleting document anyway");
                }
            }
        }
    }
    delete_document.await
}

pub struct BlogEditor {
    store: Arc<dyn Collection<BlogPost>>,
    storage: Arc<dyn ObjectStorage>,
    ids: Arc<IdGenerator>,
    clock: Arc<dyn Clock>,
    hosted_marker: String,
}

impl BlogEditor {
    pub fn new(
        store: Arc<dyn Collection<BlogPost>>,
        storage: Arc<dyn ObjectStorage>,
        ids: Arc<IdGenerator>,
        clock: Arc<dyn Clock>,
        hosted_marker: impl Into<String>,
    ) -> Self {
        Self {
            store,
            storage,
            ids,
            clock,
            hosted_marker: hosted_marker.into(),
        }
    }

    /// Creates when `existing` is None, otherwise merges into that post.
    /// Nothing is written unless the caller is signed in and the form is valid.
    pub async fn submit(
        &self,
        identity: Option<&Identity>,
        existing: Option<&str>,
        form: BlogForm,
    ) -> Result<EditorOutcome, AppError> {
        let identity =
            identity.ok_or_else(|| AppError::Unauthenticated(NOT_SIGNED_IN.to_string()))?;
        form.validate()?;

        let tags = parse_tags(&form.tags);

        match existing {
            None => {
                let draft = NewBlogPost {
                    title: form.title,
                    content: form.content,
                    tags,
                    image_url: non_empty(form.image_url),
                    created_at: self.clock.now(),
                    author: Author {
                        name: identity.name().to_string(),
                        uid: identity.uid.clone(),
                    },
                };
                let id = self
                    .store
                    .create(&self.ids, draft)
                    .await
                    .map_err(|e| AppError::from_write(e, SAVE_BLOG_FAILED))?;
                tracing::info!(id = %id, uid = %identity.uid, "Blog post created");
                Ok(EditorOutcome::Created(id))
            }
            Some(id) => {
                let patch = BlogPatch {
                    title: Some(form.title),
                    content: Some(form.content),
                    tags: Some(tags),
                    image_url: image_change(form.image_url),
                };
                self.store
                    .merge(id, patch)
                    .await
                    .map_err(|e| AppError::from_write(e, SAVE_BLOG_FAILED))?;
                tracing::info!(id = %id, uid = %identity.uid, "Blog post updated");
                Ok(EditorOutcome::Updated(id.to_string()))
            }
        }
    }

    /// Irreversible; refused unless `confirmed`.
    pub async fn delete(&self, id: &str, confirmed: bool) -> Result<(), AppError> {
        if !confirmed {
            return Err(AppError::ConfirmationRequired);
        }
        let post = self
            .store
            .get(id, &CancellationToken::new())
            .await
            .map_err(|e| AppError::from_write(e, DELETE_BLOG_FAILED))?;

        delete_with_image(
            self.storage.as_ref(),
            &self.hosted_marker,
            post.image_url.as_deref(),
            self.store.delete(id),
        )
        .await
        .map_err(|e| AppError::from_write(e, DELETE_BLOG_FAILED))?;
        tracing::info!(id = %id, "Blog post deleted");
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl WorkForm {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("title", "Title is required"));
        }
        Ok(())
    }
}

pub struct WorkEditor {
    store: Arc<dyn Collection<PortfolioWork>>,
    storage: Arc<dyn ObjectStorage>,
    ids: Arc<IdGenerator>,
    clock: Arc<dyn Clock>,
    hosted_marker: String,
}

impl WorkEditor {
    pub fn new(
        store: Arc<dyn Collection<PortfolioWork>>,
        storage: Arc<dyn ObjectStorage>,
        ids: Arc<IdGenerator>,
        clock: Arc<dyn Clock>,
        hosted_marker: impl Into<String>,
    ) -> Self {
        Self {
            store,
            storage,
            ids,
            clock,
            hosted_marker: hosted_marker.into(),
        }
    }

    pub async fn submit(
        &self,
        identity: Option<&Identity>,
        existing: Option<&str>,
        form: WorkForm,
    ) -> Result<EditorOutcome, AppError> {
        let identity =
            identity.ok_or_else(|| AppError::Unauthenticated(NOT_SIGNED_IN.to_string()))?;
        form.validate()?;

        match existing {
            None => {
                let draft = NewPortfolioWork {
                    title: form.title,
                    description: form.description,
                    image_url: non_empty(form.image_url),
                    created_at: self.clock.now(),
                };
                let id = self
                    .store
                    .create(&self.ids, draft)
                    .await
                    .map_err(|e| AppError::from_write(e, SAVE_WORK_FAILED))?;
                tracing::info!(id = %id, uid = %identity.uid, "Work created");
                Ok(EditorOutcome::Created(id))
            }
            Some(id) => {
                let patch = WorkPatch {
                    title: Some(form.title),
                    description: Some(form.description),
                    image_url: image_change(form.image_url),
                };
                self.store
                    .merge(id, patch)
                    .await
                    .map_err(|e| AppError::from_write(e, SAVE_WORK_FAILED))?;
                tracing::info!(id = %id, uid = %identity.uid, "Work updated");
                Ok(EditorOutcome::Updated(id.to_string()))
            }
        }
    }

    pub async fn delete(&self, id: &str, confirmed: bool) -> Result<(), AppError> {
        if !confirmed {
            return Err(AppError::ConfirmationRequired);
        }
        let work = self
            .store
            .get(id, &CancellationToken::new())
            .await
            .map_err(|e| AppError::from_write(e, DELETE_WORK_FAILED))?;

        delete_with_image(
            self.storage.as_ref(),
            &self.hosted_marker,
            work.image_url.as_deref(),
            self.store.delete(id),
        )
        .await
        .map_err(|e| AppError::from_write(e, DELETE_WORK_FAILED))?;
        tracing::info!(id = %id, "Work deleted");
        Ok(())
    }
}
