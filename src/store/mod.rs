/*!
 * Document Store
 * Typed access to the `blogs` and `latest_works` collections
 */
pub mod ids;
pub mod memory;
pub mod postgres;

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::db::models::{
    BlogPatch, BlogPost, NewBlogPost, NewPortfolioWork, PortfolioWork, WorkPatch,
};
pub use ids::{Clock, IdGenerator, SystemClock};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    #[error("request cancelled")]
    Cancelled,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A document type stored in one collection.
pub trait Document: Clone + Send + Sync + 'static {
    type Draft: Send + 'static;
    type Patch: Send + 'static;

    const COLLECTION: &'static str;

    fn from_draft(id: String, draft: Self::Draft) -> Self;
    fn merge(&mut self, patch: Self::Patch);
    fn id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

impl Document for BlogPost {
    type Draft = NewBlogPost;
    type Patch = BlogPatch;

    const COLLECTION: &'static str = "blogs";

    fn from_draft(id: String, draft: NewBlogPost) -> Self {
        Self {
            id,
            title: draft.title,
            content: draft.content,
            tags: draft.tags,
            image_url: draft.image_url,
            created_at: draft.created_at,
            author: draft.author,
        }
    }

    fn merge(&mut self, patch: BlogPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = image_url;
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Document for PortfolioWork {
    type Draft = NewPortfolioWork;
    type Patch = WorkPatch;

    const COLLECTION: &'static str = "latest_works";

    fn from_draft(id: String, draft: NewPortfolioWork) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            image_url: draft.image_url,
            created_at: draft.created_at,
        }
    }

    fn merge(&mut self, patch: WorkPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = image_url;
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Read/write operations against one collection.
///
/// Every call is a round trip to the backend; nothing is cached and
/// concurrent writers race with last-write-wins. Reads honor `cancel`:
/// once it fires the call resolves to [`StoreError::Cancelled`].
#[async_trait]
pub trait Collection<D: Document>: Send + Sync {
    async fn get(&self, id: &str, cancel: &CancellationToken) -> Result<D, StoreError>;

    /// Whole collection, newest first.
    async fn list(&self, cancel: &CancellationToken) -> Result<Vec<D>, StoreError>;

    async fn insert(&self, id: &str, draft: D::Draft) -> Result<(), StoreError>;

    async fn merge(&self, id: &str, patch: D::Patch) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Writes `draft` at a freshly generated id and returns it.
    /// No collision check is made.
    async fn create(&self, ids: &IdGenerator, draft: D::Draft) -> Result<String, StoreError> {
        let id = ids.next_id();
        self.insert(&id, draft).await?;
        tracing::debug!(collection = D::COLLECTION, id = %id, "document created");
        Ok(id)
    }
}

/// Races `fut` against `cancel`, preferring cancellation.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StoreError::Cancelled),
        res = fut => res,
    }
}

/// Newest first; ties broken by id so listings are stable.
pub(crate) fn sort_newest_first<D: Document>(docs: &mut [D]) {
    docs.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().cmp(a.id()))
    });
}
