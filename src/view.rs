/*!
 * View Pipeline
 * One fetch per view, mapped onto an explicit state; superseded or
 * cancelled loads are discarded
 */
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::db::models::{BlogPost, PortfolioWork};
use crate::render::{preview_text, published_on, render_markdown, render_plain_text};
use crate::store::{Collection, StoreError};

const PLACEHOLDER_IMAGE: &str = "/images/project_placeholder.jpg";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "kebab-case")]
pub enum ViewState<T> {
    Loading,
    Content(T),
    Empty,
    Error(String),
    NotFound,
}

impl<T: Serialize> IntoResponse for ViewState<T> {
    fn into_response(self) -> Response {
        let status = match &self {
            ViewState::Content(_) | ViewState::Empty | ViewState::Loading => StatusCode::OK,
            ViewState::NotFound => StatusCode::NOT_FOUND,
            ViewState::Error(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(self)).into_response()
    }
}

/// One in-flight load. Its token is cancelled when a newer load begins.
#[derive(Debug, Clone)]
pub struct Ticket {
    seq: u64,
    cancel: CancellationToken,
}

impl Ticket {
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

struct LoaderState<T> {
    seq: u64,
    cancel: CancellationToken,
    view: ViewState<T>,
}

/// Holds the state of one view and accepts results only from its latest load.
pub struct Loader<T> {
    inner: Mutex<LoaderState<T>>,
}

impl<T> Default for Loader<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(LoaderState {
                seq: 0,
                cancel: CancellationToken::new(),
                view: ViewState::Loading,
            }),
        }
    }
}

impl<T> Loader<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the previous load and starts a new one in `Loading`.
    pub fn begin(&self) -> Ticket {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.cancel.cancel();
        inner.seq += 1;
        inner.cancel = CancellationToken::new();
        inner.view = ViewState::Loading;
        Ticket {
            seq: inner.seq,
            cancel: inner.cancel.clone(),
        }
    }

    /// Applies `view` if `ticket` is still the current, live load.
    pub fn settle(&self, ticket: &Ticket, view: ViewState<T>) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if ticket.seq != inner.seq || ticket.cancel.is_cancelled() {
            tracing::debug!(ticket = ticket.seq, current = inner.seq, "stale load discarded");
            return false;
        }
        inner.view = view;
        true
    }

    /// Abandons the current load, e.g. when the view goes away.
    pub fn cancel(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel
            .cancel();
    }

    /// Runs `load` under a fresh ticket. Dropping the returned future
    /// cancels the ticket.
    pub async fn run<F, Fut>(&self, load: F) -> Option<ViewState<T>>
    where
        T: Clone,
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Option<ViewState<T>>>,
    {
        let ticket = self.begin();
        let _guard = ticket.token().clone().drop_guard();
        let view = load(ticket.token().clone()).await?;
        self.settle(&ticket, view).then(|| self.view())
    }
}

impl<T: Clone> Loader<T> {
    pub fn view(&self) -> ViewState<T> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .view
            .clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogCard {
    pub id: String,
    pub title: String,
    pub image_url: Option<String>,
    pub preview: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogDetail {
    pub id: String,
    pub title: String,
    pub html: String,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub published_on: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub description_html: String,
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl BlogCard {
    pub fn from_post(post: BlogPost, preview_chars: usize) -> Self {
        Self {
            preview: preview_text(&post.content, preview_chars),
            id: post.id,
            title: post.title,
            image_url: post.image_url,
            tags: post.tags,
            created_at: post.created_at,
        }
    }
}

impl From<BlogPost> for BlogDetail {
    fn from(post: BlogPost) -> Self {
        Self {
            html: render_markdown(&post.content),
            published_on: published_on(post.created_at),
            id: post.id,
            title: post.title,
            image_url: post.image_url,
            tags: post.tags,
            author_name: post.author.name,
            created_at: post.created_at,
        }
    }
}

impl From<PortfolioWork> for WorkCard {
    fn from(work: PortfolioWork) -> Self {
        Self {
            id: work.id,
            title: work.title,
            description: work.description,
            image_url: work.image_url,
            created_at: work.created_at,
        }
    }
}

impl From<PortfolioWork> for WorkDetail {
    fn from(work: PortfolioWork) -> Self {
        Self {
            description_html: render_plain_text(&work.description),
            id: work.id,
            title: work.title,
            description: work.description,
            image_url: work.image_url,
            created_at: Some(work.created_at),
        }
    }
}

fn demo_work(id: &str, title: &str, description: &str) -> WorkDetail {
    WorkDetail {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        description_html: render_plain_text(description),
        image_url: Some(PLACEHOLDER_IMAGE.to_string()),
        created_at: None,
    }
}

/// Showcase entries served when a work detail cannot be read from the store.
pub fn demo_works() -> Vec<WorkDetail> {
    vec![
        demo_work(
            "demo1",
            "Modern SaaS Dashboard",
            "A modern SaaS dashboard with real-time analytics, user management, and subscription handling. Built with Next.js and Firebase.",
        ),
        demo_work(
            "demo2",
            "Mobile Banking App",
            "Secure and intuitive mobile banking application with biometric authentication and real-time transaction tracking.",
        ),
        demo_work(
            "demo3",
            "AI Content Generator",
            "AI-powered content generation platform with multiple language support and SEO optimization features.",
        ),
    ]
}

/// None when the load was cancelled, during or after the fetch.
fn settled<T>(cancel: &CancellationToken, view: ViewState<T>) -> Option<ViewState<T>> {
    (!cancel.is_cancelled()).then_some(view)
}

pub async fn load_blog_list(
    store: &dyn Collection<BlogPost>,
    preview_chars: usize,
    cancel: &CancellationToken,
) -> Option<ViewState<Vec<BlogCard>>> {
    let view = match store.list(cancel).await {
        Ok(posts) if posts.is_empty() => ViewState::Empty,
        Ok(posts) => ViewState::Content(
            posts
                .into_iter()
                .map(|p| BlogCard::from_post(p, preview_chars))
                .collect(),
        ),
        Err(StoreError::Cancelled) => return None,
        Err(e) => {
            tracing::error!("Error fetching blogs: {}", e);
            ViewState::Error("Failed to load blog posts.".to_string())
        }
    };
    settled(cancel, view)
}

pub async fn load_blog_detail(
    store: &dyn Collection<BlogPost>,
    id: &str,
    cancel: &CancellationToken,
) -> Option<ViewState<BlogDetail>> {
    let view = match store.get(id, cancel).await {
        Ok(post) => ViewState::Content(BlogDetail::from(post)),
        Err(StoreError::NotFound) => ViewState::NotFound,
        Err(StoreError::Cancelled) => return None,
        Err(e) => {
            tracing::error!(id = %id, "Error fetching blog: {}", e);
            ViewState::Error("Failed to load blog post.".to_string())
        }
    };
    settled(cancel, view)
}

pub async fn load_work_list(
    store: &dyn Collection<PortfolioWork>,
    cancel: &CancellationToken,
) -> Option<ViewState<Vec<WorkCard>>> {
    let view = match store.list(cancel).await {
        Ok(works) if works.is_empty() => ViewState::Empty,
        Ok(works) => ViewState::Content(works.into_iter().map(WorkCard::from).collect()),
        Err(StoreError::Cancelled) => return None,
        Err(e) => {
            tracing::error!("Error fetching works: {}", e);
            ViewState::Error("Failed to load works.".to_string())
        }
    };
    settled(cancel, view)
}

/// A missing document or a failed read falls back to `fallback` by id.
pub async fn load_work_detail(
    store: &dyn Collection<PortfolioWork>,
    id: &str,
    fallback: &[WorkDetail],
    cancel: &CancellationToken,
) -> Option<ViewState<WorkDetail>> {
    let view = match store.get(id, cancel).await {
        Ok(work) => ViewState::Content(WorkDetail::from(work)),
        Err(StoreError::Cancelled) => return None,
        Err(e) => {
            if !matches!(e, StoreError::NotFound) {
                tracing::warn!(id = %id, "Error fetching work, trying fallback: {}", e);
            }
            fallback
                .iter()
                .find(|w| w.id == id)
                .cloned()
                .map_or(ViewState::NotFound, ViewState::Content)
        }
    };
    settled(cancel, view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Author;
    use crate::store::memory::MemoryCollection;
    use async_trait::async_trait;
    use chrono::TimeZone;

    /// Every call fails as if the backend were unreachable.
    struct DownStore;

    #[async_trait]
    impl<D: crate::store::Document> Collection<D> for DownStore {
        async fn get(&self, _id: &str, _cancel: &CancellationToken) -> Result<D, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn list(&self, _cancel: &CancellationToken) -> Result<Vec<D>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn insert(&self, _id: &str, _draft: D::Draft) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn merge(&self, _id: &str, _patch: D::Patch) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn delete(&self, _id: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn post(id: &str) -> BlogPost {
        BlogPost {
            id: id.to_string(),
            title: "Growth loops".to_string(),
            content: "## Growth\n\n**Loops** beat funnels.".to_string(),
            tags: vec!["growth".to_string()],
            image_url: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 5, 9, 0, 0).unwrap(),
            author: Author {
                name: "Ed Itor".to_string(),
                uid: "u1".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_blog_list_states() {
        let cancel = CancellationToken::new();
        let empty = MemoryCollection::<BlogPost>::new();
        assert_eq!(
            load_blog_list(&empty, 150, &cancel).await,
            Some(ViewState::Empty)
        );

        let store = MemoryCollection::with_documents([post("p1")]);
        let Some(ViewState::Content(cards)) = load_blog_list(&store, 150, &cancel).await else {
            panic!("expected content");
        };
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].preview, "Growth Loops beat funnels.");

        assert!(matches!(
            load_blog_list(&DownStore, 150, &cancel).await,
            Some(ViewState::Error(_))
        ));
    }

    #[tokio::test]
    async fn test_blog_detail_renders_and_names_author() {
        let cancel = CancellationToken::new();
        let store = MemoryCollection::with_documents([post("p1")]);

        let Some(ViewState::Content(detail)) = load_blog_detail(&store, "p1", &cancel).await else {
            panic!("expected content");
        };
        assert_eq!(detail.author_name, "Ed Itor");
        assert_eq!(detail.published_on, "January 5, 2025");
        assert!(detail.html.contains("<strong"));

        assert_eq!(
            load_blog_detail(&store, "missing", &cancel).await,
            Some(ViewState::NotFound)
        );
    }

    #[tokio::test]
    async fn test_work_detail_falls_back_to_demo_entries() {
        let cancel = CancellationToken::new();
        let store = MemoryCollection::<PortfolioWork>::new();
        let fallback = demo_works();

        let Some(ViewState::Content(work)) =
            load_work_detail(&store, "demo1", &fallback, &cancel).await
        else {
            panic!("expected fallback content");
        };
        assert_eq!(work.title, "Modern SaaS Dashboard");
        assert_eq!(work.image_url.as_deref(), Some(PLACEHOLDER_IMAGE));

        assert_eq!(
            load_work_detail(&store, "does-not-exist", &fallback, &cancel).await,
            Some(ViewState::NotFound)
        );
    }

    #[tokio::test]
    async fn test_work_detail_fallback_on_failed_read() {
        let cancel = CancellationToken::new();
        let fallback = demo_works();
        assert!(matches!(
            load_work_detail(&DownStore, "demo2", &fallback, &cancel).await,
            Some(ViewState::Content(w)) if w.title == "Mobile Banking App"
        ));
        assert_eq!(
            load_work_detail(&DownStore, "nope", &fallback, &cancel).await,
            Some(ViewState::NotFound)
        );
    }

    #[tokio::test]
    async fn test_stored_work_wins_over_fallback() {
        let stored = PortfolioWork {
            id: "demo1".to_string(),
            title: "Real project".to_string(),
            description: "Line one\nLine two".to_string(),
            image_url: None,
            created_at: Utc::now(),
        };
        let store = MemoryCollection::with_documents([stored]);
        let Some(ViewState::Content(work)) =
            load_work_detail(&store, "demo1", &demo_works(), &CancellationToken::new()).await
        else {
            panic!("expected content");
        };
        assert_eq!(work.title, "Real project");
        assert_eq!(work.description_html, "Line one<br />Line two");
    }

    #[tokio::test]
    async fn test_cancelled_load_yields_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let store = MemoryCollection::with_documents([post("p1")]);
        assert_eq!(load_blog_detail(&store, "p1", &cancel).await, None);
        assert_eq!(load_work_list(&MemoryCollection::<PortfolioWork>::new(), &cancel).await, None);
    }

    #[test]
    fn test_loader_discards_superseded_result() {
        let loader: Loader<u32> = Loader::new();
        let first = loader.begin();
        let second = loader.begin();

        assert!(first.token().is_cancelled());
        assert!(!loader.settle(&first, ViewState::Content(1)));
        assert_eq!(loader.view(), ViewState::Loading);

        assert!(loader.settle(&second, ViewState::Content(2)));
        assert_eq!(loader.view(), ViewState::Content(2));
    }

    #[test]
    fn test_loader_cancel_blocks_settle() {
        let loader: Loader<u32> = Loader::new();
        let ticket = loader.begin();
        loader.cancel();
        assert!(!loader.settle(&ticket, ViewState::Content(1)));
    }

    #[tokio::test]
    async fn test_loader_run() {
        let loader: Loader<Vec<BlogCard>> = Loader::new();
        let store = MemoryCollection::with_documents([post("p1")]);
        let view = loader
            .run(|cancel| async move { load_blog_list(&store, 150, &cancel).await })
            .await;
        assert!(matches!(view, Some(ViewState::Content(ref cards)) if cards.len() == 1));
    }

    #[test]
    fn test_view_state_wire_format() {
        let json = serde_json::to_value(ViewState::Content(vec![1, 2])).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "content", "data": [1, 2] }));
        let json = serde_json::to_value(ViewState::<u8>::NotFound).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "not-found" }));
    }
}
