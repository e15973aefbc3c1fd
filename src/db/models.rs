//! Document models for the `blogs` and `latest_works` collections, plus the
//! row types the PostgreSQL backend reads them through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Denormalized copy of the identity that created a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub uid: String,
}

/// Blog post document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: Author,
}

/// Payload written at a freshly generated id
#[derive(Debug, Clone)]
pub struct NewBlogPost {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: Author,
}

/// Fields merged into an existing post; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct BlogPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    /// `Some(None)` clears the image
    pub image_url: Option<Option<String>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct BlogRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author_name: String,
    pub author_uid: String,
}

impl From<BlogRow> for BlogPost {
    fn from(row: BlogRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            tags: row.tags,
            image_url: row.image_url,
            created_at: row.created_at,
            author: Author {
                name: row.author_name,
                uid: row.author_uid,
            },
        }
    }
}

/// Latest-works showcase entry
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioWork {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPortfolioWork {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct WorkPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` clears the image
    pub image_url: Option<Option<String>>,
}

/// Row read by the PostgreSQL identity provider
#[derive(Debug, Clone, FromRow)]
pub struct AdminUserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub is_active: bool,
    pub login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
}
