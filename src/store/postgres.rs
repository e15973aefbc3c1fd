//! PostgreSQL backend; one table per collection.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use super::{cancellable, Collection, StoreError};
use crate::db::models::{
    BlogPatch, BlogPost, BlogRow, NewBlogPost, NewPortfolioWork, PortfolioWork, WorkPatch,
};

const BLOG_COLUMNS: &str =
    "id, title, content, tags, image_url, created_at, author_name, author_uid";
const WORK_COLUMNS: &str = "id, title, description, image_url, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

/// Splits a patch image into the "column is written" flag and its new value.
fn image_update(patch: Option<Option<String>>) -> (bool, Option<String>) {
    match patch {
        Some(url) => (true, url),
        None => (false, None),
    }
}

fn affected(rows: u64) -> Result<(), StoreError> {
    if rows == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl Collection<BlogPost> for PgStore {
    async fn get(&self, id: &str, cancel: &CancellationToken) -> Result<BlogPost, StoreError> {
        cancellable(cancel, async {
            let row = sqlx::query_as::<_, BlogRow>(&format!(
                "SELECT {} FROM blogs WHERE id = $1",
                BLOG_COLUMNS
            ))
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;
            row.map(BlogPost::from).ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn list(&self, cancel: &CancellationToken) -> Result<Vec<BlogPost>, StoreError> {
        cancellable(cancel, async {
            let rows = sqlx::query_as::<_, BlogRow>(&format!(
                "SELECT {} FROM blogs ORDER BY created_at DESC, id DESC",
                BLOG_COLUMNS
            ))
            .fetch_all(self.pool.as_ref())
            .await?;
            Ok::<_, StoreError>(rows.into_iter().map(BlogPost::from).collect())
        })
        .await
    }

    async fn insert(&self, id: &str, draft: NewBlogPost) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO blogs (id, title, content, tags, image_url, created_at, author_name, author_uid)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(&draft.tags)
        .bind(&draft.image_url)
        .bind(draft.created_at)
        .bind(&draft.author.name)
        .bind(&draft.author.uid)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn merge(&self, id: &str, patch: BlogPatch) -> Result<(), StoreError> {
        let (set_image, image_url) = image_update(patch.image_url);
        let result = sqlx::query(
            r#"
            UPDATE blogs
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                tags = COALESCE($4, tags),
                image_url = CASE WHEN $6 THEN $5 ELSE image_url END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.content)
        .bind(&patch.tags)
        .bind(&image_url)
        .bind(set_image)
        .execute(self.pool.as_ref())
        .await?;
        affected(result.rows_affected())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;
        affected(result.rows_affected())
    }
}

#[async_trait]
impl Collection<PortfolioWork> for PgStore {
    async fn get(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<PortfolioWork, StoreError> {
        cancellable(cancel, async {
            sqlx::query_as::<_, PortfolioWork>(&format!(
                "SELECT {} FROM latest_works WHERE id = $1",
                WORK_COLUMNS
            ))
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn list(&self, cancel: &CancellationToken) -> Result<Vec<PortfolioWork>, StoreError> {
        cancellable(cancel, async {
            let works = sqlx::query_as::<_, PortfolioWork>(&format!(
                "SELECT {} FROM latest_works ORDER BY created_at DESC, id DESC",
                WORK_COLUMNS
            ))
            .fetch_all(self.pool.as_ref())
            .await?;
            Ok::<_, StoreError>(works)
        })
        .await
    }

    async fn insert(&self, id: &str, draft: NewPortfolioWork) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO latest_works (id, title, description, image_url, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.image_url)
        .bind(draft.created_at)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn merge(&self, id: &str, patch: WorkPatch) -> Result<(), StoreError> {
        let (set_image, image_url) = image_update(patch.image_url);
        let result = sqlx::query(
            r#"
            UPDATE latest_works
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                image_url = CASE WHEN $5 THEN $4 ELSE image_url END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(&image_url)
        .bind(set_image)
        .execute(self.pool.as_ref())
        .await?;
        affected(result.rows_affected())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM latest_works WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;
        affected(result.rows_affected())
    }
}
