//! In-memory collection used when no database is configured, and in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::{cancellable, sort_newest_first, Collection, Document, StoreError};

pub struct MemoryCollection<D> {
    docs: RwLock<HashMap<String, D>>,
}

impl<D: Document> Default for MemoryCollection<D> {
    fn default() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }
}

impl<D: Document> MemoryCollection<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated collection, keyed by each document's own id.
    pub fn with_documents(docs: impl IntoIterator<Item = D>) -> Self {
        let docs = docs
            .into_iter()
            .map(|d| (d.id().to_string(), d))
            .collect();
        Self {
            docs: RwLock::new(docs),
        }
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }
}

#[async_trait]
impl<D: Document> Collection<D> for MemoryCollection<D> {
    async fn get(&self, id: &str, cancel: &CancellationToken) -> Result<D, StoreError> {
        cancellable(cancel, async {
            self.docs
                .read()
                .await
                .get(id)
                .cloned()
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn list(&self, cancel: &CancellationToken) -> Result<Vec<D>, StoreError> {
        cancellable(cancel, async {
            let mut docs: Vec<D> = self.docs.read().await.values().cloned().collect();
            sort_newest_first(&mut docs);
            Ok::<_, StoreError>(docs)
        })
        .await
    }

    async fn insert(&self, id: &str, draft: D::Draft) -> Result<(), StoreError> {
        let doc = D::from_draft(id.to_string(), draft);
        self.docs.write().await.insert(id.to_string(), doc);
        Ok(())
    }

    async fn merge(&self, id: &str, patch: D::Patch) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;
        let doc = docs.get_mut(id).ok_or(StoreError::NotFound)?;
        doc.merge(patch);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.docs
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
