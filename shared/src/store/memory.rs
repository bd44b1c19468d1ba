use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{ReviewStore, StoreError};
use crate::types::{Review, UpdateReviewRequest};

/// Map-backed store with the same key semantics as the table. Used by tests and local runs.
#[derive(Default)]
pub struct InMemoryReviewStore {
    items: RwLock<BTreeMap<(i64, String), Review>>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reviews(reviews: impl IntoIterator<Item = Review>) -> Self {
        let store = Self::new();
        {
            let mut items = store.write();
            for review in reviews {
                items.insert((review.movie_id, review.reviewer_name.clone()), review);
            }
        }
        store
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<(i64, String), Review>> {
        self.items.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<(i64, String), Review>> {
        self.items.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn list_all(&self) -> Result<Vec<Review>, StoreError> {
        Ok(self.read().values().cloned().collect())
    }

    async fn list_by_movie(&self, movie_id: i64) -> Result<Vec<Review>, StoreError> {
        Ok(self
            .read()
            .values()
            .filter(|r| r.movie_id == movie_id)
            .cloned()
            .collect())
    }

    async fn list_by_reviewer(&self, reviewer_name: &str) -> Result<Vec<Review>, StoreError> {
        Ok(self
            .read()
            .values()
            .filter(|r| r.reviewer_name == reviewer_name)
            .cloned()
            .collect())
    }

    async fn get(&self, movie_id: i64, reviewer_name: &str) -> Result<Option<Review>, StoreError> {
        Ok(self
            .read()
            .get(&(movie_id, reviewer_name.to_string()))
            .cloned())
    }

    async fn create(&self, review: &Review) -> Result<(), StoreError> {
        self.write().insert(
            (review.movie_id, review.reviewer_name.clone()),
            review.clone(),
        );
        Ok(())
    }

    async fn update(
        &self,
        movie_id: i64,
        reviewer_name: &str,
        changes: &UpdateReviewRequest,
    ) -> Result<(), StoreError> {
        let mut items = self.write();
        let review = items
            .get_mut(&(movie_id, reviewer_name.to_string()))
            .ok_or(StoreError::NotFound)?;
        review.content = changes.content.clone();
        review.rating = changes.rating;
        review.review_date = changes.review_date.clone();
        Ok(())
    }
}
