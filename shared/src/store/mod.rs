//! Review storage: one table keyed by `movieId` (partition) and `reviewerName` (sort).

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Review, UpdateReviewRequest};

pub mod dynamo;
pub mod memory;

pub use dynamo::DynamoReviewStore;
pub use memory::InMemoryReviewStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("review not found")]
    NotFound,
    #[error("malformed item: {0}")]
    MalformedItem(String),
    #[error(transparent)]
    Dynamo(#[from] aws_sdk_dynamodb::Error),
}

/// Access to the review table. Implementations hold no per-request state.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Full table scan. No ordering.
    async fn list_all(&self) -> Result<Vec<Review>, StoreError>;

    /// All reviews in one movie's partition. Empty when the movie has none.
    async fn list_by_movie(&self, movie_id: i64) -> Result<Vec<Review>, StoreError>;

    /// Scan filtered on `reviewerName`, across every movie.
    async fn list_by_reviewer(&self, reviewer_name: &str) -> Result<Vec<Review>, StoreError>;

    async fn get(&self, movie_id: i64, reviewer_name: &str) -> Result<Option<Review>, StoreError>;

    /// Unconditional put. An existing review with the same key is replaced.
    async fn create(&self, review: &Review) -> Result<(), StoreError>;

    /// Sets content, rating and reviewDate on an existing item.
    /// Returns `StoreError::NotFound` when the key does not exist.
    async fn update(
        &self,
        movie_id: i64,
        reviewer_name: &str,
        changes: &UpdateReviewRequest,
    ) -> Result<(), StoreError>;
}

pub fn filter_by_rating(reviews: Vec<Review>, min_rating: i64) -> Vec<Review> {
    reviews
        .into_iter()
        .filter(|r| r.rating >= min_rating)
        .collect()
}

pub fn filter_by_reviewer(reviews: Vec<Review>, reviewer_name: &str) -> Vec<Review> {
    reviews
        .into_iter()
        .filter(|r| r.reviewer_name == reviewer_name)
        .collect()
}

/// Keeps reviews whose `reviewDate` starts with the given 4-digit year.
pub fn filter_by_year(reviews: Vec<Review>, year: &str) -> Vec<Review> {
    reviews
        .into_iter()
        .filter(|r| r.review_date.get(..4) == Some(year))
        .collect()
}
