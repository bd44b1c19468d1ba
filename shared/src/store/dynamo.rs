use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::{types::AttributeValue, Client as DynamoClient};

use super::{ReviewStore, StoreError};
use crate::types::{Review, UpdateReviewRequest};

type Item = HashMap<String, AttributeValue>;

/// DynamoDB-backed review table.
#[derive(Clone)]
pub struct DynamoReviewStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoReviewStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Scan every page, optionally with a filter expression bound to `values`.
    async fn scan_all(
        &self,
        filter_expression: Option<&str>,
        values: &[(&str, AttributeValue)],
    ) -> Result<Vec<Review>, StoreError> {
        let mut reviews = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let mut builder = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key.take());

            if let Some(expr) = filter_expression {
                builder = builder.filter_expression(expr);
            }
            for (name, value) in values {
                builder = builder.expression_attribute_values(*name, value.clone());
            }

            let output = builder
                .send()
                .await
                .map_err(aws_sdk_dynamodb::Error::from)?;

            for item in output.items() {
                reviews.push(review_from_item(item)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(reviews)
    }
}

#[async_trait]
impl ReviewStore for DynamoReviewStore {
    async fn list_all(&self) -> Result<Vec<Review>, StoreError> {
        self.scan_all(None, &[]).await
    }

    async fn list_by_movie(&self, movie_id: i64) -> Result<Vec<Review>, StoreError> {
        let mut reviews = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("movieId = :m")
                .expression_attribute_values(":m", AttributeValue::N(movie_id.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(aws_sdk_dynamodb::Error::from)?;

            for item in output.items() {
                reviews.push(review_from_item(item)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(reviews)
    }

    async fn list_by_reviewer(&self, reviewer_name: &str) -> Result<Vec<Review>, StoreError> {
        self.scan_all(
            Some("reviewerName = :rn"),
            &[(":rn", AttributeValue::S(reviewer_name.to_string()))],
        )
        .await
    }

    async fn get(&self, movie_id: i64, reviewer_name: &str) -> Result<Option<Review>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("movieId", AttributeValue::N(movie_id.to_string()))
            .key("reviewerName", AttributeValue::S(reviewer_name.to_string()))
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;

        result.item().map(review_from_item).transpose()
    }

    async fn create(&self, review: &Review) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(review_to_item(review)))
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;

        Ok(())
    }

    async fn update(
        &self,
        movie_id: i64,
        reviewer_name: &str,
        changes: &UpdateReviewRequest,
    ) -> Result<(), StoreError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("movieId", AttributeValue::N(movie_id.to_string()))
            .key("reviewerName", AttributeValue::S(reviewer_name.to_string()))
            .update_expression("SET content = :content, rating = :rating, reviewDate = :reviewDate")
            .condition_expression("attribute_exists(movieId) AND attribute_exists(reviewerName)")
            .expression_attribute_values(":content", AttributeValue::S(changes.content.clone()))
            .expression_attribute_values(":rating", AttributeValue::N(changes.rating.to_string()))
            .expression_attribute_values(
                ":reviewDate",
                AttributeValue::S(changes.review_date.clone()),
            )
            .send()
            .await;

        match result.map_err(aws_sdk_dynamodb::Error::from) {
            Ok(_) => Ok(()),
            Err(aws_sdk_dynamodb::Error::ConditionalCheckFailedException(_)) => {
                Err(StoreError::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub(crate) fn review_to_item(review: &Review) -> Item {
    HashMap::from([
        (
            "movieId".to_string(),
            AttributeValue::N(review.movie_id.to_string()),
        ),
        (
            "reviewerName".to_string(),
            AttributeValue::S(review.reviewer_name.clone()),
        ),
        (
            "reviewDate".to_string(),
            AttributeValue::S(review.review_date.clone()),
        ),
        (
            "rating".to_string(),
            AttributeValue::N(review.rating.to_string()),
        ),
        (
            "content".to_string(),
            AttributeValue::S(review.content.clone()),
        ),
    ])
}

fn string_attr(item: &Item, field: &str) -> Result<String, StoreError> {
    item.get(field)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .ok_or_else(|| StoreError::MalformedItem(field.to_string()))
}

fn number_attr(item: &Item, field: &str) -> Result<i64, StoreError> {
    item.get(field)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse::<i64>().ok())
        .ok_or_else(|| StoreError::MalformedItem(field.to_string()))
}

pub(crate) fn review_from_item(item: &Item) -> Result<Review, StoreError> {
    Ok(Review {
        movie_id: number_attr(item, "movieId")?,
        reviewer_name: string_attr(item, "reviewerName")?,
        review_date: string_attr(item, "reviewDate")?,
        rating: number_attr(item, "rating")?,
        content: string_attr(item, "content")?,
    })
}
