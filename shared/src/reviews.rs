use std::future::Future;

use lambda_http::{aws_lambda_events::query_map::QueryMap, http::StatusCode, Body, Error, Response};
use serde::de::DeserializeOwned;

use crate::response::{api_response, internal_error, message};
use crate::store::{filter_by_rating, filter_by_reviewer, filter_by_year, ReviewStore, StoreError};
use crate::translation::Translator;
use crate::types::{Review, ReviewList, TranslationResponse, UpdateReviewRequest};
use crate::validation::{
    classify_segment, parse_movie_id, MovieReviewsQuery, ReviewerOrYear, TranslateQuery,
};

/// Anything a handler body did not turn into a response becomes a 500 `{"error": ...}`.
async fn catch_all<F>(handler: F) -> Result<Response<Body>, Error>
where
    F: Future<Output = Result<Response<Body>, Error>>,
{
    match handler.await {
        Ok(resp) => Ok(resp),
        Err(e) => internal_error(&e),
    }
}

fn list_response(reviews: &[Review]) -> Result<Response<Body>, Error> {
    api_response(StatusCode::OK, &ReviewList { data: reviews })
}

enum BodyError {
    Missing,
    Invalid(String),
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, BodyError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(BodyError::Missing);
    }
    serde_json::from_slice(body).map_err(|e| BodyError::Invalid(e.to_string()))
}

fn body_error_response(err: BodyError) -> Result<Response<Body>, Error> {
    match err {
        BodyError::Missing => message(StatusCode::BAD_REQUEST, "Missing request body"),
        BodyError::Invalid(e) => {
            tracing::warn!("Rejected request body: {}", e);
            message(
                StatusCode::BAD_REQUEST,
                &format!("Invalid request body: {}", e),
            )
        }
    }
}

/// GET /movies/reviews
pub async fn list_all_reviews(
    store: &dyn ReviewStore,
    query: Option<&QueryMap>,
) -> Result<Response<Body>, Error> {
    catch_all(async move {
        let params = match MovieReviewsQuery::parse(query) {
            Ok(params) => params,
            Err(e) => return message(StatusCode::BAD_REQUEST, &e.to_string()),
        };

        let reviews = store.list_all().await?;
        if reviews.is_empty() {
            return message(StatusCode::NOT_FOUND, "No reviews found");
        }

        let reviews = match params.min_rating {
            Some(min_rating) => filter_by_rating(reviews, min_rating),
            None => reviews,
        };
        tracing::info!("Returning {} reviews", reviews.len());
        list_response(&reviews)
    })
    .await
}

/// GET /movies/{movieId}/reviews
pub async fn list_movie_reviews(
    store: &dyn ReviewStore,
    movie_id: Option<&str>,
    query: Option<&QueryMap>,
) -> Result<Response<Body>, Error> {
    catch_all(async move {
        let Some(movie_id) = parse_movie_id(movie_id) else {
            return message(StatusCode::NOT_FOUND, "MovieId is NaN");
        };
        let params = match MovieReviewsQuery::parse(query) {
            Ok(params) => params,
            Err(e) => return message(StatusCode::BAD_REQUEST, &e.to_string()),
        };

        let reviews = store.list_by_movie(movie_id).await?;
        if reviews.is_empty() {
            return message(StatusCode::NOT_FOUND, "Invalid movieId");
        }

        let reviews = match params.min_rating {
            Some(min_rating) => filter_by_rating(reviews, min_rating),
            None => reviews,
        };
        list_response(&reviews)
    })
    .await
}

/// GET /movies/{movieId}/reviews/{reviewerNameOrYear}
pub async fn list_movie_reviews_by_reviewer_or_year(
    store: &dyn ReviewStore,
    movie_id: Option<&str>,
    segment: Option<&str>,
) -> Result<Response<Body>, Error> {
    catch_all(async move {
        let Some(movie_id) = parse_movie_id(movie_id) else {
            return message(StatusCode::NOT_FOUND, "MovieId is NaN");
        };
        let Some(segment) = segment.filter(|s| !s.is_empty()) else {
            return message(StatusCode::NOT_FOUND, "Reviewer name or year is missing");
        };

        let reviews = store.list_by_movie(movie_id).await?;
        if reviews.is_empty() {
            return message(StatusCode::NOT_FOUND, "Invalid movieId");
        }

        let filtered = match classify_segment(segment) {
            ReviewerOrYear::Year(year) => filter_by_year(reviews, year),
            ReviewerOrYear::Reviewer(name) => filter_by_reviewer(reviews, name),
        };
        list_response(&filtered)
    })
    .await
}

/// GET /reviews/{reviewerName}
pub async fn list_reviewer_reviews(
    store: &dyn ReviewStore,
    reviewer_name: Option<&str>,
) -> Result<Response<Body>, Error> {
    catch_all(async move {
        let Some(reviewer_name) = reviewer_name.filter(|s| !s.is_empty()) else {
            return message(StatusCode::NOT_FOUND, "Reviewer name is missing");
        };

        let reviews = store.list_by_reviewer(reviewer_name).await?;
        if reviews.is_empty() {
            return message(StatusCode::NOT_FOUND, "Invalid reviewerName");
        }

        list_response(&reviews)
    })
    .await
}

/// GET /reviews/{reviewerName}/{movieId}/translation?language=xx
pub async fn get_review_translation(
    store: &dyn ReviewStore,
    translator: &dyn Translator,
    reviewer_name: Option<&str>,
    movie_id: Option<&str>,
    query: Option<&QueryMap>,
) -> Result<Response<Body>, Error> {
    catch_all(async move {
        let params = match TranslateQuery::parse(query) {
            Ok(params) => params,
            Err(e) => return message(StatusCode::BAD_REQUEST, &e.to_string()),
        };
        let Some(movie_id) = parse_movie_id(movie_id) else {
            return message(StatusCode::NOT_FOUND, "Missing movieId");
        };
        let Some(reviewer_name) = reviewer_name.filter(|s| !s.is_empty()) else {
            return message(StatusCode::NOT_FOUND, "Missing reviewerName");
        };

        let Some(review) = store.get(movie_id, reviewer_name).await? else {
            return message(StatusCode::NOT_FOUND, "Unable to find review");
        };
        if review.content.trim().is_empty() {
            return message(StatusCode::BAD_REQUEST, "Missing text from the review");
        }

        match translator.translate(&review.content, &params.language).await {
            Ok(translated_message) => api_response(
                StatusCode::OK,
                &TranslationResponse { translated_message },
            ),
            Err(e) => {
                tracing::error!("Error in translation: {}", e);
                message(StatusCode::BAD_REQUEST, "Unable to translate")
            }
        }
    })
    .await
}

/// POST /movies/reviews
pub async fn create_review(store: &dyn ReviewStore, body: &[u8]) -> Result<Response<Body>, Error> {
    catch_all(async move {
        let review: Review = match parse_body(body) {
            Ok(review) => review,
            Err(e) => return body_error_response(e),
        };

        // Same key replaces the stored review.
        store.create(&review).await?;
        tracing::info!(
            "Stored review for movie {} by {}",
            review.movie_id,
            review.reviewer_name
        );

        api_response(StatusCode::OK, &serde_json::json!({"message": "Review added"}))
    })
    .await
}

/// PUT /movies/{movieId}/reviews/{reviewerName}
pub async fn update_review(
    store: &dyn ReviewStore,
    movie_id: Option<&str>,
    reviewer_name: Option<&str>,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    catch_all(async move {
        let Some(movie_id) = parse_movie_id(movie_id) else {
            return message(StatusCode::NOT_FOUND, "MovieId is NaN");
        };

        let reviews = store.list_by_movie(movie_id).await?;
        if reviews.is_empty() {
            return message(StatusCode::NOT_FOUND, "Invalid movieId");
        }

        let Some(reviewer_name) = reviewer_name.filter(|s| !s.is_empty()) else {
            return message(StatusCode::NOT_FOUND, "Reviewer name is missing");
        };
        let Some(existing) = reviews.iter().find(|r| r.reviewer_name == reviewer_name) else {
            return message(StatusCode::NOT_FOUND, "Review not found for this reviewer");
        };

        let changes: UpdateReviewRequest = match parse_body(body) {
            Ok(changes) => changes,
            Err(e) => return body_error_response(e),
        };

        match store
            .update(existing.movie_id, &existing.reviewer_name, &changes)
            .await
        {
            Ok(()) => {}
            // Removed between the lookup and the write.
            Err(StoreError::NotFound) => {
                return message(StatusCode::NOT_FOUND, "Review not found for this reviewer")
            }
            Err(e) => return Err(e.into()),
        }

        api_response(StatusCode::OK, &serde_json::json!({"message": "Review updated"}))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryReviewStore;
    use crate::translation::TranslateError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn review(movie_id: i64, name: &str, date: &str, rating: i64) -> Review {
        Review {
            movie_id,
            reviewer_name: name.to_string(),
            review_date: date.to_string(),
            rating,
            content: format!("{} liked it", name),
        }
    }

    fn seeded() -> InMemoryReviewStore {
        InMemoryReviewStore::with_reviews([
            review(1, "alice", "2021-05-01", 8),
            review(1, "bob", "2022-03-10", 3),
            review(1, "2021", "2019-01-01", 6),
            review(2, "alice", "2020-07-07", 10),
        ])
    }

    fn query(pairs: &[(&str, &str)]) -> QueryMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<String, String>>()
            .into()
    }

    fn json(resp: &Response<Body>) -> serde_json::Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    fn names(resp: &Response<Body>) -> Vec<String> {
        let mut names: Vec<String> = json(resp)["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["reviewerName"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        names
    }

    struct FailingStore;

    #[async_trait]
    impl ReviewStore for FailingStore {
        async fn list_all(&self) -> Result<Vec<Review>, StoreError> {
            Err(StoreError::MalformedItem("movieId".to_string()))
        }
        async fn list_by_movie(&self, _: i64) -> Result<Vec<Review>, StoreError> {
            Err(StoreError::MalformedItem("movieId".to_string()))
        }
        async fn list_by_reviewer(&self, _: &str) -> Result<Vec<Review>, StoreError> {
            Err(StoreError::MalformedItem("movieId".to_string()))
        }
        async fn get(&self, _: i64, _: &str) -> Result<Option<Review>, StoreError> {
            Err(StoreError::MalformedItem("movieId".to_string()))
        }
        async fn create(&self, _: &Review) -> Result<(), StoreError> {
            Err(StoreError::MalformedItem("movieId".to_string()))
        }
        async fn update(&self, _: i64, _: &str, _: &UpdateReviewRequest) -> Result<(), StoreError> {
            Err(StoreError::MalformedItem("movieId".to_string()))
        }
    }

    struct EchoTranslator;

    #[async_trait]
    impl Translator for EchoTranslator {
        async fn translate(&self, text: &str, target: &str) -> Result<String, TranslateError> {
            Ok(format!("[{}] {}", target, text))
        }
    }

    struct DownTranslator;

    #[async_trait]
    impl Translator for DownTranslator {
        async fn translate(&self, _: &str, _: &str) -> Result<String, TranslateError> {
            Err(TranslateError::Service("throttled".to_string()))
        }
    }

    #[tokio::test]
    async fn test_list_all_with_and_without_min_rating() {
        let store = seeded();
        let resp = list_all_reviews(&store, None).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(&resp)["data"].as_array().unwrap().len(), 4);

        for n in 0..=10 {
            let q = query(&[("minRating", &n.to_string())]);
            let resp = list_all_reviews(&store, Some(&q)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let ratings: Vec<i64> = json(&resp)["data"]
                .as_array()
                .unwrap()
                .iter()
                .map(|r| r["rating"].as_i64().unwrap())
                .collect();
            let expected = [8, 3, 6, 10].iter().filter(|r| **r >= n).count();
            assert_eq!(ratings.len(), expected);
            assert!(ratings.iter().all(|r| *r >= n));
        }
    }

    #[tokio::test]
    async fn test_list_all_rejects_bad_min_rating_and_empty_table() {
        let q = query(&[("minRating", "lots")]);
        let resp = list_all_reviews(&seeded(), Some(&q)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(&resp)["Message"], "Invalid min rating");

        let resp = list_all_reviews(&InMemoryReviewStore::new(), None).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_query_short_circuits_before_store() {
        let q = query(&[("minRating", "-3")]);
        let resp = list_all_reviews(&FailingStore, Some(&q)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = list_movie_reviews(&FailingStore, Some("1"), Some(&q)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_movie_reviews() {
        let store = seeded();
        let resp = list_movie_reviews(&store, Some("1"), None).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(names(&resp), vec!["2021", "alice", "bob"]);

        let q = query(&[("minRating", "6")]);
        let resp = list_movie_reviews(&store, Some("1"), Some(&q)).await.unwrap();
        assert_eq!(names(&resp), vec!["2021", "alice"]);

        for raw in ["abc", "0", "+1"] {
            let resp = list_movie_reviews(&store, Some(raw), None).await.unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            assert_eq!(json(&resp)["Message"], "MovieId is NaN", "{raw}");
        }

        let resp = list_movie_reviews(&store, None, None).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_movie_without_reviews_is_not_found_everywhere() {
        let store = seeded();
        let q = query(&[("minRating", "0")]);

        let resp = list_movie_reviews(&store, Some("99"), None).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = list_movie_reviews(&store, Some("99"), Some(&q)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = list_movie_reviews_by_reviewer_or_year(&store, Some("99"), Some("alice"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = list_movie_reviews_by_reviewer_or_year(&store, Some("99"), Some("2021"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reviewer_or_year_classification() {
        let store = seeded();

        // "2021" is a year, so it matches alice's 2021-05-01 review and not the reviewer named "2021".
        let resp = list_movie_reviews_by_reviewer_or_year(&store, Some("1"), Some("2021"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(names(&resp), vec!["alice"]);

        let resp = list_movie_reviews_by_reviewer_or_year(&store, Some("1"), Some("bob"))
            .await
            .unwrap();
        assert_eq!(names(&resp), vec!["bob"]);

        // The movie has reviews, so an empty match is still a 200.
        for segment in ["1969", "carol"] {
            let resp = list_movie_reviews_by_reviewer_or_year(&store, Some("1"), Some(segment))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{segment}");
            assert_eq!(json(&resp)["data"], serde_json::json!([]));
        }

        let resp = list_movie_reviews_by_reviewer_or_year(&store, Some("99"), Some("carol"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_reviewer_reviews_across_movies() {
        let store = seeded();
        let resp = list_reviewer_reviews(&store, Some("alice")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(&resp)["data"].as_array().unwrap().len(), 2);

        let resp = list_reviewer_reviews(&store, Some("nobody")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(&resp)["Message"], "Invalid reviewerName");

        let resp = list_reviewer_reviews(&store, None).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_translation() {
        let store = seeded();
        let q = query(&[("language", "fr")]);

        let resp = get_review_translation(&store, &EchoTranslator, Some("alice"), Some("1"), Some(&q))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(&resp)["translatedMessage"], "[fr] alice liked it");

        let resp = get_review_translation(&store, &EchoTranslator, Some("alice"), Some("1"), None)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(&resp)["Message"], "Invalid language");

        let resp = get_review_translation(&store, &EchoTranslator, Some("carol"), Some("1"), Some(&q))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(&resp)["Message"], "Unable to find review");

        let resp = get_review_translation(&store, &EchoTranslator, Some("alice"), Some("x"), Some(&q))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = get_review_translation(&store, &DownTranslator, Some("alice"), Some("1"), Some(&q))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(&resp)["Message"], "Unable to translate");
    }

    #[tokio::test]
    async fn test_create_and_update() {
        let store = InMemoryReviewStore::new();
        let body = br#"{"movieId":1,"reviewerName":"alice","rating":8,"content":"great","reviewDate":"2021-05-01"}"#;
        let resp = create_review(&store, body).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(&resp)["message"], "Review added");

        let update = br#"{"content":"ok","rating":5,"reviewDate":"2022-01-01"}"#;
        let resp = update_review(&store, Some("1"), Some("alice"), update).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let stored = store.get(1, "alice").await.unwrap().unwrap();
        assert_eq!(stored, review_with(1, "alice", "2022-01-01", 5, "ok"));
    }

    fn review_with(movie_id: i64, name: &str, date: &str, rating: i64, content: &str) -> Review {
        Review {
            content: content.to_string(),
            ..review(movie_id, name, date, rating)
        }
    }

    #[tokio::test]
    async fn test_create_rejects_missing_or_bad_body() {
        let store = InMemoryReviewStore::new();
        let resp = create_review(&store, b"").await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(&resp)["Message"], "Missing request body");

        let resp = create_review(&store, br#"{"movieId":"one"}"#).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_not_found_paths() {
        let store = seeded();
        let update = br#"{"content":"ok","rating":5,"reviewDate":"2022-01-01"}"#;

        let resp = update_review(&store, Some("NaN"), Some("alice"), update).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = update_review(&store, Some("99"), Some("alice"), update).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = update_review(&store, Some("1"), Some("carol"), update).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = update_review(&store, Some("1"), Some("alice"), b"").await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let untouched = store.get(1, "alice").await.unwrap().unwrap();
        assert_eq!(untouched.rating, 8);
    }

    #[tokio::test]
    async fn test_store_failure_becomes_internal_error() {
        let resp = list_all_reviews(&FailingStore, None).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(&resp)["error"], "malformed item: movieId");

        let body = br#"{"movieId":1,"reviewerName":"alice","rating":8,"content":"great","reviewDate":"2021-05-01"}"#;
        let resp = create_review(&FailingStore, body).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
