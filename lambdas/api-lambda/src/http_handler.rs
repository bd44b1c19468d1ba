use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use movie_reviews_shared::{
    auth::{self, AuthDecision},
    response, reviews, AppState,
};
use percent_encoding::percent_decode_str;
use std::sync::Arc;

/// Main Lambda handler - routes review requests by method and path
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    // REST API events carry the stage in the uri; the raw path is the one routes are declared on.
    let path = match event.raw_http_path() {
        "" => event.uri().path(),
        raw => raw,
    };
    tracing::info!("Reviews API invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if *method == Method::OPTIONS {
        return response::preflight();
    }

    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
        .collect();
    let parts: Vec<&str> = segments.iter().map(String::as_str).collect();
    let query = event.query_string_parameters_ref();
    let body = event.body();
    let store = state.store.as_ref();

    match (method, parts.as_slice()) {
        // GET /movies/reviews - every review, optional ?minRating
        (&Method::GET, ["movies", "reviews"]) => reviews::list_all_reviews(store, query).await,
        // POST /movies/reviews - add a review (auth)
        (&Method::POST, ["movies", "reviews"]) => {
            if let Some(denied) = require_auth(&event, &state).await? {
                return Ok(denied);
            }
            reviews::create_review(store, body).await
        }
        // GET /movies/{movieId}/reviews - reviews for one movie, optional ?minRating
        (&Method::GET, ["movies", movie_id, "reviews"]) => {
            reviews::list_movie_reviews(store, Some(*movie_id), query).await
        }
        // GET /movies/{movieId}/reviews/{reviewerNameOrYear}
        (&Method::GET, ["movies", movie_id, "reviews", reviewer_or_year]) => {
            reviews::list_movie_reviews_by_reviewer_or_year(
                store,
                Some(*movie_id),
                Some(*reviewer_or_year),
            )
            .await
        }
        // PUT /movies/{movieId}/reviews/{reviewerName} - update a review (auth)
        (&Method::PUT, ["movies", movie_id, "reviews", reviewer_name]) => {
            if let Some(denied) = require_auth(&event, &state).await? {
                return Ok(denied);
            }
            reviews::update_review(store, Some(*movie_id), Some(*reviewer_name), body).await
        }
        // GET /reviews/{reviewerName} - one reviewer across movies
        (&Method::GET, ["reviews", reviewer_name]) => {
            reviews::list_reviewer_reviews(store, Some(*reviewer_name)).await
        }
        // GET /reviews/{reviewerName}/{movieId}/translation?language=xx
        (&Method::GET, ["reviews", reviewer_name, movie_id, "translation"]) => {
            reviews::get_review_translation(
                store,
                state.translator.as_ref(),
                Some(*reviewer_name),
                Some(*movie_id),
                query,
            )
            .await
        }
        (_, ["movies", "reviews"])
        | (_, ["movies", _, "reviews"])
        | (_, ["movies", _, "reviews", _])
        | (_, ["reviews", _])
        | (_, ["reviews", _, _, "translation"]) => response::method_not_allowed(),
        _ => {
            tracing::warn!("No route matched - Method: {} Path: {}", method, path);
            response::not_found()
        }
    }
}

/// Gate for write routes. Returns the deny response, or `None` when the caller may proceed.
async fn require_auth(event: &Request, state: &AppState) -> Result<Option<Response<Body>>, Error> {
    let cookie_header = event
        .headers()
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");
    let cookie_header = (!cookie_header.is_empty()).then_some(cookie_header.as_str());

    match auth::authorize(state.verifier.as_ref(), cookie_header, &state.cookie_name).await {
        AuthDecision::Allow(claims) => {
            tracing::info!("Write authorized for {} <{}>", claims.sub, claims.email);
            Ok(None)
        }
        AuthDecision::Deny(reason) => {
            tracing::warn!("Write denied: {}", reason);
            response::message(
                StatusCode::FORBIDDEN,
                "User is not authorized to access this resource",
            )
            .map(Some)
        }
    }
}
