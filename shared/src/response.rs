use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;

/// Wrap a status and a serializable body into the JSON envelope every endpoint returns.
pub fn api_response<T: Serialize + ?Sized>(
    status: StatusCode,
    body: &T,
) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(body)?.into())
        .map_err(Box::new)?)
}

/// `{"Message": ...}` body used for validation, not-found and deny outcomes.
pub fn message(status: StatusCode, text: &str) -> Result<Response<Body>, Error> {
    api_response(status, &serde_json::json!({ "Message": text }))
}

/// `{"error": ...}` body for failures nobody anticipated.
pub fn internal_error(err: &dyn std::fmt::Display) -> Result<Response<Body>, Error> {
    tracing::error!("Unhandled failure: {}", err);
    api_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &serde_json::json!({ "error": err.to_string() }),
    )
}

pub fn not_found() -> Result<Response<Body>, Error> {
    message(StatusCode::NOT_FOUND, "Not found")
}

pub fn method_not_allowed() -> Result<Response<Body>, Error> {
    message(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Answer a CORS preflight.
pub fn preflight() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET,POST,PUT,OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type,Cookie")
        .header("Access-Control-Allow-Credentials", "true")
        .body(Body::Empty)
        .map_err(Box::new)?)
}
