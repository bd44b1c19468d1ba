use serde::{Deserialize, Serialize};

// ========== REVIEW ==========
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub movie_id: i64,
    pub reviewer_name: String,
    pub review_date: String, // ISO date, e.g. 2021-05-01
    pub rating: i64,
    pub content: String,
}

/// Fields the update endpoint is allowed to touch. Key fields are never part of it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
    pub content: String,
    pub rating: i64,
    pub review_date: String,
}

// ========== RESPONSES ==========
#[derive(Debug, Serialize)]
pub struct ReviewList<'a> {
    pub data: &'a [Review],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResponse {
    pub translated_message: String,
}

// ========== AUTH ==========
/// Identity attributes taken from a verified token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AuthClaims {
    pub sub: String,
    pub email: String,
}
