//! Named schemas for the optional query strings the endpoints accept.

use lambda_http::aws_lambda_events::query_map::QueryMap;
use thiserror::Error;

pub const MIN_RATING_LOWER: i64 = 0;
pub const MIN_RATING_UPPER: i64 = 10;

const YEAR_LOWER: u16 = 1970;
const YEAR_UPPER: u16 = 2099;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid min rating")]
    MinRating,
    #[error("Invalid language")]
    Language,
}

/// `MovieReviewsQueryParams`: optional integer `minRating` in [0, 10].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MovieReviewsQuery {
    pub min_rating: Option<i64>,
}

/// `TranslateQueryParams`: required target `language` code.
#[derive(Debug, PartialEq, Eq)]
pub struct TranslateQuery {
    pub language: String,
}

impl MovieReviewsQuery {
    /// No query string at all is valid and means "no rating filter".
    pub fn parse(params: Option<&QueryMap>) -> Result<Self, ValidationError> {
        let Some(raw) = params.and_then(|p| p.first("minRating")) else {
            return Ok(Self::default());
        };

        let min_rating = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::MinRating)?;
        if !(MIN_RATING_LOWER..=MIN_RATING_UPPER).contains(&min_rating) {
            return Err(ValidationError::MinRating);
        }

        Ok(Self {
            min_rating: Some(min_rating),
        })
    }
}

impl TranslateQuery {
    pub fn parse(params: Option<&QueryMap>) -> Result<Self, ValidationError> {
        let language = params
            .and_then(|p| p.first("language"))
            .map(str::trim)
            .filter(|l| is_language_code(l))
            .ok_or(ValidationError::Language)?;

        Ok(Self {
            language: language.to_string(),
        })
    }
}

/// `fr`, `pt-PT`, `zh-TW`: letters, optionally a `-` and an alphanumeric subtag.
fn is_language_code(code: &str) -> bool {
    let (primary, subtag) = match code.split_once('-') {
        Some((primary, subtag)) => (primary, Some(subtag)),
        None => (code, None),
    };

    let primary_ok = (2..=3).contains(&primary.len())
        && primary.chars().all(|c| c.is_ascii_alphabetic());
    let subtag_ok = subtag.map_or(true, |s| {
        (2..=4).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric())
    });

    primary_ok && subtag_ok
}

/// How the last segment of `/movies/{movieId}/reviews/{segment}` is interpreted.
#[derive(Debug, PartialEq, Eq)]
pub enum ReviewerOrYear<'a> {
    Year(&'a str),
    Reviewer(&'a str),
}

/// Four ASCII digits within [1970, 2099] is a year; anything else is a reviewer name.
pub fn classify_segment(segment: &str) -> ReviewerOrYear<'_> {
    let is_four_digits = segment.len() == 4 && segment.bytes().all(|b| b.is_ascii_digit());
    if is_four_digits {
        if let Ok(year) = segment.parse::<u16>() {
            if (YEAR_LOWER..=YEAR_UPPER).contains(&year) {
                return ReviewerOrYear::Year(segment);
            }
        }
    }
    ReviewerOrYear::Reviewer(segment)
}

/// Movie ids are positive and written as plain digits, so `12abc`, `+5`, ` 5` and `0` are rejected.
pub fn parse_movie_id(raw: Option<&str>) -> Option<i64> {
    raw.filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|id| *id > 0)
}
