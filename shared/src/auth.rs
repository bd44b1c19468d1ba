//! Cookie-borne JWT verification against the user pool's published key set.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rsa::{
    pkcs1v15::{Signature, VerifyingKey},
    signature::Verifier,
    BigUint, RsaPublicKey,
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::types::AuthClaims;

const EXPECTED_ALGORITHM: &str = "RS256";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no Cookie header")]
    MissingCookie,
    #[error("no {0} cookie")]
    MissingToken(String),
    #[error("failed to fetch key set: {0}")]
    KeySetFetch(String),
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("unsupported algorithm {0}")]
    UnsupportedAlgorithm(String),
    #[error("no key matches the token")]
    UnknownKey,
    #[error("unusable key: {0}")]
    InvalidKey(String),
    #[error("signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token issued for another client")]
    AudienceMismatch,
}

// ========== KEY SET ==========
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kid: String,
    pub kty: String,
    #[serde(default)]
    pub alg: Option<String>,
    pub n: String,
    pub e: String,
    #[serde(rename = "use", default)]
    pub key_use: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    aud: Option<serde_json::Value>,
    #[serde(default)]
    client_id: Option<String>,
}

/// Split a Cookie header into `name -> value`. Pairs are `;`-separated and trimmed.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let pair = pair.trim();
            if pair.is_empty() {
                return None;
            }
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Pick the key named by the token's `kid`. Tokens without a `kid` fall back to the first key.
fn select_key<'a>(jwks: &'a Jwks, kid: Option<&str>) -> Result<&'a Jwk, AuthError> {
    match kid {
        Some(kid) => jwks.keys.iter().find(|k| k.kid == kid),
        None => jwks.keys.first(),
    }
    .ok_or(AuthError::UnknownKey)
}

fn decode_segment(segment: &str, what: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::Malformed(format!("{}: {}", what, e)))
}

fn public_key(jwk: &Jwk) -> Result<RsaPublicKey, AuthError> {
    if jwk.kty != "RSA" {
        return Err(AuthError::InvalidKey(format!("kty {}", jwk.kty)));
    }
    let n = URL_SAFE_NO_PAD
        .decode(&jwk.n)
        .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
    let e = URL_SAFE_NO_PAD
        .decode(&jwk.e)
        .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
    RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
        .map_err(|e| AuthError::InvalidKey(e.to_string()))
}

fn audience_matches(payload: &TokenPayload, client_id: &str) -> bool {
    let aud_matches = match &payload.aud {
        Some(serde_json::Value::String(aud)) => aud == client_id,
        Some(serde_json::Value::Array(auds)) => auds.iter().any(|a| a.as_str() == Some(client_id)),
        _ => false,
    };
    aud_matches || payload.client_id.as_deref() == Some(client_id)
}

/// Verify an RS256 compact JWT against a key set and return its identity claims.
///
/// `now` is a unix timestamp in seconds. When `client_id` is given the token must
/// name it in `aud` (id tokens) or `client_id` (access tokens).
pub fn verify_token(
    token: &str,
    jwks: &Jwks,
    now: i64,
    client_id: Option<&str>,
) -> Result<AuthClaims, AuthError> {
    let mut parts = token.split('.');
    let (header_b64, payload_b64, signature_b64) =
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => return Err(AuthError::Malformed("expected three segments".to_string())),
        };

    let header: TokenHeader = serde_json::from_slice(&decode_segment(header_b64, "header")?)
        .map_err(|e| AuthError::Malformed(format!("header: {}", e)))?;
    if header.alg != EXPECTED_ALGORITHM {
        return Err(AuthError::UnsupportedAlgorithm(header.alg));
    }

    let jwk = select_key(jwks, header.kid.as_deref())?;
    let verifying_key = VerifyingKey::<Sha256>::new(public_key(jwk)?);
    let signature_bytes = decode_segment(signature_b64, "signature")?;
    let signature = Signature::try_from(signature_bytes.as_slice())
        .map_err(|_| AuthError::BadSignature)?;

    let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
    verifying_key
        .verify(signing_input.as_bytes(), &signature)
        .map_err(|_| AuthError::BadSignature)?;

    let payload: TokenPayload = serde_json::from_slice(&decode_segment(payload_b64, "payload")?)
        .map_err(|e| AuthError::Malformed(format!("payload: {}", e)))?;

    if let Some(exp) = payload.exp {
        if exp <= now {
            return Err(AuthError::Expired);
        }
    }
    if let Some(client_id) = client_id {
        if !audience_matches(&payload, client_id) {
            return Err(AuthError::AudienceMismatch);
        }
    }

    let sub = payload
        .sub
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::Malformed("missing sub".to_string()))?;

    Ok(AuthClaims {
        sub,
        email: payload.email.unwrap_or_default(),
    })
}

// ========== VERIFIERS ==========
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthClaims, AuthError>;
}

/// Verifies against the Cognito user pool key set, fetched fresh for every token.
pub struct CognitoTokenVerifier {
    http: reqwest::Client,
    jwks_url: String,
    client_id: Option<String>,
}

impl CognitoTokenVerifier {
    pub fn new(http: reqwest::Client, jwks_url: String, client_id: Option<String>) -> Self {
        Self {
            http,
            jwks_url,
            client_id,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(
            reqwest::Client::new(),
            config.jwks_url()?,
            config.client_id.clone(),
        ))
    }

    // TODO: cache the key set across invocations and refetch only on an unknown `kid`.
    async fn fetch_jwks(&self) -> Result<Jwks, AuthError> {
        self.http
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AuthError::KeySetFetch(e.to_string()))?
            .json::<Jwks>()
            .await
            .map_err(|e| AuthError::KeySetFetch(e.to_string()))
    }
}

#[async_trait]
impl TokenVerifier for CognitoTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthClaims, AuthError> {
        let jwks = self.fetch_jwks().await?;
        verify_token(
            token,
            &jwks,
            chrono::Utc::now().timestamp(),
            self.client_id.as_deref(),
        )
    }
}

// ========== DECISION ==========
#[derive(Debug)]
pub enum AuthDecision {
    Allow(AuthClaims),
    Deny(AuthError),
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allow(_))
    }
}

/// Run the full cookie → token → verification chain. Every failure is a deny.
pub async fn authorize(
    verifier: &dyn TokenVerifier,
    cookie_header: Option<&str>,
    cookie_name: &str,
) -> AuthDecision {
    let Some(header) = cookie_header else {
        return AuthDecision::Deny(AuthError::MissingCookie);
    };

    let cookies = parse_cookies(header);
    let Some(token) = cookies.get(cookie_name).filter(|t| !t.is_empty()) else {
        return AuthDecision::Deny(AuthError::MissingToken(cookie_name.to_string()));
    };

    match verifier.verify(token).await {
        Ok(claims) => {
            tracing::info!("Token verified for sub {}", claims.sub);
            AuthDecision::Allow(claims)
        }
        Err(e) => {
            tracing::warn!("Token rejected: {}", e);
            AuthDecision::Deny(e)
        }
    }
}

// ========== POLICY ==========
#[derive(Debug, Serialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Statement")]
    pub statement: Vec<PolicyStatement>,
}

#[derive(Debug, Serialize)]
pub struct PolicyStatement {
    #[serde(rename = "Effect")]
    pub effect: String,
    #[serde(rename = "Action")]
    pub action: String,
    #[serde(rename = "Resource")]
    pub resource: Vec<String>,
}

/// API Gateway REQUEST authorizer output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerResponse {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<AuthClaims>,
}

pub fn create_policy(method_arn: &str, effect: &str) -> PolicyDocument {
    PolicyDocument {
        version: "2012-10-17".to_string(),
        statement: vec![PolicyStatement {
            effect: effect.to_string(),
            action: "execute-api:Invoke".to_string(),
            resource: vec![method_arn.to_string()],
        }],
    }
}

impl AuthorizerResponse {
    pub fn from_decision(decision: AuthDecision, method_arn: &str) -> Self {
        match decision {
            AuthDecision::Allow(claims) => Self {
                principal_id: claims.sub.clone(),
                policy_document: create_policy(method_arn, "Allow"),
                context: Some(claims),
            },
            AuthDecision::Deny(_) => Self {
                principal_id: String::new(),
                policy_document: create_policy(method_arn, "Deny"),
                context: None,
            },
        }
    }
}
