pub mod types;
pub mod config;
pub mod response;
pub mod store;
pub mod validation;
pub mod translation;
pub mod reviews;
pub mod auth;

use std::sync::Arc;

use auth::TokenVerifier;
use store::ReviewStore;
use translation::Translator;

/// Shared application state, built once per cold start and reused by every invocation.
pub struct AppState {
    pub store: Box<dyn ReviewStore>,
    pub translator: Box<dyn Translator>,
    pub verifier: Box<dyn TokenVerifier>,
    pub cookie_name: String,
}

impl AppState {
    pub fn new(
        store: Box<dyn ReviewStore>,
        translator: Box<dyn Translator>,
        verifier: Box<dyn TokenVerifier>,
        cookie_name: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            translator,
            verifier,
            cookie_name,
        })
    }
}
