use std::env;

use thiserror::Error;

const DEFAULT_COOKIE_NAME: &str = "token";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Deployment settings injected through the function environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub table_name: Option<String>,
    pub region: String,
    pub user_pool_id: Option<String>,
    pub client_id: Option<String>,
    pub cookie_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let region = non_empty("REGION")
            .or_else(|| non_empty("AWS_REGION"))
            .ok_or(ConfigError::Missing("REGION"))?;

        Ok(Self {
            table_name: non_empty("TABLE_NAME"),
            region,
            user_pool_id: non_empty("USER_POOL_ID"),
            client_id: non_empty("CLIENT_ID"),
            cookie_name: non_empty("AUTH_COOKIE_NAME")
                .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string()),
        })
    }

    /// Only the API function talks to the table.
    pub fn table_name(&self) -> Result<&str, ConfigError> {
        self.table_name
            .as_deref()
            .ok_or(ConfigError::Missing("TABLE_NAME"))
    }

    /// Well-known key set location for the configured user pool.
    pub fn jwks_url(&self) -> Result<String, ConfigError> {
        let user_pool_id = self
            .user_pool_id
            .as_deref()
            .ok_or(ConfigError::Missing("USER_POOL_ID"))?;
        Ok(format!(
            "https://cognito-idp.{}.amazonaws.com/{}/.well-known/jwks.json",
            self.region, user_pool_id
        ))
    }
}
