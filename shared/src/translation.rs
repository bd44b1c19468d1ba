use async_trait::async_trait;
use aws_sdk_translate::Client as TranslateClient;
use thiserror::Error;

/// Reviews are stored in English.
pub const SOURCE_LANGUAGE: &str = "en";

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation service failed: {0}")]
    Service(String),
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, TranslateError>;
}

/// Amazon Translate `TranslateText` with a fixed English source.
#[derive(Clone)]
pub struct AwsTranslator {
    client: TranslateClient,
}

impl AwsTranslator {
    pub fn new(client: TranslateClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Translator for AwsTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, TranslateError> {
        let output = self
            .client
            .translate_text()
            .text(text)
            .source_language_code(SOURCE_LANGUAGE)
            .target_language_code(target_language)
            .send()
            .await
            .map_err(|e| {
                let e = aws_sdk_translate::Error::from(e);
                TranslateError::Service(e.to_string())
            })?;

        Ok(output.translated_text().to_string())
    }
}
