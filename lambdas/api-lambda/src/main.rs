use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_translate::Client as TranslateClient;
use lambda_http::{run, service_fn, tracing, Error, Request};
use movie_reviews_shared::{
    auth::CognitoTokenVerifier, config::Config, store::DynamoReviewStore,
    translation::AwsTranslator, AppState,
};
use std::sync::Arc;

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = Config::from_env()?;
    let table_name = config.table_name()?.to_string();
    tracing::info!("Serving reviews from table {}", table_name);

    // Initialize AWS clients once at startup
    let aws_config = aws_config::load_from_env().await;

    let state = AppState::new(
        Box::new(DynamoReviewStore::new(
            DynamoClient::new(&aws_config),
            table_name,
        )),
        Box::new(AwsTranslator::new(TranslateClient::new(&aws_config))),
        Box::new(CognitoTokenVerifier::from_config(&config)?),
        config.cookie_name.clone(),
    );

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
