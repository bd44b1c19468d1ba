use aws_lambda_events::apigw::ApiGatewayCustomAuthorizerRequestTypeRequest;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use movie_reviews_shared::auth::{self, AuthorizerResponse, CognitoTokenVerifier, TokenVerifier};
use movie_reviews_shared::config::Config;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = Config::from_env()?;
    let verifier = CognitoTokenVerifier::from_config(&config)?;
    let cookie_name = config.cookie_name.clone();

    run(service_fn(|event| function_handler(&verifier, &cookie_name, event))).await
}

async fn function_handler(
    verifier: &dyn TokenVerifier,
    cookie_name: &str,
    event: LambdaEvent<ApiGatewayCustomAuthorizerRequestTypeRequest>,
) -> Result<AuthorizerResponse, Error> {
    let request = event.payload;
    let method_arn = request.method_arn.unwrap_or_default();
    if method_arn.is_empty() {
        tracing::warn!("Authorizer request without methodArn");
    }

    let cookie_header = request
        .headers
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");
    let cookie_header = (!cookie_header.is_empty()).then_some(cookie_header.as_str());

    let decision = auth::authorize(verifier, cookie_header, cookie_name).await;
    tracing::info!(
        "{} {}",
        if decision.is_allowed() { "Allow" } else { "Deny" },
        method_arn
    );

    Ok(AuthorizerResponse::from_decision(decision, &method_arn))
}
