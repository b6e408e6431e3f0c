use crate::api::handlers::{auth, health};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod handlers;
mod openapi;

/// Build the service router. State is layered on by the caller.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/acs", post(auth::session::acs))
        .route(
            "/logout",
            get(auth::session::logout).post(auth::session::logout),
        )
        .route("/slo", get(auth::session::slo))
        .route("/metadata", get(auth::session::metadata))
        .route("/health", get(health::health))
        .route("/openapi.json", get(openapi::openapi_json))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, redis_url: String, config: auth::AuthConfig) -> Result<()> {
    let storage = auth::RedisSessionStorage::connect(&redis_url)
        .await
        .context("Failed to connect to the session store")?;

    let strategy = auth::SamlSpidStrategy::new(
        config.entity_id().to_string(),
        config.acs_url(),
        config.slo_url(),
        config.idp_registry().clone(),
    );

    let state = Arc::new(auth::AuthState::new(
        config,
        Arc::new(storage),
        Arc::new(strategy),
    ));

    let app = router().layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(state)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
