//! Route configuration and setup.
//!
//! Feature route groups live in [domains](domains); probes in [health](health).

mod domains;
mod health;

use crate::auth::middleware::auth_middleware;
use crate::constants::{MAX_JSON_BODY_BYTES, MULTIPART_OVERHEAD_BYTES};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::get,
    Json, Router,
};
use drumnote_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Build the full router: public probes and auth, then every protected group behind
/// the bearer-token layer.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let public_routes = public_routes(state.clone());
    let protected_routes = protected_routes(state.clone()).layer(
        axum::middleware::from_fn_with_state(state.clone(), auth_middleware),
    );

    // Upload routes raise the extractor limit for themselves; this caps everything.
    let max_body = config.max_video_size_bytes.max(config.max_audio_size_bytes)
        + MULTIPART_OVERHEAD_BYTES;
    tracing::info!(
        max_concurrent_requests = config.max_concurrent_requests,
        max_body_bytes = max_body,
        max_json_body_bytes = MAX_JSON_BODY_BYTES,
        "HTTP limits configured"
    );

    let app = public_routes
        .merge(protected_routes)
        .layer(ConcurrencyLimitLayer::new(config.max_concurrent_requests))
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(DefaultBodyLimit::max(MAX_JSON_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

fn public_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/ready",
            get({
                let state = state.clone();
                move || async { health::readiness_check(state).await }
            }),
        )
        .merge(domains::auth_routes(state.clone()))
        .with_state(state)
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
}

fn protected_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .merge(domains::user_routes(state.clone()))
        .merge(domains::role_routes(state.clone()))
        .merge(domains::video_routes(state.clone()))
        .merge(domains::job_routes(state.clone()))
        .merge(domains::audio_routes(state.clone()))
        .merge(domains::notation_routes(state.clone()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_origins(origins: &[&str]) -> Config {
        let origins = origins.join(",");
        let vars = [
            ("DATABASE_URL", "postgres://localhost/drumnote"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("CORS_ORIGINS", origins.as_str()),
        ];
        Config::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    #[test]
    fn cors_accepts_explicit_origins() {
        let config = config_with_origins(&["https://drums.example.com", "http://localhost:3000"]);
        assert!(setup_cors(&config).is_ok());
    }

    #[test]
    fn cors_rejects_malformed_origin() {
        let config = config_with_origins(&["https://ok.example.com", "bad\norigin"]);
        assert!(setup_cors(&config).is_err());
    }
}
