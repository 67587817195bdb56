// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod api;
pub mod auth;
pub mod tasks;

use crate::middleware::{require_auth, require_cron_secret};
use crate::AppState;
use axum::http::{header, HeaderValue, Method, Uri};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Frontend origin, plus plain-http localhost on any port for development.
fn is_allowed_origin(origin: &HeaderValue, frontend_url: &str) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    if origin == frontend_url.trim_end_matches('/') {
        return true;
    }

    // Host must match exactly; "localhost.example.com" is not localhost.
    let Ok(uri) = origin.parse::<Uri>() else {
        return false;
    };
    uri.scheme_str() == Some("http")
        && matches!(uri.host(), Some("localhost" | "127.0.0.1"))
        && uri.path_and_query().map_or(true, |pq| pq.as_str() == "/")
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _parts| {
            is_allowed_origin(origin, &frontend_url)
        }))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(auth::public_routes());

    // Member routes (session required)
    let member_routes = api::routes()
        .merge(auth::protected_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Operator routes (cron secret required)
    let task_routes = tasks::routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_cron_secret,
    ));

    Router::new()
        .merge(public_routes)
        .merge(member_routes)
        .merge(task_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_origins() {
        let frontend = "https://club.example.org/";
        let ok = |s: &'static str| is_allowed_origin(&HeaderValue::from_static(s), frontend);

        assert!(ok("https://club.example.org"));
        assert!(ok("http://localhost:3000"));
        assert!(ok("http://127.0.0.1:5173"));
        assert!(!ok("https://evil.example.com"));
        assert!(!ok("https://club.example.org.evil.com"));
        assert!(!ok("http://localhost.attacker.example"));
        assert!(!ok("http://127.0.0.1.nip.io"));
        assert!(!ok("http://localhost@evil.example.com"));
        assert!(!ok("https://localhost:3000"));
        assert!(!ok("null"));
    }
}
