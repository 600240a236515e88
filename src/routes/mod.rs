pub mod messages;
pub mod news;
pub mod notifications;
pub mod qa;
pub mod websocket;

use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// 组装全部路由
pub fn app(state: Arc<AppState>) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_allowed_origins
        .split(',')
        .filter_map(|origin| match origin.trim().parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);
    // 通配符不能出现在来源列表里
    let cors = if origins.iter().any(|origin| *origin == "*") {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    };

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .nest("/ws", websocket::router())
        .nest("/api/news", news::router())
        .nest("/api/qa", qa::router())
        .nest("/api/notifications", notifications::router())
        .nest("/api/messages", messages::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "Rainbow-QA is running!"
}
