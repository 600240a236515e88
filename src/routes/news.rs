use crate::{
    error::Result,
    models::{
        news::{CreateNewsRequest, NewsListQuery, ReplyNewsRequest},
        response::Page,
    },
    state::AppState,
    utils::middleware::AuthUser,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_news).post(post_news))
        .route("/:id", get(get_news).delete(delete_news))
        .route("/:id/like", post(toggle_like))
        .route("/:id/likers", get(get_likers))
        .route("/:id/reply", post(reply_news))
        .route("/:id/thread", get(get_thread))
        .route("/:id/interactions", get(get_interactions))
}

async fn list_news(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NewsListQuery>,
) -> Result<Json<Value>> {
    let page = Page::new(query.page, state.get_page_size("news"));
    let news = state.news_service.list_roots(page);

    Ok(Json(json!({
        "success": true,
        "data": news
    })))
}

async fn post_news(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateNewsRequest>,
) -> Result<Json<Value>> {
    request.validate()?;
    let news = state.news_service.post_news(&user, &request.content).await?;

    Ok(Json(json!({
        "success": true,
        "data": news
    })))
}

async fn get_news(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let news = state.news_service.get_news(&id)?;

    Ok(Json(json!({
        "success": true,
        "data": news
    })))
}

async fn delete_news(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let removed = state.news_service.delete_news(&id, &user)?;

    Ok(Json(json!({
        "success": true,
        "data": { "removed": removed }
    })))
}

async fn toggle_like(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let toggle = state.news_service.toggle_like(&id, &user).await?;

    Ok(Json(json!({
        "success": true,
        "data": toggle
    })))
}

async fn get_likers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let likers: Vec<String> = state
        .news_service
        .likers(&id)?
        .into_iter()
        .map(|user| user.username)
        .collect();

    Ok(Json(json!({
        "success": true,
        "data": likers
    })))
}

async fn reply_news(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<ReplyNewsRequest>,
) -> Result<Json<Value>> {
    let reply = state.news_service.reply(&id, &user, &request.content).await?;

    Ok(Json(json!({
        "success": true,
        "data": reply
    })))
}

async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let thread = state.news_service.thread_of(&id)?;

    Ok(Json(json!({
        "success": true,
        "data": thread
    })))
}

async fn get_interactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let interactions = state.news_service.interactions(&id)?;

    Ok(Json(json!({
        "success": true,
        "data": interactions
    })))
}
