use crate::{
    error::Result,
    models::notification::{ActionObject, ArticleCommentedRequest, ObjectKind},
    services::DomainEvent,
    state::AppState,
    utils::middleware::AuthUser,
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_unread))
        .route("/read", get(list_read))
        .route("/latest", get(latest_notifications))
        .route("/count", get(unread_count))
        .route("/mark-all-read", post(mark_all_read))
        .route("/mark-all-unread", post(mark_all_unread))
        .route("/:slug/read", post(mark_as_read))
        .route("/events/article-commented", post(article_commented))
}

/// 未读通知列表
async fn list_unread(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>> {
    let notifications = state.notification_service.unread(&user.id);

    Ok(Json(json!({
        "success": true,
        "data": notifications
    })))
}

async fn list_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>> {
    let notifications = state.notification_service.read(&user.id);

    Ok(Json(json!({
        "success": true,
        "data": notifications
    })))
}

/// 最近的未读通知
async fn latest_notifications(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>> {
    let notifications = state.notification_service.most_recent(&user.id);

    Ok(Json(json!({
        "success": true,
        "data": notifications
    })))
}

async fn unread_count(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>> {
    Ok(Json(json!({
        "success": true,
        "data": { "unread": state.notification_service.unread_count(&user.id) }
    })))
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>> {
    let changed = state.notification_service.mark_all_read(&user.id);

    Ok(Json(json!({
        "success": true,
        "data": { "changed": changed },
        "message": format!("用户{}的所有通知标为已读", user.username)
    })))
}

async fn mark_all_unread(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>> {
    let changed = state.notification_service.mark_all_unread(&user.id);

    Ok(Json(json!({
        "success": true,
        "data": { "changed": changed }
    })))
}

/// 根据 slug 标为已读
async fn mark_as_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(slug): Path<String>,
) -> Result<Json<Value>> {
    let notification = state.notification_service.mark_one_read(&slug, &user.id)?;

    Ok(Json(json!({
        "success": true,
        "data": notification
    })))
}

/// 文章评论事件：当前用户评论了外部文章服务中的一篇文章
async fn article_commented(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<ArticleCommentedRequest>,
) -> Result<Json<Value>> {
    let event = DomainEvent::ArticleCommented {
        actor: user,
        article: ActionObject::new(ObjectKind::Article, request.article_id, request.owner_id),
    };
    let notification = state.notification_service.dispatch(event).await?;

    Ok(Json(json!({
        "success": true,
        "data": notification
    })))
}
