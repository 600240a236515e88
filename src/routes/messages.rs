use crate::{
    error::Result,
    models::message::SendMessageRequest,
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
        .route("/", post(send_message))
        .route("/recent", get(most_recent_conversation))
        .route("/with/:username", get(conversation))
        .route("/:id", get(receive_message))
}

/// 发送私信；空内容或发给自己时返回空确认
async fn send_message(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<Value>> {
    let sent = state
        .message_service
        .send_message(&user, &request.to, &request.message)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": sent
    })))
}

async fn conversation(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(username): Path<String>,
) -> Result<Json<Value>> {
    let messages = state.message_service.conversation_with(&user, &username)?;

    Ok(Json(json!({
        "success": true,
        "data": messages
    })))
}

/// 最近一次私信往来的用户及对话内容
async fn most_recent_conversation(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>> {
    let active = state.message_service.most_recent_conversation(&user)?;
    let messages = state.message_service.conversation(&user.id, &active.id);

    Ok(Json(json!({
        "success": true,
        "data": {
            "active": active.username,
            "messages": messages
        }
    })))
}

async fn receive_message(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let rendered = state.message_service.receive_message(&id, &user)?;

    Ok(Json(json!({
        "success": true,
        "data": { "message": rendered }
    })))
}
