use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{future, SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    error::{AppError, Result},
    models::{
        user::Identity,
        websocket::{ChannelKind, ClientFrame},
    },
    services::ConnectionSession,
    state::AppState,
    utils::middleware::CurrentIdentity,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // 私信频道：自动加入以用户名命名的组
        .route("/messages/", get(messages_handler))
        // 通知频道：自动加入 notifications 组
        .route("/notifications/", get(notifications_handler))
}

async fn messages_handler(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(identity): CurrentIdentity,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response> {
    upgrade(state, identity, ws, ChannelKind::Messages).await
}

async fn notifications_handler(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(identity): CurrentIdentity,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response> {
    upgrade(state, identity, ws, ChannelKind::Notifications).await
}

/// 匿名连接在升级前以 401 拒绝，不建立会话
async fn upgrade(
    state: Arc<AppState>,
    identity: Identity,
    ws: Option<WebSocketUpgrade>,
    channel: ChannelKind,
) -> Result<Response> {
    let session = ConnectionSession::open(state.broker.clone(), identity, channel).await?;
    let Some(ws) = ws else {
        // 会话在这里被丢弃，Drop 负责退组
        return Err(AppError::BadRequest("WebSocket upgrade required".to_string()));
    };

    info!(
        "WebSocket upgrade for user {} on {:?} channel ({})",
        session.user().username,
        channel,
        session.id()
    );
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, session)))
}

/// 把 WebSocket 拆成写端和读端交给会话驱动
async fn handle_socket(socket: WebSocket, session: ConnectionSession) {
    let id = session.id();
    let (sender, receiver) = socket.split();

    let writer = sender.with(|text: String| future::ready(Ok::<_, axum::Error>(Message::Text(text))));
    let reader = receiver.filter_map(|message| {
        future::ready(match message {
            Ok(Message::Text(text)) => Some(ClientFrame::Text(text)),
            Ok(Message::Close(_)) | Err(_) => Some(ClientFrame::Close),
            // ping/pong 由 axum 处理，二进制帧忽略
            Ok(_) => None,
        })
    });

    session.serve(writer, reader).await;
    debug!("WebSocket connection closed: {}", id);
}
