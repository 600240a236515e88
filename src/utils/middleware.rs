use crate::{
    error::{AppError, Result},
    models::user::{Identity, User},
    state::AppState,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    headers::{authorization::Bearer, Authorization},
    http::request::Parts,
    RequestPartsExt, TypedHeader,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// 当前请求的身份，未携带或携带无效令牌时为匿名
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        // 先取 Authorization 头；浏览器 WebSocket 无法设置请求头，退回到 `token` 查询参数
        let token = match parts.extract::<TypedHeader<Authorization<Bearer>>>().await {
            Ok(TypedHeader(Authorization(bearer))) => Some(bearer.token().to_string()),
            Err(_) => query_token(parts),
        };

        let identity = match state.auth_service.identify(token.as_deref()) {
            Identity::Authenticated(user) => {
                Identity::Authenticated(state.user_service.upsert(&user))
            }
            Identity::Anonymous => {
                debug!("Anonymous request to {}", parts.uri.path());
                Identity::Anonymous
            }
        };

        Ok(CurrentIdentity(identity))
    }
}

/// 必须登录的接口使用的提取器
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        let CurrentIdentity(identity) = CurrentIdentity::from_request_parts(parts, state).await?;
        identity
            .into_user()
            .map(AuthUser)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

fn query_token(parts: &Parts) -> Option<String> {
    parts
        .uri
        .query()
        .and_then(|query| serde_urlencoded::from_str::<TokenQuery>(query).ok())
        .and_then(|query| query.token)
}
