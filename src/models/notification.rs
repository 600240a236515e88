use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::{fmt, str::FromStr};

use crate::error::AppError;

/// 通知动词
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Like,
    Comment,
    Favorite,
    Answer,
    AcceptAnswer,
    Reply,
    LoggedIn,
    LoggedOut,
}

impl Verb {
    pub fn code(&self) -> char {
        match self {
            Verb::Like => 'L',
            Verb::Comment => 'C',
            Verb::Favorite => 'F',
            Verb::Answer => 'A',
            Verb::AcceptAnswer => 'W',
            Verb::Reply => 'R',
            Verb::LoggedIn => 'I',
            Verb::LoggedOut => 'O',
        }
    }

    pub fn display_text(&self) -> &'static str {
        match self {
            Verb::Like => "赞了",
            Verb::Comment => "评论了",
            Verb::Favorite => "收藏了",
            Verb::Answer => "回答了",
            Verb::AcceptAnswer => "接受了回答",
            Verb::Reply => "回复了",
            Verb::LoggedIn => "登录",
            Verb::LoggedOut => "退出",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Article,
    News,
    Question,
    Answer,
}

/// 通知指向的动作对象，携带所有者以便判定是否需要通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionObject {
    pub kind: ObjectKind,
    pub id: String,
    pub owner_id: String,
}

impl ActionObject {
    pub fn new(kind: ObjectKind, id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            owner_id: owner_id.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: String,
    pub actor_id: String,
    pub recipient_id: String,
    pub verb: Verb,
    pub action_object: ActionObject,
    pub unread: bool,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// 外部文章服务在评论创建后回调，携带文章及其作者
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleCommentedRequest {
    pub article_id: String,
    pub owner_id: String,
}

/// 推送给前端的路由信息：`key` 决定前端如何处理，`id_value` 用于刷新对应内容
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Routing {
    pub key: Option<String>,
    pub id_value: Option<String>,
}

impl Routing {
    pub const DEFAULT_KEY: &'static str = "notification";
    pub const SOCIAL_UPDATE: &'static str = "social_update";

    pub fn social_update(id_value: impl Into<String>) -> Self {
        Self {
            key: Some(Self::SOCIAL_UPDATE.to_string()),
            id_value: Some(id_value.into()),
        }
    }

    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(Self::DEFAULT_KEY)
    }
}

/// 通知触发条件。
///
/// `Literal` 保留线上一直以来的判定：只有当 actor 是动作对象的所有者、且
/// actor 与接收者不同时才创建通知。这与“别人操作了我的内容时通知我”的直觉
/// 相反，但在产品确认之前保持原样；`OwnerOnly` 仅要求 actor 与接收者不同。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPolicy {
    Literal,
    OwnerOnly,
}

impl NotificationPolicy {
    pub fn should_notify(&self, actor_id: &str, recipient_id: &str, object: &ActionObject) -> bool {
        match self {
            NotificationPolicy::Literal => actor_id == object.owner_id && actor_id != recipient_id,
            NotificationPolicy::OwnerOnly => actor_id != recipient_id,
        }
    }
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        NotificationPolicy::Literal
    }
}

impl FromStr for NotificationPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "literal" => Ok(NotificationPolicy::Literal),
            "owner_only" | "owner-only" | "owner" => Ok(NotificationPolicy::OwnerOnly),
            other => Err(AppError::Validation(format!("Unknown notification policy: {}", other))),
        }
    }
}
