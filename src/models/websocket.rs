use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::user::User;

/// 全站广播组，所有在线用户的通知连接都加入该组
pub const NOTIFICATIONS_GROUP: &str = "notifications";

/// 前端路由键：有新的首页动态
pub const ADDITIONAL_NEWS_KEY: &str = "additional_news";

/// WebSocket 频道类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// 私信频道，自动加入以用户名命名的组
    Messages,
    /// 通知频道，自动加入 `notifications` 组
    Notifications,
}

impl ChannelKind {
    /// 连接进入 Active 时自动加入的组名
    pub fn group_name(&self, user: &User) -> String {
        match self {
            ChannelKind::Messages => user.username.clone(),
            ChannelKind::Notifications => NOTIFICATIONS_GROUP.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PushType {
    #[default]
    Receive,
}

/// 通知频道推送：`{type, key, id_value, actor_name}`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NotificationPush {
    #[serde(rename = "type")]
    pub kind: PushType,
    pub key: String,
    pub id_value: Option<String>,
    pub actor_name: String,
}

/// 新动态广播：`{type, key: "additional_news", actor_name}`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ActivityPush {
    #[serde(rename = "type")]
    pub kind: PushType,
    pub key: String,
    pub actor_name: String,
}

/// 私信推送：`{type, message, sender}`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MessagePush {
    #[serde(rename = "type")]
    pub kind: PushType,
    pub message: String,
    pub sender: String,
}

/// 通过组广播下发给客户端的实时负载
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LivePayload {
    Notification(NotificationPush),
    Activity(ActivityPush),
    PrivateMessage(MessagePush),
}

impl LivePayload {
    pub fn notification(key: &str, id_value: Option<String>, actor_name: &str) -> Self {
        LivePayload::Notification(NotificationPush {
            kind: PushType::Receive,
            key: key.to_string(),
            id_value,
            actor_name: actor_name.to_string(),
        })
    }

    pub fn additional_news(actor_name: &str) -> Self {
        LivePayload::Activity(ActivityPush {
            kind: PushType::Receive,
            key: ADDITIONAL_NEWS_KEY.to_string(),
            actor_name: actor_name.to_string(),
        })
    }

    pub fn private_message(message: String, sender: &str) -> Self {
        LivePayload::PrivateMessage(MessagePush {
            kind: PushType::Receive,
            message,
            sender: sender.to_string(),
        })
    }
}

/// 会话出站队列中的一帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFrame {
    /// 组广播，多个成员共享同一份负载
    Live(Arc<LivePayload>),
    /// 客户端消息原样回显
    Echo(String),
}

impl SessionFrame {
    pub fn to_text(&self) -> serde_json::Result<String> {
        match self {
            SessionFrame::Live(payload) => serde_json::to_string(payload.as_ref()),
            SessionFrame::Echo(text) => Ok(text.clone()),
        }
    }

    pub fn payload(&self) -> Option<&LivePayload> {
        match self {
            SessionFrame::Live(payload) => Some(payload.as_ref()),
            SessionFrame::Echo(_) => None,
        }
    }
}

/// 客户端入站帧（与具体传输层解耦）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Text(String),
    Close,
}

/// 组统计
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupStats {
    pub group: String,
    pub members: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerStats {
    pub total_groups: usize,
    pub total_memberships: usize,
    pub groups: Vec<GroupStats>,
}
