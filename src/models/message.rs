use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// 用户私信
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub message: String,
    pub unread: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn involves(&self, user_id: &str) -> bool {
        self.sender_id == user_id || self.recipient_id == user_id
    }

    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.sender_id == a && self.recipient_id == b)
            || (self.sender_id == b && self.recipient_id == a)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// 接收者用户名
    pub to: String,
    pub message: String,
}

/// 发送结果，空内容或发给自己时为空确认
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentMessage {
    pub message: Message,
    pub rendered: String,
}
