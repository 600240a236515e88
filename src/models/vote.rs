use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};

/// 投票目标：问题或回答
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum VoteTarget {
    Question(String),
    Answer(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Question,
    Answer,
}

impl VoteTarget {
    pub fn kind(&self) -> TargetKind {
        match self {
            VoteTarget::Question(_) => TargetKind::Question,
            VoteTarget::Answer(_) => TargetKind::Answer,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            VoteTarget::Question(id) | VoteTarget::Answer(id) => id,
        }
    }
}

/// 唯一键 (user_id, target) 下的一张票
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub user_id: String,
    pub target: VoteTarget,
    /// true 为赞同
    pub value: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 一次投票对账本造成的变化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChange {
    Created,
    Flipped,
    Removed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub change: VoteChange,
    /// 赞同票 - 反对票
    pub votes: i64,
}

/// 客户端提交的投票，`U` 赞同，`D` 反对
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub value: String,
}

impl VoteRequest {
    pub fn as_bool(&self) -> Result<bool> {
        match self.value.as_str() {
            "U" | "u" => Ok(true),
            "D" | "d" => Ok(false),
            other => Err(AppError::BadRequest(format!("Unknown vote value: {}", other))),
        }
    }
}
