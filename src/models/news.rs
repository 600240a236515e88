use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use validator::Validate;

/// 首页动态。回复同样是一条动态，`parent_id` 永远指向根动态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct News {
    pub id: String,
    pub author_id: String,
    pub parent_id: Option<String>,
    pub content: String,
    pub reply: bool,
    pub liked: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl News {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn like_count(&self) -> usize {
        self.liked.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateNewsRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReplyNewsRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikeToggle {
    pub liked: bool,
    pub likes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interactions {
    pub likes: usize,
    pub comments: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsThread {
    pub root: News,
    pub thread: Vec<News>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsListQuery {
    pub page: Option<usize>,
}
