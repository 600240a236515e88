use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    Open,
    Closed,
    Draft,
}

impl Default for QuestionStatus {
    fn default() -> Self {
        QuestionStatus::Open
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub tags: Vec<String>,
    pub status: QuestionStatus,
    /// 是否已有被采纳的回答，随 `accept_answer` 一并维护
    pub has_answer: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub id: String,
    pub question_id: String,
    pub author_id: String,
    pub content: String,
    pub is_answer: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 20000))]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: QuestionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAnswerRequest {
    #[validate(length(min = 1, max = 20000))]
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionFilter {
    All,
    Answered,
    Unanswered,
}

impl Default for QuestionFilter {
    fn default() -> Self {
        QuestionFilter::All
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionListQuery {
    #[serde(default)]
    pub filter: QuestionFilter,
    pub page: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerWithVotes {
    #[serde(flatten)]
    pub answer: Answer,
    pub votes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDetail {
    pub question: Question,
    pub votes: i64,
    pub answers: Vec<AnswerWithVotes>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}
