use crate::error::{AppError, Result};
use crate::models::{
    message::Message,
    news::News,
    notification::Notification,
    qa::{Answer, Question},
    user::User,
    vote::{Vote, VoteTarget},
};
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use tracing::debug;

/// 可存入 [`Table`] 的记录
pub trait Record: Clone + Send + Sync + 'static {
    const TABLE: &'static str;

    fn id(&self) -> &str;
}

/// 单表存储。行级操作在 DashMap 分片锁内完成，`update` 对单行是原子的
#[derive(Clone)]
pub struct Table<T: Record> {
    rows: Arc<DashMap<String, T>>,
}

impl<T: Record> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Arc::new(DashMap::new()),
        }
    }
}

impl<T: Record> Table<T> {
    /// 创建记录，ID 重复时返回 Conflict
    pub fn create(&self, record: T) -> Result<T> {
        use dashmap::mapref::entry::Entry;

        match self.rows.entry(record.id().to_string()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "{} {} already exists",
                T::TABLE,
                record.id()
            ))),
            Entry::Vacant(entry) => {
                debug!("Creating {} record: {}", T::TABLE, record.id());
                entry.insert(record.clone());
                Ok(record)
            }
        }
    }

    /// 插入或覆盖
    pub fn upsert(&self, record: T) -> T {
        self.rows.insert(record.id().to_string(), record.clone());
        record
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.rows.get(id).map(|row| row.value().clone())
    }

    /// 获取记录，不存在时返回 NotFound
    pub fn require(&self, id: &str) -> Result<T> {
        self.get(id)
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", T::TABLE, id)))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    /// 在行锁内修改单行
    pub fn update<R>(&self, id: &str, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut row = self
            .rows
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", T::TABLE, id)))?;
        Ok(f(row.value_mut()))
    }

    /// 对满足条件的每一行执行修改，返回被修改的行数
    pub fn update_where(&self, predicate: impl Fn(&T) -> bool, f: impl Fn(&mut T) -> bool) -> usize {
        let mut changed = 0;
        for mut row in self.rows.iter_mut() {
            if predicate(row.value()) && f(row.value_mut()) {
                changed += 1;
            }
        }
        changed
    }

    pub fn delete(&self, id: &str) -> Option<T> {
        self.rows.remove(id).map(|(_, record)| record)
    }

    pub fn delete_where(&self, predicate: impl Fn(&T) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|_, record| !predicate(record));
        before.saturating_sub(self.rows.len())
    }

    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows
            .iter()
            .filter(|row| predicate(row.value()))
            .map(|row| row.value().clone())
            .collect()
    }

    pub fn find_one(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.rows
            .iter()
            .find(|row| predicate(row.value()))
            .map(|row| row.value().clone())
    }

    pub fn count(&self, predicate: impl Fn(&T) -> bool) -> usize {
        self.rows.iter().filter(|row| predicate(row.value())).count()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 问题聚合：问题及其全部回答存放在同一行，采纳回答时整行在一把写锁内批量更新
#[derive(Debug, Clone)]
pub struct QuestionRow {
    pub question: Question,
    pub answers: Vec<Answer>,
}

impl QuestionRow {
    pub fn answer(&self, answer_id: &str) -> Option<&Answer> {
        self.answers.iter().find(|answer| answer.id == answer_id)
    }

    pub fn accepted(&self) -> Option<&Answer> {
        self.answers.iter().find(|answer| answer.is_answer)
    }
}

impl Record for User {
    const TABLE: &'static str = "user";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for News {
    const TABLE: &'static str = "news";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Notification {
    const TABLE: &'static str = "notification";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Message {
    const TABLE: &'static str = "message";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for QuestionRow {
    const TABLE: &'static str = "question";
    fn id(&self) -> &str {
        &self.question.id
    }
}

/// 投票表：target -> (user_id -> vote)，每个 (user, target) 至多一行
pub type VoteTable = DashMap<VoteTarget, DashMap<String, Vote>>;

/// 内存记录存储
#[derive(Clone, Default)]
pub struct Database {
    pub users: Table<User>,
    pub news: Table<News>,
    pub notifications: Table<Notification>,
    pub messages: Table<Message>,
    pub questions: Table<QuestionRow>,
    /// answer_id -> question_id
    pub answer_index: Arc<DashMap<String, String>>,
    /// 问题标题唯一索引
    pub question_titles: Arc<DashSet<String>>,
    /// 已占用的问题 slug
    pub question_slugs: Arc<DashSet<String>>,
    pub votes: Arc<VoteTable>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// 投票目标是否存在
    pub fn target_exists(&self, target: &VoteTarget) -> bool {
        match target {
            VoteTarget::Question(id) => self.questions.contains(id),
            VoteTarget::Answer(id) => self.answer_index.contains_key(id),
        }
    }

    pub fn find_user_by_username(&self, username: &str) -> Option<User> {
        self.users.find_one(|user| user.username == username)
    }
}
