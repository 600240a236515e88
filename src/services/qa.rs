use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        qa::{
            Answer, AnswerWithVotes, CreateQuestionRequest, Question, QuestionDetail, QuestionFilter,
            TagCount,
        },
        response::Page,
        user::User,
        vote::VoteTarget,
    },
    services::{
        database::QuestionRow,
        notification::{DomainEvent, NotificationService},
        vote::{VoteLedger, VoteTally},
        Database,
    },
    utils::slug::{generate_slug, make_slug_unique},
};
use chrono::Utc;
use std::{cmp::Reverse, collections::HashMap, sync::Arc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 问答：问题、回答与采纳
#[derive(Clone)]
pub struct QuestionService {
    db: Arc<Database>,
    notifications: NotificationService,
    votes: VoteLedger,
    per_page: usize,
}

impl QuestionService {
    pub async fn new(
        db: Arc<Database>,
        notifications: NotificationService,
        votes: VoteLedger,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            db,
            notifications,
            votes,
            per_page: config.questions_per_page,
        })
    }

    pub async fn create_question(&self, author: &User, request: CreateQuestionRequest) -> Result<Question> {
        let title = request.title.trim().to_string();
        if title.is_empty() || request.content.trim().is_empty() {
            return Err(AppError::Validation("Title and content are required".to_string()));
        }

        // 标题唯一
        if !self.db.question_titles.insert(title.clone()) {
            return Err(AppError::Conflict(format!("Question '{}' already exists", title)));
        }

        // 插入即占用：返回 false 说明已被别的问题占用
        let slug = make_slug_unique(&generate_slug(&title), |candidate| {
            !self.db.question_slugs.insert(candidate.to_string())
        });

        let mut tags: Vec<String> = Vec::new();
        for tag in request.tags.iter().map(|t| t.trim().to_lowercase()) {
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        let now = Utc::now();
        let question = Question {
            id: Uuid::new_v4().to_string(),
            author_id: author.id.clone(),
            title,
            slug,
            content: request.content,
            tags,
            status: request.status,
            has_answer: false,
            created_at: now,
            updated_at: now,
        };

        let row = self.db.questions.create(QuestionRow {
            question,
            answers: Vec::new(),
        })?;

        info!("Question {} created by {}", row.question.slug, author.username);
        Ok(row.question)
    }

    pub fn get_question(&self, question_id: &str) -> Result<Question> {
        Ok(self.db.questions.require(question_id)?.question)
    }

    pub fn get_question_by_slug(&self, slug: &str) -> Result<Question> {
        self.db
            .questions
            .find_one(|row| row.question.slug == slug)
            .map(|row| row.question)
            .ok_or_else(|| AppError::not_found("Question"))
    }

    /// 问题列表，最新在前
    pub fn list_questions(&self, filter: QuestionFilter, page: Option<usize>) -> Vec<Question> {
        let mut questions: Vec<Question> = self
            .db
            .questions
            .filter(|row| match filter {
                QuestionFilter::All => true,
                QuestionFilter::Answered => row.question.has_answer,
                QuestionFilter::Unanswered => !row.question.has_answer,
            })
            .into_iter()
            .map(|row| row.question)
            .collect();
        questions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Page::new(page, self.per_page).slice(questions)
    }

    /// 各标签下的问题数，按数量降序
    pub fn counted_tags(&self) -> Vec<TagCount> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for row in self.db.questions.filter(|_| true) {
            for tag in row.question.tags {
                *counts.entry(tag).or_default() += 1;
            }
        }

        let mut tags: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect();
        tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        tags
    }

    pub fn create_answer(&self, question_id: &str, author: &User, content: &str) -> Result<Answer> {
        if content.trim().is_empty() {
            return Err(AppError::Validation("Answer cannot be empty".to_string()));
        }

        let now = Utc::now();
        let answer = Answer {
            id: Uuid::new_v4().to_string(),
            question_id: question_id.to_string(),
            author_id: author.id.clone(),
            content: content.to_string(),
            is_answer: false,
            created_at: now,
            updated_at: now,
        };

        self.db
            .questions
            .update(question_id, |row| row.answers.push(answer.clone()))?;
        self.db
            .answer_index
            .insert(answer.id.clone(), question_id.to_string());

        debug!("Answer {} added to question {}", answer.id, question_id);
        Ok(answer)
    }

    pub fn get_answer(&self, answer_id: &str) -> Result<Answer> {
        let question_id = self.question_of(answer_id)?;
        self.db
            .questions
            .require(&question_id)?
            .answer(answer_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Answer"))
    }

    fn question_of(&self, answer_id: &str) -> Result<String> {
        self.db
            .answer_index
            .get(answer_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found("Answer"))
    }

    /// 回答列表：已采纳的在前，其余最新在前
    pub fn answers_of(&self, question_id: &str) -> Result<Vec<Answer>> {
        let mut answers = self.db.questions.require(question_id)?.answers;
        answers.sort_by_key(|a| (!a.is_answer, Reverse(a.created_at)));
        Ok(answers)
    }

    pub fn accepted_answer(&self, question_id: &str) -> Result<Option<Answer>> {
        Ok(self.db.questions.require(question_id)?.accepted().cloned())
    }

    /// 问题详情，附带问题和每个回答的得票
    pub fn question_detail(&self, question_id: &str) -> Result<QuestionDetail> {
        let question = self.get_question(question_id)?;
        let answers = self
            .answers_of(question_id)?
            .into_iter()
            .map(|answer| AnswerWithVotes {
                votes: self.votes.total_votes(&VoteTarget::Answer(answer.id.clone())),
                answer,
            })
            .collect();

        Ok(QuestionDetail {
            votes: self.votes.total_votes(&VoteTarget::Question(question.id.clone())),
            question,
            answers,
        })
    }

    /// 采纳回答，仅提问者本人。
    ///
    /// 同一问题下其余回答的 `is_answer` 清零与目标回答置位在同一把行锁内完成，
    /// 任何时刻读者都只能看到至多一个被采纳的回答。重复采纳同一回答结果不变。
    pub async fn accept_answer(&self, answer_id: &str, requester: &User) -> Result<Answer> {
        let question_id = self.question_of(answer_id)?;

        let accepted = self.db.questions.update(&question_id, |row| {
            if row.question.author_id != requester.id {
                return Err(AppError::forbidden("Only the asker can accept an answer"));
            }

            let now = Utc::now();
            for answer in row.answers.iter_mut() {
                let is_answer = answer.id == answer_id;
                if answer.is_answer != is_answer {
                    answer.is_answer = is_answer;
                    answer.updated_at = now;
                }
            }
            row.question.has_answer = true;
            row.question.updated_at = now;

            row.answer(answer_id)
                .cloned()
                .ok_or_else(|| AppError::not_found("Answer"))
        })??;

        info!(
            "Answer {} accepted on question {} by {}",
            answer_id, question_id, requester.username
        );

        let event = DomainEvent::AnswerAccepted {
            actor: requester.clone(),
            answer: accepted.clone(),
        };
        if let Err(e) = self.notifications.dispatch(event).await {
            warn!("Failed to dispatch accept notification: {}", e);
        }
        Ok(accepted)
    }
}
