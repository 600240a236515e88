use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        message::{Message, SentMessage},
        user::User,
        websocket::LivePayload,
    },
    services::{broker::Broker, Database},
    utils::markdown::Renderer,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// 私信服务
#[derive(Clone)]
pub struct MessageService {
    db: Arc<Database>,
    broker: Arc<dyn Broker>,
    renderer: Arc<dyn Renderer>,
    max_message_length: usize,
}

impl MessageService {
    pub async fn new(
        db: Arc<Database>,
        broker: Arc<dyn Broker>,
        renderer: Arc<dyn Renderer>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            db,
            broker,
            renderer,
            max_message_length: config.max_message_length,
        })
    }

    /// 发送私信。空白内容或发给自己时不做任何事，返回 `None`
    ///
    /// 消息先落库，再推送到以接收者用户名命名的组；接收者不在线时只能稍后通过历史查询读到
    pub async fn send_message(
        &self,
        sender: &User,
        recipient_username: &str,
        text: &str,
    ) -> Result<Option<SentMessage>> {
        let recipient = self
            .db
            .find_user_by_username(recipient_username)
            .ok_or_else(|| AppError::not_found("Recipient"))?;

        if text.trim().is_empty() || recipient.id == sender.id {
            debug!(
                "Ignoring message from {} to {}: empty or self",
                sender.username, recipient.username
            );
            return Ok(None);
        }

        if text.chars().count() > self.max_message_length {
            return Err(AppError::Validation(format!(
                "Message exceeds {} characters",
                self.max_message_length
            )));
        }

        let message = self.db.messages.create(Message {
            id: Uuid::new_v4().to_string(),
            sender_id: sender.id.clone(),
            recipient_id: recipient.id.clone(),
            message: text.to_string(),
            unread: true,
            created_at: Utc::now(),
        })?;

        let rendered = self.renderer.render_message(&message, &sender.username);
        let delivered = self
            .broker
            .publish(
                &recipient.username,
                LivePayload::private_message(rendered.clone(), &sender.username),
            )
            .await;

        info!(
            "Message {} from {} to {} ({} live session(s))",
            message.id, sender.username, recipient.username, delivered
        );
        Ok(Some(SentMessage { message, rendered }))
    }

    /// 两人之间的全部私信，按时间正序
    pub fn conversation(&self, user_id: &str, other_id: &str) -> Vec<Message> {
        let mut messages = self
            .db
            .messages
            .filter(|m| m.is_between(user_id, other_id));
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        messages
    }

    /// 与按用户名指定的对方之间的私信
    pub fn conversation_with(&self, user: &User, other_username: &str) -> Result<Vec<Message>> {
        let other = self
            .db
            .find_user_by_username(other_username)
            .ok_or_else(|| AppError::not_found("User"))?;
        Ok(self.conversation(&user.id, &other.id))
    }

    /// 最近一次私信往来的对方；没有任何私信时返回用户自己
    pub fn most_recent_conversation(&self, user: &User) -> Result<User> {
        let latest = self
            .db
            .messages
            .filter(|m| m.involves(&user.id))
            .into_iter()
            .max_by(|a, b| a.created_at.cmp(&b.created_at));

        match latest {
            Some(message) => {
                let other_id = if message.sender_id == user.id {
                    &message.recipient_id
                } else {
                    &message.sender_id
                };
                self.db.users.require(other_id)
            }
            None => Ok(user.clone()),
        }
    }

    /// 取出单条私信的展示片段，只有收发双方可以读取；接收者读取后标为已读
    pub fn receive_message(&self, message_id: &str, user: &User) -> Result<String> {
        let message = self.db.messages.require(message_id)?;
        if !message.involves(&user.id) {
            return Err(AppError::forbidden("Not a participant of this conversation"));
        }

        if message.recipient_id == user.id && message.unread {
            self.db.messages.update(message_id, |m| m.unread = false)?;
        }

        let sender = self.db.users.require(&message.sender_id)?;
        Ok(self.renderer.render_message(&message, &sender.username))
    }

    pub fn unread_count(&self, user_id: &str) -> usize {
        self.db
            .messages
            .count(|m| m.recipient_id == user_id && m.unread)
    }
}
