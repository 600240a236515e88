use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        news::News,
        notification::{ActionObject, Notification, NotificationPolicy, ObjectKind, Routing, Verb},
        qa::Answer,
        user::User,
        websocket::{LivePayload, NOTIFICATIONS_GROUP},
    },
    services::{broker::Broker, Database},
    utils::slug::notification_slug,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// 会触发通知的领域事件，由产生事件的服务直接调用 [`NotificationService::dispatch`]
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// 用户给一条动态点赞
    NewsLiked { actor: User, post: News },
    /// 用户回复了一条动态（`parent` 为讨论串根动态）
    NewsReplied { actor: User, parent: News },
    /// 提问者采纳了回答
    AnswerAccepted { actor: User, answer: Answer },
    /// 文章收到评论，文章本身由外部服务管理
    ArticleCommented { actor: User, article: ActionObject },
}

impl DomainEvent {
    fn actor(&self) -> &User {
        match self {
            DomainEvent::NewsLiked { actor, .. }
            | DomainEvent::NewsReplied { actor, .. }
            | DomainEvent::AnswerAccepted { actor, .. }
            | DomainEvent::ArticleCommented { actor, .. } => actor,
        }
    }

    /// (动词, 接收者 ID, 动作对象, 推送路由)
    fn describe(&self) -> (Verb, String, ActionObject, Routing) {
        match self {
            DomainEvent::NewsLiked { post, .. } => (
                Verb::Like,
                post.author_id.clone(),
                ActionObject::new(ObjectKind::News, &post.id, &post.author_id),
                Routing::social_update(&post.id),
            ),
            DomainEvent::NewsReplied { parent, .. } => (
                Verb::Reply,
                parent.author_id.clone(),
                ActionObject::new(ObjectKind::News, &parent.id, &parent.author_id),
                Routing::social_update(&parent.id),
            ),
            DomainEvent::AnswerAccepted { answer, .. } => (
                Verb::AcceptAnswer,
                answer.author_id.clone(),
                ActionObject::new(ObjectKind::Answer, &answer.id, &answer.author_id),
                Routing::default(),
            ),
            DomainEvent::ArticleCommented { article, .. } => (
                Verb::Comment,
                article.owner_id.clone(),
                article.clone(),
                Routing::default(),
            ),
        }
    }
}

/// 通知管道：持久化通知并向 `notifications` 组广播
#[derive(Clone)]
pub struct NotificationService {
    db: Arc<Database>,
    broker: Arc<dyn Broker>,
    policy: NotificationPolicy,
    recent_limit: usize,
}

impl NotificationService {
    pub async fn new(db: Arc<Database>, broker: Arc<dyn Broker>, config: &Config) -> Result<Self> {
        Ok(Self {
            db,
            broker,
            policy: config.notification_policy,
            recent_limit: config.recent_notifications_limit,
        })
    }

    pub fn policy(&self) -> NotificationPolicy {
        self.policy
    }

    /// 按策略判定后创建通知并广播，不满足条件时返回 `None` 且没有任何副作用
    pub async fn notify(
        &self,
        actor: &User,
        recipient: &User,
        verb: Verb,
        action_object: &ActionObject,
        routing: Routing,
    ) -> Result<Option<Notification>> {
        if !self.policy.should_notify(&actor.id, &recipient.id, action_object) {
            debug!(
                "Skipping {} notification: actor {} recipient {} object owner {}",
                verb, actor.id, recipient.id, action_object.owner_id
            );
            return Ok(None);
        }

        let id = Uuid::new_v4().to_string();
        let notification = self.db.notifications.create(Notification {
            slug: notification_slug(&recipient.username, &id, verb),
            id,
            actor_id: actor.id.clone(),
            recipient_id: recipient.id.clone(),
            verb,
            action_object: action_object.clone(),
            unread: true,
            created_at: Utc::now(),
        })?;

        let payload = LivePayload::notification(routing.key(), routing.id_value.clone(), &actor.username);
        let delivered = self.broker.publish(NOTIFICATIONS_GROUP, payload).await;

        info!(
            "Notification {} created: {} {} {} ({} live session(s))",
            notification.slug, actor.username, verb.display_text(), recipient.username, delivered
        );
        Ok(Some(notification))
    }

    /// 处理领域事件。接收者只在需要通知时才被查询
    pub async fn dispatch(&self, event: DomainEvent) -> Result<Option<Notification>> {
        let (verb, recipient_id, action_object, routing) = event.describe();
        let actor = event.actor();

        if !self.policy.should_notify(&actor.id, &recipient_id, &action_object) {
            debug!("Event {:?} by {} produces no notification", verb, actor.username);
            return Ok(None);
        }

        let recipient = self.db.users.require(&recipient_id)?;
        self.notify(actor, &recipient, verb, &action_object, routing).await
    }

    /// 广播“有新动态”，不产生通知记录
    pub async fn broadcast_activity(&self, actor: &User) -> usize {
        let delivered = self
            .broker
            .publish(NOTIFICATIONS_GROUP, LivePayload::additional_news(&actor.username))
            .await;
        debug!("Activity of {} broadcast to {} session(s)", actor.username, delivered);
        delivered
    }

    fn for_recipient(&self, recipient_id: &str, unread: bool) -> Vec<Notification> {
        let mut notifications = self
            .db
            .notifications
            .filter(|n| n.recipient_id == recipient_id && n.unread == unread);
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications
    }

    /// 未读通知，最新在前
    pub fn unread(&self, recipient_id: &str) -> Vec<Notification> {
        self.for_recipient(recipient_id, true)
    }

    pub fn read(&self, recipient_id: &str) -> Vec<Notification> {
        self.for_recipient(recipient_id, false)
    }

    /// 最近的未读通知（导航栏下拉）
    pub fn most_recent(&self, recipient_id: &str) -> Vec<Notification> {
        let mut notifications = self.unread(recipient_id);
        notifications.truncate(self.recent_limit);
        notifications
    }

    pub fn unread_count(&self, recipient_id: &str) -> usize {
        self.db
            .notifications
            .count(|n| n.recipient_id == recipient_id && n.unread)
    }

    /// 按 slug 标为已读，只有接收者本人可以操作；重复标记无副作用
    pub fn mark_one_read(&self, slug: &str, recipient_id: &str) -> Result<Notification> {
        let notification = self
            .db
            .notifications
            .find_one(|n| n.slug == slug)
            .ok_or_else(|| AppError::not_found("Notification"))?;

        if notification.recipient_id != recipient_id {
            return Err(AppError::forbidden("Only the recipient can mark a notification as read"));
        }

        self.db.notifications.update(&notification.id, |n| {
            n.unread = false;
            n.clone()
        })
    }

    /// 全部标为已读，返回本次实际变更的条数
    pub fn mark_all_read(&self, recipient_id: &str) -> usize {
        let changed = self.set_unread(recipient_id, false);
        info!("Marked {} notification(s) read for {}", changed, recipient_id);
        changed
    }

    pub fn mark_all_unread(&self, recipient_id: &str) -> usize {
        let changed = self.set_unread(recipient_id, true);
        info!("Marked {} notification(s) unread for {}", changed, recipient_id);
        changed
    }

    fn set_unread(&self, recipient_id: &str, unread: bool) -> usize {
        self.db.notifications.update_where(
            |n| n.recipient_id == recipient_id,
            |n| {
                if n.unread == unread {
                    return false;
                }
                n.unread = unread;
                true
            },
        )
    }
}
