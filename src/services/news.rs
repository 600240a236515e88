use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        news::{Interactions, LikeToggle, News, NewsThread},
        response::Page,
        user::User,
    },
    services::{
        notification::{DomainEvent, NotificationService},
        Database,
    },
};
use chrono::Utc;
use std::{collections::BTreeSet, sync::Arc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 首页动态与回复讨论串
#[derive(Clone)]
pub struct NewsService {
    db: Arc<Database>,
    notifications: NotificationService,
    max_post_length: usize,
}

impl NewsService {
    pub async fn new(db: Arc<Database>, notifications: NotificationService, config: &Config) -> Result<Self> {
        Ok(Self {
            db,
            notifications,
            max_post_length: config.max_post_length,
        })
    }

    fn validate_content(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("Content cannot be empty".to_string()));
        }
        if text.chars().count() > self.max_post_length {
            return Err(AppError::Validation(format!(
                "Content exceeds {} characters",
                self.max_post_length
            )));
        }
        Ok(())
    }

    fn new_post(author: &User, parent_id: Option<String>, text: &str) -> News {
        let now = Utc::now();
        News {
            id: Uuid::new_v4().to_string(),
            author_id: author.id.clone(),
            reply: parent_id.is_some(),
            parent_id,
            content: text.to_string(),
            liked: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 发布根动态，并向所有在线用户广播“有新动态”
    pub async fn post_news(&self, author: &User, text: &str) -> Result<News> {
        self.validate_content(text)?;

        let news = self.db.news.create(Self::new_post(author, None, text))?;
        let delivered = self.notifications.broadcast_activity(author).await;

        info!("News {} posted by {} ({} live session(s))", news.id, author.username, delivered);
        Ok(news)
    }

    pub fn get_news(&self, news_id: &str) -> Result<News> {
        self.db.news.require(news_id)
    }

    /// 所在讨论串的根动态（根动态返回自身）
    pub fn get_root(&self, news: &News) -> Result<News> {
        match &news.parent_id {
            Some(parent_id) => self.db.news.require(parent_id),
            None => Ok(news.clone()),
        }
    }

    /// 回复一条动态。回复永远挂在根动态下，讨论串保持一层
    pub async fn reply(&self, news_id: &str, author: &User, text: &str) -> Result<News> {
        self.validate_content(text)?;

        let target = self.db.news.require(news_id)?;
        let root = self.get_root(&target)?;
        let reply = self
            .db
            .news
            .create(Self::new_post(author, Some(root.id.clone()), text))?;
        // 根动态可能在读取之后被并发删除；级联删除先删根再删回复，这里补删即可
        if !self.db.news.contains(&root.id) {
            self.db.news.delete(&reply.id);
            return Err(AppError::not_found("News"));
        }
        debug!("Reply {} attached to root {}", reply.id, root.id);

        self.emit(DomainEvent::NewsReplied {
            actor: author.clone(),
            parent: root,
        })
        .await;
        Ok(reply)
    }

    /// 讨论串：根动态下的全部回复，最新在前
    pub fn thread_of(&self, news_id: &str) -> Result<NewsThread> {
        let target = self.db.news.require(news_id)?;
        let root = self.get_root(&target)?;
        Ok(NewsThread {
            thread: self.replies_of(&root.id),
            root,
        })
    }

    fn replies_of(&self, root_id: &str) -> Vec<News> {
        let mut replies = self
            .db
            .news
            .filter(|n| n.parent_id.as_deref() == Some(root_id));
        replies.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        replies
    }

    /// 点赞/取消点赞，在行锁内切换；新增点赞时派发事件
    pub async fn toggle_like(&self, news_id: &str, user: &User) -> Result<LikeToggle> {
        let (toggle, post) = self.db.news.update(news_id, |news| {
            let liked = if news.liked.remove(&user.id) {
                false
            } else {
                news.liked.insert(user.id.clone());
                true
            };
            (
                LikeToggle {
                    liked,
                    likes: news.like_count(),
                },
                news.clone(),
            )
        })?;

        debug!(
            "User {} {} news {} ({} likes)",
            user.username,
            if toggle.liked { "liked" } else { "unliked" },
            news_id,
            toggle.likes
        );

        if toggle.liked {
            self.emit(DomainEvent::NewsLiked {
                actor: user.clone(),
                post,
            })
            .await;
        }
        Ok(toggle)
    }

    /// 删除动态，仅作者本人；删除根动态时连同其回复一起删除
    pub fn delete_news(&self, news_id: &str, user: &User) -> Result<usize> {
        let news = self.db.news.require(news_id)?;
        if news.author_id != user.id {
            return Err(AppError::forbidden("Only the author can delete this post"));
        }

        let mut removed = usize::from(self.db.news.delete(news_id).is_some());
        if news.is_root() {
            removed += self
                .db
                .news
                .delete_where(|n| n.parent_id.as_deref() == Some(news_id));
        }

        info!("News {} deleted by {} ({} row(s))", news_id, user.username, removed);
        Ok(removed)
    }

    /// 点赞数和回复数，客户端收到 `social_update` 后据此刷新
    pub fn interactions(&self, news_id: &str) -> Result<Interactions> {
        let news = self.db.news.require(news_id)?;
        let root = self.get_root(&news)?;
        Ok(Interactions {
            likes: news.like_count(),
            comments: self
                .db
                .news
                .count(|n| n.parent_id.as_deref() == Some(root.id.as_str())),
        })
    }

    pub fn likers(&self, news_id: &str) -> Result<Vec<User>> {
        let news = self.db.news.require(news_id)?;
        Ok(news
            .liked
            .iter()
            .filter_map(|user_id| self.db.users.get(user_id))
            .collect())
    }

    /// 根动态列表，最新在前
    pub fn list_roots(&self, page: Page) -> Vec<News> {
        let mut roots = self.db.news.filter(News::is_root);
        roots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        page.slice(roots)
    }

    async fn emit(&self, event: DomainEvent) {
        if let Err(e) = self.notifications.dispatch(event).await {
            warn!("Failed to dispatch news notification: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{notification::NotificationPolicy, websocket::LivePayload};
    use crate::services::broker::MockBroker;

    async fn service_with(broker: MockBroker, policy: NotificationPolicy) -> (Arc<Database>, NewsService) {
        let db = Arc::new(Database::new());
        let config = Config {
            notification_policy: policy,
            ..Config::default()
        };
        let notifications = NotificationService::new(db.clone(), Arc::new(broker), &config)
            .await
            .unwrap();
        let service = NewsService::new(db.clone(), notifications, &config).await.unwrap();
        (db, service)
    }

    fn users(db: &Database) -> (User, User) {
        (
            db.users.upsert(User::new("u-alice", "alice")),
            db.users.upsert(User::new("u-bob", "bob")),
        )
    }

    fn quiet_broker() -> MockBroker {
        let mut broker = MockBroker::new();
        broker
            .expect_publish()
            .withf(|_, payload| matches!(payload, LivePayload::Activity(_)))
            .returning(|_, _| 0);
        broker
    }

    #[tokio::test]
    async fn test_post_news_broadcasts_activity() {
        let mut broker = MockBroker::new();
        broker
            .expect_publish()
            .withf(|group, payload| {
                group.to_string() == "notifications" && *payload == LivePayload::additional_news("alice")
            })
            .times(1)
            .returning(|_, _| 1);
        let (db, service) = service_with(broker, NotificationPolicy::Literal).await;
        let (alice, _) = users(&db);

        let news = service.post_news(&alice, "first!").await.unwrap();
        assert!(news.is_root());
        assert!(!news.reply);
    }

    #[tokio::test]
    async fn test_blank_post_and_reply_are_rejected() {
        let mut broker = MockBroker::new();
        broker.expect_publish().never();
        let (db, service) = service_with(broker, NotificationPolicy::Literal).await;
        let (alice, _) = users(&db);

        assert!(matches!(service.post_news(&alice, "  ").await, Err(AppError::Validation(_))));
        assert!(db.news.is_empty());
    }

    #[tokio::test]
    async fn test_reply_threads_stay_flat() {
        let (db, service) = service_with(quiet_broker(), NotificationPolicy::Literal).await;
        let (alice, bob) = users(&db);

        let n0 = service.post_news(&alice, "root").await.unwrap();
        let n1 = service.reply(&n0.id, &bob, "first reply").await.unwrap();
        let n2 = service.reply(&n1.id, &alice, "reply to reply").await.unwrap();

        assert_eq!(n1.parent_id.as_deref(), Some(n0.id.as_str()));
        assert_eq!(n2.parent_id.as_deref(), Some(n0.id.as_str()));
        assert!(n1.reply && n2.reply);

        let thread = service.thread_of(&n2.id).unwrap();
        assert_eq!(thread.root.id, n0.id);
        assert_eq!(service.thread_of(&n1.id).unwrap(), service.thread_of(&n0.id).unwrap());
        assert_eq!(thread, service.thread_of(&n0.id).unwrap());
        let ids: Vec<_> = thread.thread.iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&n1.id) && ids.contains(&n2.id));

        assert_eq!(service.interactions(&n0.id).unwrap().comments, 2);
        assert!(matches!(
            service.reply(&n0.id, &bob, "").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.reply("missing", &bob, "hi").await,
            Err(AppError::NotFound(_))
        ));

        // 回复不出现在根动态列表里
        let roots = service.list_roots(Page::new(None, 10));
        assert_eq!(roots.len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_like_is_reversible() {
        let (db, service) = service_with(quiet_broker(), NotificationPolicy::Literal).await;
        let (alice, bob) = users(&db);
        let news = service.post_news(&alice, "like me").await.unwrap();

        let liked = service.toggle_like(&news.id, &bob).await.unwrap();
        assert_eq!(liked, LikeToggle { liked: true, likes: 1 });
        assert_eq!(service.likers(&news.id).unwrap(), vec![bob.clone()]);

        let unliked = service.toggle_like(&news.id, &bob).await.unwrap();
        assert_eq!(unliked, LikeToggle { liked: false, likes: 0 });
        assert!(service.likers(&news.id).unwrap().is_empty());

        // 字面判定下，别人点赞不会通知作者
        assert!(db.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_like_notifies_author_under_owner_only_policy() {
        let mut broker = quiet_broker();
        broker
            .expect_publish()
            .withf(|_, payload| matches!(payload, LivePayload::Notification(push) if push.key == "social_update"))
            .times(1)
            .returning(|_, _| 1);
        let (db, service) = service_with(broker, NotificationPolicy::OwnerOnly).await;
        let (alice, bob) = users(&db);
        let news = service.post_news(&alice, "like me").await.unwrap();

        service.toggle_like(&news.id, &bob).await.unwrap();
        // 取消点赞不产生通知
        service.toggle_like(&news.id, &bob).await.unwrap();

        let notifications = db.notifications.filter(|n| n.recipient_id == alice.id);
        assert_eq!(notifications.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_likes_are_counted_once_each() {
        let (db, service) = service_with(quiet_broker(), NotificationPolicy::Literal).await;
        let (alice, _) = users(&db);
        let news = service.post_news(&alice, "popular").await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..32 {
            let service = service.clone();
            let id = news.id.clone();
            let user = db.users.upsert(User::new(format!("u{}", i), format!("user{}", i)));
            tasks.push(tokio::spawn(async move { service.toggle_like(&id, &user).await.unwrap() }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(service.interactions(&news.id).unwrap().likes, 32);
    }

    #[tokio::test]
    async fn test_delete_news_is_author_only_and_cascades() {
        let (db, service) = service_with(quiet_broker(), NotificationPolicy::Literal).await;
        let (alice, bob) = users(&db);

        let root = service.post_news(&alice, "root").await.unwrap();
        let reply = service.reply(&root.id, &bob, "reply").await.unwrap();

        assert!(matches!(
            service.delete_news(&root.id, &bob),
            Err(AppError::Authorization(_))
        ));
        assert_eq!(service.delete_news(&reply.id, &bob).unwrap(), 1);

        service.reply(&root.id, &bob, "again").await.unwrap();
        assert_eq!(service.delete_news(&root.id, &alice).unwrap(), 2);
        assert!(db.news.is_empty());

        assert!(matches!(
            service.reply(&root.id, &bob, "too late").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_replies_never_outlive_a_deleted_root() {
        let (db, service) = service_with(quiet_broker(), NotificationPolicy::Literal).await;
        let (alice, bob) = users(&db);

        for _ in 0..50 {
            let root = service.post_news(&alice, "short lived").await.unwrap();
            let replier = {
                let service = service.clone();
                let (id, bob) = (root.id.clone(), bob.clone());
                tokio::spawn(async move {
                    for _ in 0..4 {
                        let _ = service.reply(&id, &bob, "racing").await;
                    }
                })
            };
            let deleter = {
                let service = service.clone();
                let (id, alice) = (root.id.clone(), alice.clone());
                tokio::spawn(async move { service.delete_news(&id, &alice) })
            };
            replier.await.unwrap();
            deleter.await.unwrap().unwrap();
        }

        // 没有指向已删除根动态的回复
        let replies = db.news.filter(|n| n.reply);
        assert!(replies
            .iter()
            .all(|n| n.parent_id.as_deref().map_or(false, |root| db.news.contains(root))));
        assert!(db.news.is_empty());
    }
}
