use crate::{
    config::Config,
    error::Result,
    services::{
        broker::{Broker, LocalBroker},
        database::Database,
        auth::AuthService,
        user::UserService,
        vote::VoteLedger,
        notification::NotificationService,
        news::NewsService,
        qa::QuestionService,
        message::MessageService,
    },
    utils::markdown::{MarkdownRenderer, Renderer},
};
use std::sync::Arc;

/// 应用程序的共享状态
/// 包含所有服务和配置的引用
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 内存记录存储
    pub db: Arc<Database>,

    /// 组广播
    pub broker: Arc<dyn Broker>,

    /// 认证服务
    pub auth_service: AuthService,

    /// 用户服务
    pub user_service: UserService,

    /// 投票账本
    pub vote_ledger: VoteLedger,

    /// 通知服务
    pub notification_service: NotificationService,

    /// 首页动态服务
    pub news_service: NewsService,

    /// 问答服务
    pub question_service: QuestionService,

    /// 私信服务
    pub message_service: MessageService,
}

impl AppState {
    /// 用进程内 Broker 和 Markdown 渲染器装配所有服务
    pub async fn new(config: Config) -> Result<Self> {
        Self::with_broker(config, Arc::new(LocalBroker::new())).await
    }

    pub async fn with_broker(config: Config, broker: Arc<dyn Broker>) -> Result<Self> {
        let db = Arc::new(Database::new());
        let renderer: Arc<dyn Renderer> = Arc::new(MarkdownRenderer::new());

        let auth_service = AuthService::new(&config).await?;
        let user_service = UserService::new(db.clone()).await?;
        let vote_ledger = VoteLedger::new(db.clone()).await?;
        let notification_service = NotificationService::new(db.clone(), broker.clone(), &config).await?;
        let news_service = NewsService::new(db.clone(), notification_service.clone(), &config).await?;
        let question_service = QuestionService::new(
            db.clone(),
            notification_service.clone(),
            vote_ledger.clone(),
            &config,
        )
        .await?;
        let message_service = MessageService::new(db.clone(), broker.clone(), renderer, &config).await?;

        Ok(Self {
            config,
            db,
            broker,
            auth_service,
            user_service,
            vote_ledger,
            notification_service,
            news_service,
            question_service,
            message_service,
        })
    }

    /// 获取分页配置
    pub fn get_page_size(&self, resource_type: &str) -> usize {
        match resource_type {
            "news" => self.config.news_per_page,
            "questions" => self.config.questions_per_page,
            _ => 20, // 默认每页20条
        }
    }
}
