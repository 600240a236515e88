pub mod database;
pub mod auth;
pub mod user;
pub mod broker;
pub mod session;
pub mod vote;
pub mod notification;
pub mod news;
pub mod qa;
pub mod message;

// 重新导出常用类型
pub use database::Database;
pub use auth::AuthService;
pub use user::UserService;
pub use broker::{Broker, LocalBroker};
pub use session::ConnectionSession;
pub use vote::{VoteLedger, VoteTally};
pub use notification::{DomainEvent, NotificationService};
pub use news::NewsService;
pub use qa::QuestionService;
pub use message::MessageService;
