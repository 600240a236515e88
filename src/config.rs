use serde::{Deserialize, Serialize};
use std::env;

use crate::models::notification::NotificationPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub log_level: String,

    // Authentication configuration
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,

    // Content settings
    pub max_post_length: usize,
    pub max_message_length: usize,
    pub news_per_page: usize,
    pub questions_per_page: usize,

    // Notification settings
    pub recent_notifications_limit: usize,
    pub notification_policy: NotificationPolicy,

    // CORS configuration
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "rainbow_qa=debug,tower_http=debug".to_string()),

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "168".to_string())
                .parse()?,

            max_post_length: env::var("MAX_POST_LENGTH")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,
            max_message_length: env::var("MAX_MESSAGE_LENGTH")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()?,
            news_per_page: env::var("NEWS_PER_PAGE")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,
            questions_per_page: env::var("QUESTIONS_PER_PAGE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,

            recent_notifications_limit: env::var("RECENT_NOTIFICATIONS_LIMIT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            notification_policy: env::var("NOTIFICATION_POLICY")
                .unwrap_or_else(|_| "literal".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            environment: "test".to_string(),
            log_level: "rainbow_qa=debug".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_hours: 1,
            max_post_length: 5000,
            max_message_length: 2000,
            news_per_page: 20,
            questions_per_page: 10,
            recent_notifications_limit: 5,
            notification_policy: NotificationPolicy::Literal,
            cors_allowed_origins: "http://localhost:3001".to_string(),
        }
    }
}
