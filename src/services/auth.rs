use crate::{
    config::Config,
    error::{AppError, Result},
    models::user::{Identity, User},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// 身份提供方签发的令牌声明
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // 用户ID
    pub username: String, // 用户名，私信组以此命名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub exp: i64, // 过期时间
    pub iat: i64, // 签发时间
}

#[derive(Clone)]
pub struct AuthService {
    config: Config,
}

impl AuthService {
    pub async fn new(config: &Config) -> Result<Self> {
        if config.jwt_secret.is_empty() {
            return Err(AppError::Internal("JWT secret is empty".to_string()));
        }
        Ok(Self {
            config: config.clone(),
        })
    }

    pub fn verify_jwt(&self, token: &str) -> Result<Claims> {
        let decoding_key = DecodingKey::from_secret(self.config.jwt_secret.as_ref());
        let validation = Validation::new(Algorithm::HS256);

        match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(token_data) => {
                debug!("JWT token verified for user: {}", token_data.claims.sub);
                Ok(token_data.claims)
            }
            Err(e) => {
                warn!("JWT verification failed: {}", e);
                Err(AppError::Authentication("Invalid token".to_string()))
            }
        }
    }

    /// 把可选令牌解析为身份；缺失或无效都视为匿名
    pub fn identify(&self, token: Option<&str>) -> Identity {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Identity::Anonymous;
        };

        match self.verify_jwt(token) {
            Ok(claims) => Identity::Authenticated(User {
                id: claims.sub,
                username: claims.username,
                display_name: claims.display_name,
                created_at: Utc::now(),
            }),
            Err(_) => Identity::Anonymous,
        }
    }

    /// 签发令牌（测试与本地联调用，线上由身份服务签发）
    pub fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            exp: (now + Duration::hours(self.config.jwt_expiry_hours)).timestamp(),
            iat: now.timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> AuthService {
        AuthService::new(&Config::default()).await.unwrap()
    }

    #[tokio::test]
    async fn test_issue_and_identify() {
        let auth = service().await;
        let token = auth.issue_token(&User::new("u1", "alice")).unwrap();

        let identity = auth.identify(Some(&token));
        let user = identity.user().unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_missing_or_bad_token_is_anonymous() {
        let auth = service().await;
        assert!(auth.identify(None).is_anonymous());
        assert!(auth.identify(Some("")).is_anonymous());
        assert!(auth.identify(Some("not-a-jwt")).is_anonymous());
        assert!(matches!(auth.verify_jwt("not-a-jwt"), Err(AppError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let other = AuthService::new(&Config {
            jwt_secret: "another-secret".to_string(),
            ..Config::default()
        })
        .await
        .unwrap();
        let token = other.issue_token(&User::new("u1", "alice")).unwrap();
        assert!(service().await.identify(Some(&token)).is_anonymous());
    }
}
