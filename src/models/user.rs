use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// 社区用户（由身份服务提供，本服务只做镜像）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            display_name: None,
            created_at: Utc::now(),
        }
    }

    /// 页面展示名，没有昵称时回退到用户名
    pub fn profile_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// 一次连接或请求解析出的身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated(User),
    Anonymous,
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Authenticated(user) => Some(user),
            Identity::Anonymous => None,
        }
    }

    pub fn into_user(self) -> Option<User> {
        match self {
            Identity::Authenticated(user) => Some(user),
            Identity::Anonymous => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_name_falls_back_to_username() {
        let mut user = User::new("u1", "alice");
        assert_eq!(user.profile_name(), "alice");

        user.display_name = Some("  ".to_string());
        assert_eq!(user.profile_name(), "alice");

        user.display_name = Some("Alice L.".to_string());
        assert_eq!(user.profile_name(), "Alice L.");
    }

    #[test]
    fn test_identity_accessors() {
        let identity = Identity::Authenticated(User::new("u1", "alice"));
        assert!(!identity.is_anonymous());
        assert_eq!(identity.user().map(|u| u.username.as_str()), Some("alice"));
        assert!(Identity::Anonymous.into_user().is_none());
    }
}
