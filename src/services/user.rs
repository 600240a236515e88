use crate::{
    error::Result,
    models::user::User,
    services::Database,
};
use std::sync::Arc;
use tracing::debug;

/// 用户镜像。身份服务是用户资料的权威来源，这里只保存推送和权限判断需要的字段
#[derive(Clone)]
pub struct UserService {
    db: Arc<Database>,
}

impl UserService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 首次见到的用户写入镜像；已存在时同步用户名和昵称，保留创建时间
    pub fn upsert(&self, user: &User) -> User {
        match self.db.users.update(&user.id, |existing| {
            existing.username = user.username.clone();
            existing.display_name = user.display_name.clone();
            existing.clone()
        }) {
            Ok(updated) => updated,
            Err(_) => {
                debug!("Mirroring new user {} ({})", user.username, user.id);
                self.db.users.upsert(user.clone())
            }
        }
    }
}
