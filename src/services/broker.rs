use crate::models::websocket::{BrokerStats, GroupStats, LivePayload, SessionFrame};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::{collections::HashMap, fmt, sync::Arc};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// 会话唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

/// 组成员的投递句柄
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub tx: mpsc::UnboundedSender<SessionFrame>,
}

impl SessionHandle {
    pub fn new(tx: mpsc::UnboundedSender<SessionFrame>) -> Self {
        Self {
            id: SessionId::new(),
            tx,
        }
    }
}

/// 组发布/订阅。
///
/// `publish` 只投递给调用时刻已在组内的会话；单个成员投递失败不影响其他成员，
/// 也不会作为错误返回。同一个组内的发布按调用顺序投递。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Broker: Send + Sync {
    /// 幂等加入
    async fn join(&self, group: &str, session: &SessionHandle);

    /// 幂等离开，不在组内时为空操作
    async fn leave(&self, group: &str, session: SessionId);

    /// 返回接受投递的成员数
    async fn publish(&self, group: &str, payload: LivePayload) -> usize;

    async fn member_count(&self, group: &str) -> usize;
}

#[derive(Default)]
struct Group {
    members: Mutex<HashMap<SessionId, mpsc::UnboundedSender<SessionFrame>>>,
}

/// 进程内 Broker。
///
/// 组表用 DashMap 分片，每个组的成员表有自己的锁；一次发布在持有该组锁的
/// 情况下完成全部投递，因此同组发布串行、不同组互不阻塞。
/// 加锁顺序固定为“分片锁 -> 组锁”，发布只持有组锁。
#[derive(Clone, Default)]
pub struct LocalBroker {
    groups: Arc<DashMap<String, Arc<Group>>>,
}

impl LocalBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn join_group(&self, group: &str, session: &SessionHandle) -> bool {
        // 在分片锁内写入成员，避免与空组回收交错
        let entry = self.groups.entry(group.to_string()).or_default();
        let inserted = entry
            .members
            .lock()
            .insert(session.id, session.tx.clone())
            .is_none();
        inserted
    }

    fn leave_group(&self, group: &str, session: SessionId) -> bool {
        let removed = match self.groups.get(group) {
            Some(entry) => entry.members.lock().remove(&session).is_some(),
            None => false,
        };
        self.groups
            .remove_if(group, |_, entry| entry.members.lock().is_empty());
        removed
    }

    fn publish_to(&self, group: &str, payload: LivePayload) -> usize {
        let Some(entry) = self.groups.get(group).map(|entry| Arc::clone(entry.value())) else {
            debug!("Publish to empty group: {}", group);
            return 0;
        };

        let frame = Arc::new(payload);
        let mut members = entry.members.lock();
        let mut delivered = 0;
        members.retain(|session, tx| match tx.send(SessionFrame::Live(Arc::clone(&frame))) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                warn!("Dropping closed session {} from group {}", session, group);
                false
            }
        });

        debug!("Published to group {} ({} members)", group, delivered);
        delivered
    }

    /// 当前组及成员统计
    pub fn stats(&self) -> BrokerStats {
        let groups: Vec<GroupStats> = self
            .groups
            .iter()
            .map(|entry| GroupStats {
                group: entry.key().clone(),
                members: entry.value().members.lock().len(),
            })
            .collect();

        BrokerStats {
            total_groups: groups.len(),
            total_memberships: groups.iter().map(|g| g.members).sum(),
            groups,
        }
    }
}

#[async_trait]
impl Broker for LocalBroker {
    async fn join(&self, group: &str, session: &SessionHandle) {
        if self.join_group(group, session) {
            debug!("Session {} joined group: {}", session.id, group);
        }
    }

    async fn leave(&self, group: &str, session: SessionId) {
        if self.leave_group(group, session) {
            debug!("Session {} left group: {}", session, group);
        }
    }

    async fn publish(&self, group: &str, payload: LivePayload) -> usize {
        self.publish_to(group, payload)
    }

    async fn member_count(&self, group: &str) -> usize {
        self.groups
            .get(group)
            .map(|entry| entry.members.lock().len())
            .unwrap_or(0)
    }
}
