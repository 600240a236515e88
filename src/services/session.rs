use crate::{
    error::{AppError, Result},
    models::{
        user::{Identity, User},
        websocket::{ChannelKind, ClientFrame, SessionFrame},
    },
    services::broker::{Broker, SessionHandle, SessionId},
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::{collections::HashSet, fmt::Display, mem, sync::Arc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closed,
}

/// 一条客户端长连接。
///
/// 进入 Active 时按频道类型自动入组；关闭时必须退出所有已加入的组。
/// 正常路径由 [`ConnectionSession::close`] 完成，任务被取消时由 `Drop` 兜底。
pub struct ConnectionSession {
    handle: SessionHandle,
    user: User,
    channel: ChannelKind,
    state: SessionState,
    groups: HashSet<String>,
    broker: Arc<dyn Broker>,
    outbound: mpsc::UnboundedReceiver<SessionFrame>,
}

impl ConnectionSession {
    /// 建立会话。匿名身份直接拒绝，不创建会话
    pub async fn open(
        broker: Arc<dyn Broker>,
        identity: Identity,
        channel: ChannelKind,
    ) -> Result<Self> {
        let user = match identity {
            Identity::Authenticated(user) => user,
            Identity::Anonymous => {
                warn!("Refusing anonymous {:?} connection", channel);
                return Err(AppError::unauthorized("Anonymous connections are not accepted"));
            }
        };

        let (tx, outbound) = mpsc::unbounded_channel();
        let mut session = Self {
            handle: SessionHandle::new(tx),
            user,
            channel,
            state: SessionState::Connecting,
            groups: HashSet::new(),
            broker,
            outbound,
        };

        let group = channel.group_name(&session.user);
        session.join(&group).await;
        session.state = SessionState::Active;

        info!(
            "Session {} active for user {} on {:?} channel",
            session.handle.id, session.user.username, channel
        );
        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.handle.id
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn channel(&self) -> ChannelKind {
        self.channel
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }

    pub async fn join(&mut self, group: &str) {
        self.broker.join(group, &self.handle).await;
        self.groups.insert(group.to_string());
    }

    pub async fn leave(&mut self, group: &str) {
        if self.groups.remove(group) {
            self.broker.leave(group, self.handle.id).await;
        }
    }

    /// 客户端发来的内容原样回给自己（私信确认），不解析内容
    pub fn echo(&self, text: String) {
        if self.handle.tx.send(SessionFrame::Echo(text)).is_err() {
            debug!("Echo dropped, session {} outbound closed", self.handle.id);
        }
    }

    /// 取出下一帧出站数据
    pub async fn next_frame(&mut self) -> Option<SessionFrame> {
        self.outbound.recv().await
    }

    /// 关闭会话并退出所有组
    pub async fn close(mut self) {
        self.release().await;
    }

    async fn release(&mut self) {
        let groups = mem::take(&mut self.groups);
        for group in &groups {
            self.broker.leave(group, self.handle.id).await;
        }
        self.state = SessionState::Closed;
        debug!(
            "Session {} closed, left {} group(s)",
            self.handle.id,
            groups.len()
        );
    }

    /// 驱动会话直到客户端断开或出站写失败，退出前总会执行 `close`
    pub async fn serve<W, R>(mut self, writer: W, reader: R)
    where
        W: Sink<String>,
        W::Error: Display,
        R: Stream<Item = ClientFrame>,
    {
        futures::pin_mut!(writer);
        futures::pin_mut!(reader);

        loop {
            tokio::select! {
                frame = self.outbound.recv() => {
                    let Some(frame) = frame else { break };
                    let text = match frame.to_text() {
                        Ok(text) => text,
                        Err(e) => {
                            error!("Failed to serialize frame for session {}: {}", self.handle.id, e);
                            continue;
                        }
                    };
                    if let Err(e) = writer.send(text).await {
                        warn!("Session {} write failed: {}", self.handle.id, e);
                        break;
                    }
                }
                inbound = reader.next() => match inbound {
                    Some(ClientFrame::Text(text)) => self.echo(text),
                    Some(ClientFrame::Close) | None => {
                        debug!("Session {} client disconnected", self.handle.id);
                        break;
                    }
                },
            }
        }

        info!("Session {} for user {} closing", self.handle.id, self.user.username);
        self.close().await;
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        if self.groups.is_empty() {
            return;
        }

        let groups = mem::take(&mut self.groups);
        let broker = Arc::clone(&self.broker);
        let session = self.handle.id;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    for group in groups {
                        broker.leave(&group, session).await;
                    }
                });
            }
            Err(_) => error!(
                "Session {} dropped outside runtime with {} group(s) still joined",
                session,
                groups.len()
            ),
        }
    }
}
