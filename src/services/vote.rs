use crate::{
    error::{AppError, Result},
    models::vote::{Vote, VoteChange, VoteOutcome, VoteTarget},
    services::Database,
};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::{debug, info};

/// 投票聚合查询
pub trait VoteTally {
    /// 赞同票 - 反对票
    fn total_votes(&self, target: &VoteTarget) -> i64;
    fn upvoters(&self, target: &VoteTarget) -> Vec<String>;
    fn downvoters(&self, target: &VoteTarget) -> Vec<String>;
}

/// 问题/回答投票账本
#[derive(Clone)]
pub struct VoteLedger {
    db: Arc<Database>,
}

impl VoteLedger {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 投票。与已有票同值时撤销，否则写入（新建或改票），返回当前得票
    pub async fn cast_vote(&self, user_id: &str, target: &VoteTarget, value: bool) -> Result<VoteOutcome> {
        if !self.db.target_exists(target) {
            return Err(AppError::NotFound(format!(
                "{:?} {} not found",
                target.kind(),
                target.id()
            )));
        }

        let change = {
            let votes = self.db.votes.entry(target.clone()).or_default().downgrade();
            // (user, target) 的读-判-写在同一个条目锁内完成
            let change = match votes.entry(user_id.to_string()) {
                Entry::Occupied(existing) if existing.get().value == value => {
                    existing.remove();
                    VoteChange::Removed
                }
                Entry::Occupied(mut existing) => {
                    let vote = existing.get_mut();
                    vote.value = value;
                    vote.updated_at = Utc::now();
                    VoteChange::Flipped
                }
                Entry::Vacant(slot) => {
                    let now = Utc::now();
                    slot.insert(Vote {
                        user_id: user_id.to_string(),
                        target: target.clone(),
                        value,
                        created_at: now,
                        updated_at: now,
                    });
                    VoteChange::Created
                }
            };
            change
        };

        let votes = self.total_votes(target);
        info!(
            "User {} voted {} on {:?} {}: {:?}, score {}",
            user_id,
            if value { "up" } else { "down" },
            target.kind(),
            target.id(),
            change,
            votes
        );

        Ok(VoteOutcome { change, votes })
    }

    /// 用户在目标上的当前票
    pub fn vote_of(&self, user_id: &str, target: &VoteTarget) -> Option<Vote> {
        self.db
            .votes
            .get(target)
            .and_then(|votes| votes.get(user_id).map(|vote| vote.value().clone()))
    }

    /// 目标上的票数（行数）
    pub fn vote_count(&self, target: &VoteTarget) -> usize {
        self.db.votes.get(target).map(|votes| votes.len()).unwrap_or(0)
    }

    fn voters(&self, target: &VoteTarget, value: bool) -> Vec<String> {
        let mut voters: Vec<String> = self
            .db
            .votes
            .get(target)
            .map(|votes| {
                votes
                    .iter()
                    .filter(|vote| vote.value().value == value)
                    .map(|vote| vote.key().clone())
                    .collect()
            })
            .unwrap_or_default();
        voters.sort();
        voters
    }
}

impl VoteTally for VoteLedger {
    fn total_votes(&self, target: &VoteTarget) -> i64 {
        let Some(votes) = self.db.votes.get(target) else {
            return 0;
        };
        let score = votes
            .iter()
            .map(|vote| if vote.value().value { 1i64 } else { -1i64 })
            .sum();
        debug!("Score for {:?} {}: {}", target.kind(), target.id(), score);
        score
    }

    fn upvoters(&self, target: &VoteTarget) -> Vec<String> {
        self.voters(target, true)
    }

    fn downvoters(&self, target: &VoteTarget) -> Vec<String> {
        self.voters(target, false)
    }
}
