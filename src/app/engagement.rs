use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::actor::Actor;
use crate::app::counters;
use crate::app::error::{ActionError, ActionResult};
use crate::app::locks::{ActionKind, ActionLocks};
use crate::app::moderation;
use crate::domain::counts::Counts;
use crate::domain::engagement::Vote;
use crate::domain::subject::SubjectRef;
use crate::infra::store::{SharedStore, StoreError};

#[derive(Debug, Clone, Serialize)]
pub struct VoteRecorded {
    pub vote: Vote,
    pub counts: Counts,
}

/// The vote ledger. Votes are one per (subject, voter) and cannot be taken
/// back.
#[derive(Clone)]
pub struct EngagementService {
    store: SharedStore,
    locks: ActionLocks,
}

impl EngagementService {
    pub fn new(store: SharedStore, locks: ActionLocks) -> Self {
        Self { store, locks }
    }

    pub async fn cast_vote(&self, actor: Actor, subject: SubjectRef) -> ActionResult<VoteRecorded> {
        let voter_id = actor.require()?;
        let _permit = self
            .locks
            .acquire(subject.id, voter_id, ActionKind::Vote)
            .await;

        let mut tx = self.store.begin().await?;
        let target = moderation::lock_reachable(tx.as_mut(), subject).await?;

        let vote = Vote {
            id: Uuid::new_v4(),
            subject: target.subject_ref(),
            voter_id,
            created_at: OffsetDateTime::now_utc(),
        };
        match tx.insert_vote(&vote).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation) => return Err(ActionError::AlreadyVoted),
            Err(err) => return Err(err.into()),
        }

        let counts = counters::recompute(tx.as_mut(), subject).await?;
        tx.commit().await?;

        tracing::debug!(
            voter_id = %voter_id,
            subject_id = %subject.id,
            kind = subject.kind.as_db(),
            upvotes = counts.upvote_count,
            "vote recorded"
        );

        Ok(VoteRecorded { vote, counts })
    }
}
