use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::actor::Actor;
use crate::app::counters;
use crate::app::error::{ActionError, ActionResult};
use crate::app::gate::{ContentGate, SubmissionKind};
use crate::app::locks::{ActionKind, ActionLocks};
use crate::app::policy::ModerationPolicy;
use crate::domain::counts::Counts;
use crate::domain::moderation::{Flag, FlagReason};
use crate::domain::subject::{Subject, SubjectRef, Visibility};
use crate::infra::store::{SharedStore, StoreError, StoreResult, StoreTx};

#[derive(Debug, Clone, Serialize)]
pub struct FlagRecorded {
    pub flag: Flag,
    pub counts: Counts,
    pub visibility: Visibility,
}

/// The flag ledger plus the report-threshold auto-hide.
#[derive(Clone)]
pub struct ModerationService {
    store: SharedStore,
    locks: ActionLocks,
    gate: ContentGate,
    policy: ModerationPolicy,
}

impl ModerationService {
    pub fn new(
        store: SharedStore,
        locks: ActionLocks,
        gate: ContentGate,
        policy: ModerationPolicy,
    ) -> Self {
        Self {
            store,
            locks,
            gate,
            policy,
        }
    }

    pub async fn cast_flag(
        &self,
        actor: Actor,
        subject: SubjectRef,
        reason: Option<&str>,
        explanation: Option<&str>,
    ) -> ActionResult<FlagRecorded> {
        let reporter_id = actor.require()?;
        let reason = reason
            .and_then(|reason| reason.parse::<FlagReason>().ok())
            .ok_or_else(|| {
                ActionError::ValidationFailed(
                    "reason must be one of spam, blasphemy, offensive".to_string(),
                )
            })?;
        let explanation = match explanation {
            Some(raw) => {
                let clean = self.gate.validate(raw, SubmissionKind::Explanation)?;
                (!clean.is_empty()).then_some(clean)
            }
            None => None,
        };

        let _permit = self
            .locks
            .acquire(subject.id, reporter_id, ActionKind::Flag)
            .await;

        let mut tx = self.store.begin().await?;
        let target = lock_reachable(tx.as_mut(), subject).await?;

        let flag = Flag {
            id: Uuid::new_v4(),
            subject,
            reporter_id,
            reason,
            explanation,
            created_at: OffsetDateTime::now_utc(),
        };
        match tx.insert_flag(&flag).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation) => return Err(ActionError::AlreadyFlagged),
            Err(err) => return Err(err.into()),
        }

        let counts = counters::recompute(tx.as_mut(), subject).await?;
        let visibility = self.policy.decide(subject.kind, counts.report_count);
        if visibility.is_hidden() && hide(tx.as_mut(), &target).await? {
            tracing::info!(
                subject_id = %subject.id,
                kind = subject.kind.as_db(),
                reports = counts.report_count,
                "subject hidden by report threshold"
            );
        }
        tx.commit().await?;

        Ok(FlagRecorded {
            flag,
            counts,
            visibility,
        })
    }

    /// Rebuilds a subject's counts from the ledgers and re-applies the
    /// policy. Used to reconcile caches after manual data fixes.
    pub async fn reconcile(&self, subject: SubjectRef) -> ActionResult<(Counts, Visibility)> {
        let mut tx = self.store.begin().await?;
        let target = tx
            .lock_subject(subject)
            .await?
            .ok_or(ActionError::NotFound(subject.kind.as_db()))?;

        let counts = counters::recompute(tx.as_mut(), subject).await?;
        let mut visibility = target.visibility();
        if self.policy.decide(subject.kind, counts.report_count).is_hidden() {
            if hide(tx.as_mut(), &target).await? {
                tracing::info!(
                    subject_id = %subject.id,
                    kind = subject.kind.as_db(),
                    reports = counts.report_count,
                    "subject hidden during reconciliation"
                );
            }
            visibility = Visibility::Hidden;
        }
        tx.commit().await?;

        Ok((counts, visibility))
    }
}

/// Hides `subject` along with everything that depends on its visibility.
/// Returns false when it was already hidden.
///
/// Locks the parent interpretation when hiding a reply, so callers must not
/// already hold a lock on the parent (reply before parent, never reverse).
/// Locks a subject that votes and flags may act on. Hidden subjects, and
/// replies under a hidden interpretation, are not found. Locks reply before
/// parent.
pub(crate) async fn lock_reachable(
    tx: &mut dyn StoreTx,
    subject: SubjectRef,
) -> ActionResult<Subject> {
    let not_found = || ActionError::NotFound(subject.kind.as_db());
    let target = tx
        .lock_subject(subject)
        .await?
        .filter(|target| !target.is_hidden())
        .ok_or_else(not_found)?;

    if let Subject::Reply(reply) = &target {
        let parent = SubjectRef::interpretation(reply.interpretation_id);
        let parent_visible = tx
            .lock_subject(parent)
            .await?
            .is_some_and(|parent| !parent.is_hidden());
        if !parent_visible {
            return Err(not_found());
        }
    }

    Ok(target)
}

pub(crate) async fn hide(tx: &mut dyn StoreTx, subject: &Subject) -> StoreResult<bool> {
    if !tx.hide_subject(subject.subject_ref()).await? {
        return Ok(false);
    }

    match subject {
        Subject::Interpretation(interpretation) => {
            let hidden = tx.hide_references_from(interpretation.id).await?;
            if hidden > 0 {
                tracing::debug!(
                    interpretation_id = %interpretation.id,
                    references = hidden,
                    "references hidden with interpretation"
                );
            }
        }
        Subject::Reply(reply) => {
            let parent = SubjectRef::interpretation(reply.interpretation_id);
            if tx.lock_subject(parent).await?.is_some() {
                counters::recompute(tx, parent).await?;
            }
        }
    }

    Ok(true)
}
