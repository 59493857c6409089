use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::actor::Actor;
use crate::app::counters;
use crate::app::error::{ActionError, ActionResult};
use crate::app::gate::{ContentGate, SubmissionKind};
use crate::app::locks::{ActionKind, ActionLocks};
use crate::app::moderation;
use crate::app::references::ReferenceExtractor;
use crate::domain::counts::Counts;
use crate::domain::interpretation::{Interpretation, Reply};
use crate::domain::subject::{Subject, SubjectRef, Visibility};
use crate::domain::verse::Reference;
use crate::infra::store::{SharedStore, StoreError};

#[derive(Debug, Clone, Serialize)]
pub struct InterpretationCreated {
    pub interpretation: Interpretation,
    pub counts: Counts,
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyCreated {
    pub reply: Reply,
    pub counts: Counts,
    pub parent_counts: Counts,
}

#[derive(Clone)]
pub struct SubmissionService {
    store: SharedStore,
    locks: ActionLocks,
    gate: ContentGate,
    extractor: ReferenceExtractor,
}

impl SubmissionService {
    pub fn new(
        store: SharedStore,
        locks: ActionLocks,
        gate: ContentGate,
        extractor: ReferenceExtractor,
    ) -> Self {
        Self {
            store,
            locks,
            gate,
            extractor,
        }
    }

    pub async fn submit_interpretation(
        &self,
        actor: Actor,
        verse_id: Uuid,
        text: &str,
    ) -> ActionResult<InterpretationCreated> {
        let user_id = actor.require()?;
        let _permit = self
            .locks
            .acquire(verse_id, user_id, ActionKind::Interpretation)
            .await;

        let verse = self
            .store
            .find_verse(verse_id)
            .await?
            .ok_or(ActionError::NotFound("verse"))?;

        let mut tx = self.store.begin().await?;
        if tx
            .find_visible_interpretation_by(verse.id, user_id)
            .await?
            .is_some()
        {
            return Err(ActionError::DuplicateInterpretation);
        }

        let body = self.gate.validate(text, SubmissionKind::Interpretation)?;
        let interpretation = Interpretation {
            id: Uuid::new_v4(),
            verse_id: verse.id,
            user_id,
            body,
            visibility: Visibility::Visible,
            created_at: OffsetDateTime::now_utc(),
        };
        match tx.insert_interpretation(&interpretation).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation) => return Err(ActionError::DuplicateInterpretation),
            Err(err) => return Err(err.into()),
        }

        let counts = Counts::zero(SubjectRef::interpretation(interpretation.id));
        tx.upsert_counts(&counts).await?;

        let mut references = Vec::new();
        for extracted in self.extractor.extract(&interpretation.body) {
            let Some(target) = tx.find_verse_at(&extracted.target).await? else {
                tracing::debug!(
                    interpretation_id = %interpretation.id,
                    reference = %extracted.target,
                    "dropping reference to unknown verse"
                );
                continue;
            };
            let reference = Reference {
                id: Uuid::new_v4(),
                source_verse_id: verse.id,
                target_verse_id: target.id,
                interpretation_id: interpretation.id,
                user_id,
                reference_text: extracted.note,
                is_hidden: false,
                created_at: interpretation.created_at,
            };
            tx.insert_reference(&reference).await?;
            references.push(reference);
        }

        tx.commit().await?;

        tracing::debug!(
            user_id = %user_id,
            verse = %verse.coordinate(),
            interpretation_id = %interpretation.id,
            references = references.len(),
            "interpretation created"
        );

        Ok(InterpretationCreated {
            interpretation,
            counts,
            references,
        })
    }

    pub async fn submit_reply(
        &self,
        actor: Actor,
        interpretation_id: Uuid,
        text: &str,
    ) -> ActionResult<ReplyCreated> {
        let user_id = actor.require()?;
        let body = self.gate.validate(text, SubmissionKind::Reply)?;
        let _permit = self
            .locks
            .acquire(interpretation_id, user_id, ActionKind::Reply)
            .await;

        let parent_ref = SubjectRef::interpretation(interpretation_id);
        let mut tx = self.store.begin().await?;
        let parent = match tx.lock_subject(parent_ref).await? {
            Some(Subject::Interpretation(parent)) if !parent.visibility.is_hidden() => parent,
            _ => return Err(ActionError::NotFound("interpretation")),
        };

        let reply = Reply {
            id: Uuid::new_v4(),
            interpretation_id: parent.id,
            verse_id: parent.verse_id,
            user_id,
            body,
            visibility: Visibility::Visible,
            created_at: OffsetDateTime::now_utc(),
        };
        tx.insert_reply(&reply).await?;

        let counts = Counts::zero(SubjectRef::reply(reply.id));
        tx.upsert_counts(&counts).await?;
        let parent_counts = counters::recompute(tx.as_mut(), parent_ref).await?;
        tx.commit().await?;

        Ok(ReplyCreated {
            reply,
            counts,
            parent_counts,
        })
    }

    pub async fn delete_interpretation(&self, actor: Actor, id: Uuid) -> ActionResult<()> {
        self.delete_owned(actor, SubjectRef::interpretation(id)).await
    }

    pub async fn delete_reply(&self, actor: Actor, id: Uuid) -> ActionResult<()> {
        self.delete_owned(actor, SubjectRef::reply(id)).await
    }

    /// Owner deletion is a soft hide with the same cascades as a policy hide.
    async fn delete_owned(&self, actor: Actor, subject: SubjectRef) -> ActionResult<()> {
        let user_id = actor.require()?;
        let _permit = self
            .locks
            .acquire(subject.id, user_id, ActionKind::Delete)
            .await;

        let mut tx = self.store.begin().await?;
        let target = tx
            .lock_subject(subject)
            .await?
            .filter(|target| !target.is_hidden())
            .ok_or(ActionError::NotFound(subject.kind.as_db()))?;
        if target.owner_id() != user_id {
            return Err(ActionError::Forbidden);
        }

        moderation::hide(tx.as_mut(), &target).await?;
        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            subject_id = %subject.id,
            kind = subject.kind.as_db(),
            "subject deleted by owner"
        );
        Ok(())
    }
}
