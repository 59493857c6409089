use std::collections::HashMap;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{ActionError, ActionResult};
use crate::domain::counts::Counts;
use crate::domain::interpretation::{InterpretationView, ReplyView};
use crate::domain::subject::{SubjectKind, SubjectRef};
use crate::domain::verse::{Reference, Verse, VerseCoordinate};
use crate::infra::store::SharedStore;

/// Read-side queries. Hidden subjects are indistinguishable from missing
/// ones here.
#[derive(Clone)]
pub struct ReadService {
    store: SharedStore,
}

impl ReadService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn lookup_verse(&self, coordinate: &VerseCoordinate) -> ActionResult<Verse> {
        self.store
            .find_verse_at(coordinate)
            .await?
            .ok_or(ActionError::NotFound("verse"))
    }

    pub async fn list_interpretations(
        &self,
        verse_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> ActionResult<Vec<InterpretationView>> {
        self.require_verse(verse_id).await?;

        let interpretations = self
            .store
            .list_interpretations(verse_id, cursor, limit)
            .await?;
        let ids: Vec<Uuid> = interpretations.iter().map(|i| i.id).collect();
        let mut counts = self.counts_by_id(SubjectKind::Interpretation, &ids).await?;

        Ok(interpretations
            .into_iter()
            .map(|interpretation| {
                let counts = counts
                    .remove(&interpretation.id)
                    .unwrap_or_else(|| Counts::zero(SubjectRef::interpretation(interpretation.id)));
                InterpretationView {
                    interpretation,
                    counts,
                }
            })
            .collect())
    }

    pub async fn list_replies(&self, interpretation_id: Uuid) -> ActionResult<Vec<ReplyView>> {
        self.store
            .find_interpretation(interpretation_id)
            .await?
            .filter(|interpretation| !interpretation.visibility.is_hidden())
            .ok_or(ActionError::NotFound("interpretation"))?;

        let replies = self.store.list_replies(interpretation_id).await?;
        let ids: Vec<Uuid> = replies.iter().map(|r| r.id).collect();
        let mut counts = self.counts_by_id(SubjectKind::Reply, &ids).await?;

        Ok(replies
            .into_iter()
            .map(|reply| {
                let counts = counts
                    .remove(&reply.id)
                    .unwrap_or_else(|| Counts::zero(SubjectRef::reply(reply.id)));
                ReplyView { reply, counts }
            })
            .collect())
    }

    pub async fn inbound_references(&self, verse_id: Uuid) -> ActionResult<Vec<Reference>> {
        self.require_verse(verse_id).await?;
        Ok(self.store.list_inbound_references(verse_id).await?)
    }

    pub async fn counts(&self, subject: SubjectRef) -> ActionResult<Counts> {
        let visible = match subject.kind {
            SubjectKind::Interpretation => self
                .store
                .find_interpretation(subject.id)
                .await?
                .is_some_and(|i| !i.visibility.is_hidden()),
            SubjectKind::Reply => self
                .store
                .find_reply(subject.id)
                .await?
                .is_some_and(|r| !r.visibility.is_hidden()),
        };
        if !visible {
            return Err(ActionError::NotFound(subject.kind.as_db()));
        }

        Ok(self
            .store
            .counts(subject)
            .await?
            .unwrap_or_else(|| Counts::zero(subject)))
    }

    async fn require_verse(&self, verse_id: Uuid) -> ActionResult<Verse> {
        self.store
            .find_verse(verse_id)
            .await?
            .ok_or(ActionError::NotFound("verse"))
    }

    async fn counts_by_id(
        &self,
        kind: SubjectKind,
        ids: &[Uuid],
    ) -> ActionResult<HashMap<Uuid, Counts>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let counts = self.store.counts_many(kind, ids).await?;
        Ok(counts
            .into_iter()
            .map(|counts| (counts.subject.id, counts))
            .collect())
    }
}
