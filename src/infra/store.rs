//! Storage seam for the moderation core.
//!
//! Every ledger-affecting action runs inside one [`StoreTx`]. Dropping a
//! transaction without calling [`StoreTx::commit`] discards everything it
//! staged, so a failure at any step leaves ledgers and counters untouched.
//!
//! Read-only listings live on [`Store`] and only ever return visible rows.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::counts::Counts;
use crate::domain::engagement::Vote;
use crate::domain::interpretation::{Interpretation, Reply};
use crate::domain::moderation::Flag;
use crate::domain::subject::{Subject, SubjectKind, SubjectRef};
use crate::domain::verse::{Reference, Verse, VerseCoordinate};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Self::UniqueViolation;
            }
        }
        Self::Unavailable(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub type SharedStore = Arc<dyn Store>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    async fn ping(&self) -> StoreResult<()>;

    async fn find_verse(&self, verse_id: Uuid) -> StoreResult<Option<Verse>>;

    async fn find_verse_at(&self, coordinate: &VerseCoordinate) -> StoreResult<Option<Verse>>;

    /// Returns the interpretation regardless of visibility.
    async fn find_interpretation(&self, id: Uuid) -> StoreResult<Option<Interpretation>>;

    /// Returns the reply regardless of visibility.
    async fn find_reply(&self, id: Uuid) -> StoreResult<Option<Reply>>;

    /// Visible interpretations for a verse, newest first, keyset-paginated on
    /// (created_at, id).
    async fn list_interpretations(
        &self,
        verse_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> StoreResult<Vec<Interpretation>>;

    /// Visible replies for an interpretation, oldest first.
    async fn list_replies(&self, interpretation_id: Uuid) -> StoreResult<Vec<Reply>>;

    async fn counts(&self, subject: SubjectRef) -> StoreResult<Option<Counts>>;

    async fn counts_many(&self, kind: SubjectKind, ids: &[Uuid]) -> StoreResult<Vec<Counts>>;

    /// Visible references whose target is the given verse.
    async fn list_inbound_references(&self, verse_id: Uuid) -> StoreResult<Vec<Reference>>;
}

#[async_trait]
pub trait StoreTx: Send {
    /// Loads the subject and holds a write lock on it until the transaction
    /// ends, serializing concurrent recomputations for the same subject.
    async fn lock_subject(&mut self, subject: SubjectRef) -> StoreResult<Option<Subject>>;

    /// Fails with [`StoreError::UniqueViolation`] if the voter already voted.
    async fn insert_vote(&mut self, vote: &Vote) -> StoreResult<()>;

    /// Fails with [`StoreError::UniqueViolation`] if the reporter already flagged.
    async fn insert_flag(&mut self, flag: &Flag) -> StoreResult<()>;

    async fn count_votes(&mut self, subject: SubjectRef) -> StoreResult<i64>;

    async fn count_flags(&mut self, subject: SubjectRef) -> StoreResult<i64>;

    async fn count_visible_replies(&mut self, interpretation_id: Uuid) -> StoreResult<i64>;

    async fn upsert_counts(&mut self, counts: &Counts) -> StoreResult<()>;

    /// Marks the subject hidden. Returns false if it was already hidden.
    async fn hide_subject(&mut self, subject: SubjectRef) -> StoreResult<bool>;

    /// Hides every reference extracted from the interpretation.
    async fn hide_references_from(&mut self, interpretation_id: Uuid) -> StoreResult<u64>;

    async fn find_visible_interpretation_by(
        &mut self,
        verse_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Uuid>>;

    /// Fails with [`StoreError::UniqueViolation`] if the author already has a
    /// visible interpretation on the verse.
    async fn insert_interpretation(&mut self, interpretation: &Interpretation) -> StoreResult<()>;

    async fn insert_reply(&mut self, reply: &Reply) -> StoreResult<()>;

    async fn find_verse_at(&mut self, coordinate: &VerseCoordinate) -> StoreResult<Option<Verse>>;

    async fn insert_reference(&mut self, reference: &Reference) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
