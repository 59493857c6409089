//! In-process store used by the test suite and `STORE_BACKEND=memory`.
//!
//! A transaction takes the store mutex for its whole lifetime and works on a
//! staged copy of the state, so writers are fully serialized and an
//! uncommitted transaction leaves nothing behind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::counts::Counts;
use crate::domain::engagement::Vote;
use crate::domain::interpretation::{Interpretation, Reply};
use crate::domain::moderation::Flag;
use crate::domain::subject::{Subject, SubjectKind, SubjectRef, Visibility};
use crate::domain::verse::{Reference, Verse, VerseCoordinate};
use crate::infra::store::{Store, StoreError, StoreResult, StoreTx};

#[derive(Clone, Default)]
struct MemoryState {
    verses: HashMap<Uuid, Verse>,
    interpretations: HashMap<Uuid, Interpretation>,
    replies: HashMap<Uuid, Reply>,
    votes: HashMap<(SubjectRef, Uuid), Vote>,
    flags: HashMap<(SubjectRef, Uuid), Flag>,
    counts: HashMap<SubjectRef, Counts>,
    references: Vec<Reference>,
}

impl MemoryState {
    fn find_verse_at(&self, coordinate: &VerseCoordinate) -> Option<Verse> {
        self.verses
            .values()
            .find(|verse| {
                verse.book == coordinate.book
                    && verse.chapter == coordinate.chapter
                    && verse.verse == coordinate.verse
            })
            .cloned()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_verse(&self, book: &str, chapter: i32, verse: i32, text: &str) -> Verse {
        let verse = Verse {
            id: Uuid::new_v4(),
            book: book.to_string(),
            chapter,
            verse,
            text: text.to_string(),
        };
        self.state
            .lock()
            .await
            .verses
            .insert(verse.id, verse.clone());
        verse
    }

    /// Makes the next commit fail as if the backend went away mid-action.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    pub async fn vote_count(&self, subject: SubjectRef) -> usize {
        let state = self.state.lock().await;
        state.votes.keys().filter(|(s, _)| *s == subject).count()
    }

    pub async fn flag_count(&self, subject: SubjectRef) -> usize {
        let state = self.state.lock().await;
        state.flags.keys().filter(|(s, _)| *s == subject).count()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            staged,
            fail_commit: self.fail_next_commit.clone(),
        }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_verse(&self, verse_id: Uuid) -> StoreResult<Option<Verse>> {
        Ok(self.state.lock().await.verses.get(&verse_id).cloned())
    }

    async fn find_verse_at(&self, coordinate: &VerseCoordinate) -> StoreResult<Option<Verse>> {
        Ok(self.state.lock().await.find_verse_at(coordinate))
    }

    async fn find_interpretation(&self, id: Uuid) -> StoreResult<Option<Interpretation>> {
        Ok(self.state.lock().await.interpretations.get(&id).cloned())
    }

    async fn find_reply(&self, id: Uuid) -> StoreResult<Option<Reply>> {
        Ok(self.state.lock().await.replies.get(&id).cloned())
    }

    async fn list_interpretations(
        &self,
        verse_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> StoreResult<Vec<Interpretation>> {
        let state = self.state.lock().await;
        let mut found: Vec<Interpretation> = state
            .interpretations
            .values()
            .filter(|i| i.verse_id == verse_id && !i.visibility.is_hidden())
            .filter(|i| match cursor {
                Some((created_at, id)) => (i.created_at, i.id) < (created_at, id),
                None => true,
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }

    async fn list_replies(&self, interpretation_id: Uuid) -> StoreResult<Vec<Reply>> {
        let state = self.state.lock().await;
        let mut found: Vec<Reply> = state
            .replies
            .values()
            .filter(|r| r.interpretation_id == interpretation_id && !r.visibility.is_hidden())
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.created_at, r.id));
        Ok(found)
    }

    async fn counts(&self, subject: SubjectRef) -> StoreResult<Option<Counts>> {
        Ok(self.state.lock().await.counts.get(&subject).copied())
    }

    async fn counts_many(&self, kind: SubjectKind, ids: &[Uuid]) -> StoreResult<Vec<Counts>> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.counts.get(&SubjectRef { kind, id: *id }).copied())
            .collect())
    }

    async fn list_inbound_references(&self, verse_id: Uuid) -> StoreResult<Vec<Reference>> {
        let state = self.state.lock().await;
        let mut found: Vec<Reference> = state
            .references
            .iter()
            .filter(|r| r.target_verse_id == verse_id && !r.is_hidden)
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.created_at, r.id));
        Ok(found)
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fail_commit: Arc<AtomicBool>,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_subject(&mut self, subject: SubjectRef) -> StoreResult<Option<Subject>> {
        let found = match subject.kind {
            SubjectKind::Interpretation => self
                .staged
                .interpretations
                .get(&subject.id)
                .cloned()
                .map(Subject::Interpretation),
            SubjectKind::Reply => self
                .staged
                .replies
                .get(&subject.id)
                .cloned()
                .map(Subject::Reply),
        };
        Ok(found)
    }

    async fn insert_vote(&mut self, vote: &Vote) -> StoreResult<()> {
        let key = (vote.subject, vote.voter_id);
        if self.staged.votes.contains_key(&key) {
            return Err(StoreError::UniqueViolation);
        }
        self.staged.votes.insert(key, vote.clone());
        Ok(())
    }

    async fn insert_flag(&mut self, flag: &Flag) -> StoreResult<()> {
        let key = (flag.subject, flag.reporter_id);
        if self.staged.flags.contains_key(&key) {
            return Err(StoreError::UniqueViolation);
        }
        self.staged.flags.insert(key, flag.clone());
        Ok(())
    }

    async fn count_votes(&mut self, subject: SubjectRef) -> StoreResult<i64> {
        Ok(self.staged.votes.keys().filter(|(s, _)| *s == subject).count() as i64)
    }

    async fn count_flags(&mut self, subject: SubjectRef) -> StoreResult<i64> {
        Ok(self.staged.flags.keys().filter(|(s, _)| *s == subject).count() as i64)
    }

    async fn count_visible_replies(&mut self, interpretation_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .staged
            .replies
            .values()
            .filter(|r| r.interpretation_id == interpretation_id && !r.visibility.is_hidden())
            .count() as i64)
    }

    async fn upsert_counts(&mut self, counts: &Counts) -> StoreResult<()> {
        self.staged.counts.insert(counts.subject, *counts);
        Ok(())
    }

    async fn hide_subject(&mut self, subject: SubjectRef) -> StoreResult<bool> {
        let visibility = match subject.kind {
            SubjectKind::Interpretation => self
                .staged
                .interpretations
                .get_mut(&subject.id)
                .map(|i| &mut i.visibility),
            SubjectKind::Reply => self
                .staged
                .replies
                .get_mut(&subject.id)
                .map(|r| &mut r.visibility),
        };
        match visibility {
            Some(visibility) if !visibility.is_hidden() => {
                *visibility = Visibility::Hidden;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn hide_references_from(&mut self, interpretation_id: Uuid) -> StoreResult<u64> {
        let mut hidden = 0;
        for reference in self
            .staged
            .references
            .iter_mut()
            .filter(|r| r.interpretation_id == interpretation_id && !r.is_hidden)
        {
            reference.is_hidden = true;
            hidden += 1;
        }
        Ok(hidden)
    }

    async fn find_visible_interpretation_by(
        &mut self,
        verse_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Uuid>> {
        Ok(self
            .staged
            .interpretations
            .values()
            .find(|i| i.verse_id == verse_id && i.user_id == user_id && !i.visibility.is_hidden())
            .map(|i| i.id))
    }

    async fn insert_interpretation(&mut self, interpretation: &Interpretation) -> StoreResult<()> {
        if !interpretation.visibility.is_hidden() {
            let clash = self.staged.interpretations.values().any(|i| {
                i.verse_id == interpretation.verse_id
                    && i.user_id == interpretation.user_id
                    && !i.visibility.is_hidden()
            });
            if clash {
                return Err(StoreError::UniqueViolation);
            }
        }
        self.staged
            .interpretations
            .insert(interpretation.id, interpretation.clone());
        Ok(())
    }

    async fn insert_reply(&mut self, reply: &Reply) -> StoreResult<()> {
        self.staged.replies.insert(reply.id, reply.clone());
        Ok(())
    }

    async fn find_verse_at(&mut self, coordinate: &VerseCoordinate) -> StoreResult<Option<Verse>> {
        Ok(self.staged.find_verse_at(coordinate))
    }

    async fn insert_reference(&mut self, reference: &Reference) -> StoreResult<()> {
        self.staged.references.push(reference.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx {
            mut guard,
            staged,
            fail_commit,
        } = *self;
        if fail_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable(anyhow!("commit rejected by backend")));
        }
        *guard = staged;
        Ok(())
    }
}
