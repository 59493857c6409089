use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::counts::Counts;
use crate::domain::engagement::Vote;
use crate::domain::interpretation::{Interpretation, Reply};
use crate::domain::moderation::Flag;
use crate::domain::subject::{Subject, SubjectKind, SubjectRef, Visibility};
use crate::domain::verse::{Reference, Verse, VerseCoordinate};
use crate::infra::db::Db;
use crate::infra::store::{Store, StoreError, StoreResult, StoreTx};

/// Table layout for one subject kind. Both kinds share the same shape.
struct KindTables {
    subjects: &'static str,
    votes: &'static str,
    flags: &'static str,
    counts: &'static str,
    id_column: &'static str,
}

fn tables(kind: SubjectKind) -> KindTables {
    match kind {
        SubjectKind::Interpretation => KindTables {
            subjects: "interpretations",
            votes: "interpretation_votes",
            flags: "interpretation_flags",
            counts: "interpretation_counts",
            id_column: "interpretation_id",
        },
        SubjectKind::Reply => KindTables {
            subjects: "replies",
            votes: "reply_votes",
            flags: "reply_flags",
            counts: "reply_counts",
            id_column: "reply_id",
        },
    }
}

const INTERPRETATION_COLUMNS: &str = "id, verse_id, user_id, body, is_hidden, created_at";
const REPLY_COLUMNS: &str = "id, interpretation_id, verse_id, user_id, body, is_hidden, created_at";
const REFERENCE_COLUMNS: &str =
    "id, source_verse_id, target_verse_id, interpretation_id, user_id, reference_text, is_hidden, created_at";

#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.db.pool().begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.db.ping().await.map_err(StoreError::Unavailable)
    }

    async fn find_verse(&self, verse_id: Uuid) -> StoreResult<Option<Verse>> {
        let row = sqlx::query("SELECT id, book, chapter, verse, text FROM verses WHERE id = $1")
            .bind(verse_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(verse_from_row))
    }

    async fn find_verse_at(&self, coordinate: &VerseCoordinate) -> StoreResult<Option<Verse>> {
        let row = sqlx::query(
            "SELECT id, book, chapter, verse, text FROM verses \
             WHERE book = $1 AND chapter = $2 AND verse = $3",
        )
        .bind(&coordinate.book)
        .bind(coordinate.chapter)
        .bind(coordinate.verse)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(verse_from_row))
    }

    async fn find_interpretation(&self, id: Uuid) -> StoreResult<Option<Interpretation>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM interpretations WHERE id = $1",
            INTERPRETATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(interpretation_from_row))
    }

    async fn find_reply(&self, id: Uuid) -> StoreResult<Option<Reply>> {
        let row = sqlx::query(&format!("SELECT {} FROM replies WHERE id = $1", REPLY_COLUMNS))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(reply_from_row))
    }

    async fn list_interpretations(
        &self,
        verse_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> StoreResult<Vec<Interpretation>> {
        let rows = match cursor {
            Some((created_at, interpretation_id)) => {
                sqlx::query(&format!(
                    "SELECT {} FROM interpretations \
                     WHERE verse_id = $1 AND NOT is_hidden \
                       AND (created_at < $2 OR (created_at = $2 AND id < $3)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $4",
                    INTERPRETATION_COLUMNS
                ))
                .bind(verse_id)
                .bind(created_at)
                .bind(interpretation_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM interpretations \
                     WHERE verse_id = $1 AND NOT is_hidden \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $2",
                    INTERPRETATION_COLUMNS
                ))
                .bind(verse_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        Ok(rows.iter().map(interpretation_from_row).collect())
    }

    async fn list_replies(&self, interpretation_id: Uuid) -> StoreResult<Vec<Reply>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM replies \
             WHERE interpretation_id = $1 AND NOT is_hidden \
             ORDER BY created_at ASC, id ASC",
            REPLY_COLUMNS
        ))
        .bind(interpretation_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(reply_from_row).collect())
    }

    async fn counts(&self, subject: SubjectRef) -> StoreResult<Option<Counts>> {
        let mut found = self.counts_many(subject.kind, &[subject.id]).await?;
        Ok(found.pop())
    }

    async fn counts_many(&self, kind: SubjectKind, ids: &[Uuid]) -> StoreResult<Vec<Counts>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let t = tables(kind);
        let sql = match kind {
            SubjectKind::Interpretation => format!(
                "SELECT {id} AS subject_id, upvote_count, report_count, reply_count \
                 FROM {counts} WHERE {id} = ANY($1)",
                id = t.id_column,
                counts = t.counts
            ),
            SubjectKind::Reply => format!(
                "SELECT {id} AS subject_id, upvote_count, report_count, NULL::BIGINT AS reply_count \
                 FROM {counts} WHERE {id} = ANY($1)",
                id = t.id_column,
                counts = t.counts
            ),
        };
        let rows = sqlx::query(&sql)
            .bind(ids.to_vec())
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows
            .iter()
            .map(|row| Counts {
                subject: SubjectRef {
                    kind,
                    id: row.get("subject_id"),
                },
                upvote_count: row.get("upvote_count"),
                report_count: row.get("report_count"),
                reply_count: row.get("reply_count"),
            })
            .collect())
    }

    async fn list_inbound_references(&self, verse_id: Uuid) -> StoreResult<Vec<Reference>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM verse_references \
             WHERE target_verse_id = $1 AND NOT is_hidden \
             ORDER BY created_at ASC, id ASC",
            REFERENCE_COLUMNS
        ))
        .bind(verse_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(reference_from_row).collect())
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn lock_subject(&mut self, subject: SubjectRef) -> StoreResult<Option<Subject>> {
        let found = match subject.kind {
            SubjectKind::Interpretation => sqlx::query(&format!(
                "SELECT {} FROM interpretations WHERE id = $1 FOR UPDATE",
                INTERPRETATION_COLUMNS
            ))
            .bind(subject.id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(|row| Subject::Interpretation(interpretation_from_row(&row))),
            SubjectKind::Reply => sqlx::query(&format!(
                "SELECT {} FROM replies WHERE id = $1 FOR UPDATE",
                REPLY_COLUMNS
            ))
            .bind(subject.id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(|row| Subject::Reply(reply_from_row(&row))),
        };
        Ok(found)
    }

    async fn insert_vote(&mut self, vote: &Vote) -> StoreResult<()> {
        let t = tables(vote.subject.kind);
        sqlx::query(&format!(
            "INSERT INTO {} (id, {}, voter_id, created_at) VALUES ($1, $2, $3, $4)",
            t.votes, t.id_column
        ))
        .bind(vote.id)
        .bind(vote.subject.id)
        .bind(vote.voter_id)
        .bind(vote.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_flag(&mut self, flag: &Flag) -> StoreResult<()> {
        let t = tables(flag.subject.kind);
        sqlx::query(&format!(
            "INSERT INTO {} (id, {}, reporter_id, reason, explanation, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
            t.flags, t.id_column
        ))
        .bind(flag.id)
        .bind(flag.subject.id)
        .bind(flag.reporter_id)
        .bind(flag.reason.as_db())
        .bind(&flag.explanation)
        .bind(flag.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn count_votes(&mut self, subject: SubjectRef) -> StoreResult<i64> {
        let t = tables(subject.kind);
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1",
            t.votes, t.id_column
        ))
        .bind(subject.id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn count_flags(&mut self, subject: SubjectRef) -> StoreResult<i64> {
        let t = tables(subject.kind);
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1",
            t.flags, t.id_column
        ))
        .bind(subject.id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn count_visible_replies(&mut self, interpretation_id: Uuid) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM replies WHERE interpretation_id = $1 AND NOT is_hidden",
        )
        .bind(interpretation_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn upsert_counts(&mut self, counts: &Counts) -> StoreResult<()> {
        match counts.subject.kind {
            SubjectKind::Interpretation => {
                sqlx::query(
                    "INSERT INTO interpretation_counts \
                         (interpretation_id, upvote_count, report_count, reply_count, updated_at) \
                     VALUES ($1, $2, $3, $4, NOW()) \
                     ON CONFLICT (interpretation_id) DO UPDATE \
                     SET upvote_count = EXCLUDED.upvote_count, \
                         report_count = EXCLUDED.report_count, \
                         reply_count = EXCLUDED.reply_count, \
                         updated_at = NOW()",
                )
                .bind(counts.subject.id)
                .bind(counts.upvote_count)
                .bind(counts.report_count)
                .bind(counts.reply_count.unwrap_or(0))
                .execute(&mut *self.tx)
                .await?;
            }
            SubjectKind::Reply => {
                sqlx::query(
                    "INSERT INTO reply_counts (reply_id, upvote_count, report_count, updated_at) \
                     VALUES ($1, $2, $3, NOW()) \
                     ON CONFLICT (reply_id) DO UPDATE \
                     SET upvote_count = EXCLUDED.upvote_count, \
                         report_count = EXCLUDED.report_count, \
                         updated_at = NOW()",
                )
                .bind(counts.subject.id)
                .bind(counts.upvote_count)
                .bind(counts.report_count)
                .execute(&mut *self.tx)
                .await?;
            }
        }
        Ok(())
    }

    async fn hide_subject(&mut self, subject: SubjectRef) -> StoreResult<bool> {
        let t = tables(subject.kind);
        let result = sqlx::query(&format!(
            "UPDATE {} SET is_hidden = TRUE WHERE id = $1 AND NOT is_hidden",
            t.subjects
        ))
        .bind(subject.id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn hide_references_from(&mut self, interpretation_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE verse_references SET is_hidden = TRUE \
             WHERE interpretation_id = $1 AND NOT is_hidden",
        )
        .bind(interpretation_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn find_visible_interpretation_by(
        &mut self,
        verse_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Uuid>> {
        let id: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM interpretations \
             WHERE verse_id = $1 AND user_id = $2 AND NOT is_hidden \
             LIMIT 1",
        )
        .bind(verse_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn insert_interpretation(&mut self, interpretation: &Interpretation) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO interpretations (id, verse_id, user_id, body, is_hidden, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(interpretation.id)
        .bind(interpretation.verse_id)
        .bind(interpretation.user_id)
        .bind(&interpretation.body)
        .bind(interpretation.visibility.is_hidden())
        .bind(interpretation.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_reply(&mut self, reply: &Reply) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO replies (id, interpretation_id, verse_id, user_id, body, is_hidden, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(reply.id)
        .bind(reply.interpretation_id)
        .bind(reply.verse_id)
        .bind(reply.user_id)
        .bind(&reply.body)
        .bind(reply.visibility.is_hidden())
        .bind(reply.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_verse_at(&mut self, coordinate: &VerseCoordinate) -> StoreResult<Option<Verse>> {
        let row = sqlx::query(
            "SELECT id, book, chapter, verse, text FROM verses \
             WHERE book = $1 AND chapter = $2 AND verse = $3",
        )
        .bind(&coordinate.book)
        .bind(coordinate.chapter)
        .bind(coordinate.verse)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.as_ref().map(verse_from_row))
    }

    async fn insert_reference(&mut self, reference: &Reference) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO verse_references \
                 (id, source_verse_id, target_verse_id, interpretation_id, user_id, reference_text, is_hidden, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(reference.id)
        .bind(reference.source_verse_id)
        .bind(reference.target_verse_id)
        .bind(reference.interpretation_id)
        .bind(reference.user_id)
        .bind(&reference.reference_text)
        .bind(reference.is_hidden)
        .bind(reference.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let PgTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}

fn verse_from_row(row: &PgRow) -> Verse {
    Verse {
        id: row.get("id"),
        book: row.get("book"),
        chapter: row.get("chapter"),
        verse: row.get("verse"),
        text: row.get("text"),
    }
}

fn interpretation_from_row(row: &PgRow) -> Interpretation {
    Interpretation {
        id: row.get("id"),
        verse_id: row.get("verse_id"),
        user_id: row.get("user_id"),
        body: row.get("body"),
        visibility: Visibility::from_hidden(row.get("is_hidden")),
        created_at: row.get("created_at"),
    }
}

fn reply_from_row(row: &PgRow) -> Reply {
    Reply {
        id: row.get("id"),
        interpretation_id: row.get("interpretation_id"),
        verse_id: row.get("verse_id"),
        user_id: row.get("user_id"),
        body: row.get("body"),
        visibility: Visibility::from_hidden(row.get("is_hidden")),
        created_at: row.get("created_at"),
    }
}

fn reference_from_row(row: &PgRow) -> Reference {
    Reference {
        id: row.get("id"),
        source_verse_id: row.get("source_verse_id"),
        target_verse_id: row.get("target_verse_id"),
        interpretation_id: row.get("interpretation_id"),
        user_id: row.get("user_id"),
        reference_text: row.get("reference_text"),
        is_hidden: row.get("is_hidden"),
        created_at: row.get("created_at"),
    }
}
