use crate::domain::counts::Counts;
use crate::domain::subject::{SubjectKind, SubjectRef};
use crate::infra::store::{StoreResult, StoreTx};

/// Re-derives the cached counts for `subject` from the ledgers and stores
/// the snapshot. The caller must already hold the subject's row lock in `tx`.
pub async fn recompute(tx: &mut dyn StoreTx, subject: SubjectRef) -> StoreResult<Counts> {
    let upvote_count = tx.count_votes(subject).await?;
    let report_count = tx.count_flags(subject).await?;
    let reply_count = match subject.kind {
        SubjectKind::Interpretation => Some(tx.count_visible_replies(subject.id).await?),
        SubjectKind::Reply => None,
    };

    let counts = Counts {
        subject,
        upvote_count,
        report_count,
        reply_count,
    };
    tx.upsert_counts(&counts).await?;
    Ok(counts)
}
