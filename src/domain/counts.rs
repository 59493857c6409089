use serde::{Deserialize, Serialize};

use crate::domain::subject::{SubjectKind, SubjectRef};

/// Denormalized per-subject counters. Always derived from the ledgers; never
/// the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub subject: SubjectRef,
    pub upvote_count: i64,
    pub report_count: i64,
    /// Only tracked for interpretations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<i64>,
}

impl Counts {
    pub fn zero(subject: SubjectRef) -> Self {
        let reply_count = match subject.kind {
            SubjectKind::Interpretation => Some(0),
            SubjectKind::Reply => None,
        };
        Self {
            subject,
            upvote_count: 0,
            report_count: 0,
            reply_count,
        }
    }
}
