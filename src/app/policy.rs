use crate::domain::subject::{SubjectKind, Visibility};

pub const INTERPRETATION_HIDE_THRESHOLD: i64 = 10;
pub const REPLY_HIDE_THRESHOLD: i64 = 5;

/// Maps a report count to a visibility. Hiding is one-way: callers never
/// un-hide a subject when the decision flips back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModerationPolicy {
    pub interpretation_threshold: i64,
    pub reply_threshold: i64,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            interpretation_threshold: INTERPRETATION_HIDE_THRESHOLD,
            reply_threshold: REPLY_HIDE_THRESHOLD,
        }
    }
}

impl ModerationPolicy {
    pub fn new(interpretation_threshold: i64, reply_threshold: i64) -> Self {
        Self {
            interpretation_threshold,
            reply_threshold,
        }
    }

    pub fn threshold(&self, kind: SubjectKind) -> i64 {
        match kind {
            SubjectKind::Interpretation => self.interpretation_threshold,
            SubjectKind::Reply => self.reply_threshold,
        }
    }

    pub fn decide(&self, kind: SubjectKind, report_count: i64) -> Visibility {
        Visibility::from_hidden(report_count >= self.threshold(kind))
    }
}
