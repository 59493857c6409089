use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::counts::Counts;
use crate::domain::subject::Visibility;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interpretation {
    pub id: Uuid,
    pub verse_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub visibility: Visibility,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub interpretation_id: Uuid,
    /// Copied from the parent interpretation at creation.
    pub verse_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub visibility: Visibility,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// An interpretation as listed for a verse, with its cached counts.
#[derive(Debug, Clone, Serialize)]
pub struct InterpretationView {
    #[serde(flatten)]
    pub interpretation: Interpretation,
    pub counts: Counts,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyView {
    #[serde(flatten)]
    pub reply: Reply,
    pub counts: Counts,
}
