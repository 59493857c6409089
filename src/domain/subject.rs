use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::interpretation::{Interpretation, Reply};

/// The two kinds of user content that moderation acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Interpretation,
    Reply,
}

impl SubjectKind {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "interpretation" => Some(Self::Interpretation),
            "reply" => Some(Self::Reply),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Interpretation => "interpretation",
            Self::Reply => "reply",
        }
    }
}

/// Identifies one subject. Ledger uniqueness is keyed on this plus the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectRef {
    pub kind: SubjectKind,
    pub id: Uuid,
}

impl SubjectRef {
    pub fn interpretation(id: Uuid) -> Self {
        Self {
            kind: SubjectKind::Interpretation,
            id,
        }
    }

    pub fn reply(id: Uuid) -> Self {
        Self {
            kind: SubjectKind::Reply,
            id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn from_hidden(is_hidden: bool) -> Self {
        if is_hidden {
            Self::Hidden
        } else {
            Self::Visible
        }
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, Self::Hidden)
    }
}

#[derive(Debug, Clone)]
pub enum Subject {
    Interpretation(Interpretation),
    Reply(Reply),
}

impl Subject {
    pub fn subject_ref(&self) -> SubjectRef {
        match self {
            Self::Interpretation(interpretation) => SubjectRef::interpretation(interpretation.id),
            Self::Reply(reply) => SubjectRef::reply(reply.id),
        }
    }

    pub fn owner_id(&self) -> Uuid {
        match self {
            Self::Interpretation(interpretation) => interpretation.user_id,
            Self::Reply(reply) => reply.user_id,
        }
    }

    pub fn visibility(&self) -> Visibility {
        match self {
            Self::Interpretation(interpretation) => interpretation.visibility,
            Self::Reply(reply) => reply.visibility,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.visibility().is_hidden()
    }
}
