use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::subject::SubjectRef;

/// One report. Unique per (subject, reporter) and never removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flag {
    pub id: Uuid,
    pub subject: SubjectRef,
    pub reporter_id: Uuid,
    pub reason: FlagReason,
    pub explanation: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    Spam,
    Blasphemy,
    Offensive,
}

impl FlagReason {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "spam" => Some(Self::Spam),
            "blasphemy" => Some(Self::Blasphemy),
            "offensive" => Some(Self::Offensive),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Spam => "spam",
            Self::Blasphemy => "blasphemy",
            Self::Offensive => "offensive",
        }
    }
}

impl FromStr for FlagReason {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_db(value.trim().to_ascii_lowercase().as_str()).ok_or(())
    }
}
