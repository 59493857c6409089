use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verse {
    pub id: Uuid,
    pub book: String,
    pub chapter: i32,
    pub verse: i32,
    pub text: String,
}

impl Verse {
    pub fn coordinate(&self) -> VerseCoordinate {
        VerseCoordinate {
            book: self.book.clone(),
            chapter: self.chapter,
            verse: self.verse,
        }
    }
}

/// Book / chapter / verse address, e.g. "Song of Songs 2:4".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerseCoordinate {
    pub book: String,
    pub chapter: i32,
    pub verse: i32,
}

impl std::fmt::Display for VerseCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}:{}", self.book, self.chapter, self.verse)
    }
}

/// A cross-link from an interpretation's verse to another verse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub id: Uuid,
    pub source_verse_id: Uuid,
    pub target_verse_id: Uuid,
    pub interpretation_id: Uuid,
    pub user_id: Uuid,
    pub reference_text: String,
    pub is_hidden: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
