use std::collections::HashSet;

use anyhow::Result;
use regex::Regex;

use crate::domain::verse::VerseCoordinate;

/// Widest range a single reference may expand to (Psalm 119).
pub const MAX_RANGE_VERSES: i32 = 176;

/// Expanded targets kept per interpretation; the rest are dropped.
pub const MAX_REFERENCES: usize = 200;

/// One `[Book C:V(-V)] (note)` occurrence, expanded to single verses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtractedReference {
    pub target: VerseCoordinate,
    pub note: String,
}

#[derive(Debug, Clone)]
pub struct ReferenceExtractor {
    pattern: Regex,
    address: Regex,
}

impl ReferenceExtractor {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(r"\[([^\]]+)\]\s*\(([^)]+)\)")?;
        let address = Regex::new(r"^(.+?)\s+(\d+):(\d+)(?:\s*-\s*(\d+))?$")?;
        Ok(Self { pattern, address })
    }

    /// Malformed or inverted addresses are skipped; they are not errors.
    /// Repeated (verse, note) pairs collapse to one, and at most
    /// `MAX_REFERENCES` targets come back.
    pub fn extract(&self, text: &str) -> Vec<ExtractedReference> {
        let mut found = Vec::new();
        let mut seen_matches = HashSet::new();
        let mut seen_targets = HashSet::new();
        'matches: for caps in self.pattern.captures_iter(text) {
            let note = caps[2].trim();
            if note.is_empty() {
                continue;
            }
            let Some((book, chapter, first, last)) = self.parse_address(caps[1].trim()) else {
                tracing::debug!(reference = &caps[0], "skipping malformed reference");
                continue;
            };
            if !seen_matches.insert((book.clone(), chapter, first, last, note.to_string())) {
                continue;
            }
            for verse in first..=last {
                if found.len() >= MAX_REFERENCES {
                    tracing::debug!(limit = MAX_REFERENCES, "reference limit reached");
                    break 'matches;
                }
                let reference = ExtractedReference {
                    target: VerseCoordinate {
                        book: book.clone(),
                        chapter,
                        verse,
                    },
                    note: note.to_string(),
                };
                if seen_targets.insert(reference.clone()) {
                    found.push(reference);
                }
            }
        }
        found
    }

    fn parse_address(&self, address: &str) -> Option<(String, i32, i32, i32)> {
        let caps = self.address.captures(address)?;
        let book = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
        let chapter: i32 = caps[2].parse().ok()?;
        let first: i32 = caps[3].parse().ok()?;
        let last: i32 = match caps.get(4) {
            Some(end) => end.as_str().parse().ok()?,
            None => first,
        };
        if chapter < 1 || first < 1 || last < first || last - first >= MAX_RANGE_VERSES {
            return None;
        }
        Some((book, chapter, first, last))
    }
}
