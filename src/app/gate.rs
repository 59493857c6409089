use anyhow::Result;
use regex::Regex;

use crate::app::error::ActionError;

pub const INTERPRETATION_MIN_WORDS: usize = 12;
pub const EXPLANATION_MAX_WORDS: usize = 20;

const KEYWORDS: &[&str] = &[
    "function", "eval", "alert", "script", "select", "insert", "delete", "drop", "union", "exec",
    "declare", "create", "alter",
];

/// Which rule set a piece of user text is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Interpretation,
    Reply,
    Explanation,
}

impl SubmissionKind {
    fn forbidden_punctuation(&self) -> &'static [char] {
        match self {
            // Interpretations carry prose and `[Book 1:1] (note)` references.
            Self::Interpretation => &['<', '>', '{', '}', ';', '`', '\\'],
            Self::Reply | Self::Explanation => {
                &['<', '>', '{', '}', ';', '`', '\'', '"', '\\', '/']
            }
        }
    }
}

/// Validation pipeline every piece of user text goes through before it is
/// stored: strip markup, reject code-like content, then apply the word
/// limits for the kind.
#[derive(Debug, Clone)]
pub struct ContentGate {
    markup: Regex,
    keywords: Regex,
}

impl ContentGate {
    pub fn new() -> Result<Self> {
        let markup = Regex::new(r"(?s)<!--.*?-->|<[^<>]*>")?;
        let keywords = Regex::new(&format!(r"(?i)\b(?:{})\b", KEYWORDS.join("|")))?;
        Ok(Self { markup, keywords })
    }

    /// Returns the cleaned text. For explanations the result may be empty,
    /// which callers store as "no explanation".
    pub fn validate(&self, raw: &str, kind: SubmissionKind) -> Result<String, ActionError> {
        let clean = self.strip_markup(raw);

        if self.keywords.is_match(&clean) || clean.contains(kind.forbidden_punctuation()) {
            return Err(ActionError::ContainsMarkup);
        }

        let words = clean.split_whitespace().count();
        match kind {
            SubmissionKind::Interpretation if words < INTERPRETATION_MIN_WORDS => {
                Err(ActionError::TooShort)
            }
            SubmissionKind::Reply if words == 0 => Err(ActionError::TooShort),
            SubmissionKind::Explanation if words > EXPLANATION_MAX_WORDS => {
                Err(ActionError::TooLong)
            }
            _ => Ok(clean),
        }
    }

    fn strip_markup(&self, raw: &str) -> String {
        self.markup.replace_all(raw, "").trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> ContentGate {
        ContentGate::new().unwrap()
    }

    fn words(n: usize) -> String {
        vec!["grace"; n].join(" ")
    }

    #[test]
    fn script_tag_is_rejected_regardless_of_surroundings() {
        let text = format!("<script>alert(1)</script> {}", words(20));
        assert!(matches!(
            gate().validate(&text, SubmissionKind::Interpretation),
            Err(ActionError::ContainsMarkup)
        ));
        assert!(matches!(
            gate().validate("<script>alert(1)</script>", SubmissionKind::Reply),
            Err(ActionError::ContainsMarkup)
        ));
    }

    #[test]
    fn harmless_tags_are_stripped() {
        let clean = gate()
            .validate("<b>amen</b> <!-- hidden --> brother", SubmissionKind::Reply)
            .unwrap();
        assert_eq!(clean, "amen  brother");
    }

    #[test]
    fn keywords_match_whole_words_only() {
        assert!(gate()
            .validate("the selection of Israel", SubmissionKind::Reply)
            .is_ok());
        assert!(matches!(
            gate().validate("please Drop this", SubmissionKind::Reply),
            Err(ActionError::ContainsMarkup)
        ));
    }

    #[test]
    fn interpretation_needs_twelve_words() {
        assert!(matches!(
            gate().validate("Too short", SubmissionKind::Interpretation),
            Err(ActionError::TooShort)
        ));
        assert!(matches!(
            gate().validate(&words(11), SubmissionKind::Interpretation),
            Err(ActionError::TooShort)
        ));
        assert!(gate()
            .validate(&words(12), SubmissionKind::Interpretation)
            .is_ok());
    }

    #[test]
    fn punctuation_rules_differ_by_kind() {
        let prose = format!("[Genesis 1:1] (the beginning) it's \"good\" and/or {}", words(8));
        assert!(gate()
            .validate(&prose, SubmissionKind::Interpretation)
            .is_ok());
        assert!(matches!(
            gate().validate("it's good", SubmissionKind::Reply),
            Err(ActionError::ContainsMarkup)
        ));
        assert!(matches!(
            gate().validate(&format!("a; {}", words(12)), SubmissionKind::Interpretation),
            Err(ActionError::ContainsMarkup)
        ));
    }

    #[test]
    fn reply_must_not_be_empty() {
        assert!(matches!(
            gate().validate("   ", SubmissionKind::Reply),
            Err(ActionError::TooShort)
        ));
    }

    #[test]
    fn explanation_is_capped_at_twenty_words() {
        assert!(gate()
            .validate(&words(20), SubmissionKind::Explanation)
            .is_ok());
        assert!(matches!(
            gate().validate(&words(21), SubmissionKind::Explanation),
            Err(ActionError::TooLong)
        ));
        assert_eq!(
            gate().validate("", SubmissionKind::Explanation).unwrap(),
            ""
        );
    }
}
