use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a Lesson.
///
/// Ids are compared lexically; curriculum ids are zero-padded (`L001`, `L002`, ...)
/// so that lexical order follows the curriculum sequence.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LessonId(String);

impl LessonId {
    /// Creates a new `LessonId`.
    ///
    /// # Errors
    ///
    /// Returns `ParseIdError` if the id is empty or contains whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, ParseIdError> {
        let id = id.into();
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(ParseIdError { raw: id });
        }
        Ok(Self(id))
    }

    /// Returns the underlying string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LessonId({})", self.0)
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl Borrow<str> for LessonId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for LessonId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<LessonId> for String {
    fn from(id: LessonId) -> Self {
        id.0
    }
}

impl TryFrom<String> for LessonId {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

// ─── FromStr ───────────────────────────────────────────────────────────────────

/// Error type for parsing a `LessonId` from a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    raw: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid lesson id: {:?}", self.raw)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for LessonId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim())
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesson_id_display() {
        let id = LessonId::new("L042").unwrap();
        assert_eq!(id.to_string(), "L042");
    }

    #[test]
    fn test_lesson_id_from_str_trims() {
        let id: LessonId = "  L007 ".parse().unwrap();
        assert_eq!(id.as_str(), "L007");
    }

    #[test]
    fn test_lesson_id_rejects_empty_and_inner_whitespace() {
        assert!("".parse::<LessonId>().is_err());
        assert!("L 1".parse::<LessonId>().is_err());
    }

    #[test]
    fn test_lesson_id_orders_lexically() {
        let a = LessonId::new("L009").unwrap();
        let b = LessonId::new("L010").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_lesson_id_deserialize_validates() {
        let ok: LessonId = serde_json::from_str("\"L001\"").unwrap();
        assert_eq!(ok.as_str(), "L001");
        assert!(serde_json::from_str::<LessonId>("\"\"").is_err());
    }
}
