//! Expression targets

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the baseline pose
pub const NEUTRAL: &str = "neutral";

/// Emotion vocabulary produced by the upstream classifier, with descriptions
pub const KNOWN_EMOTIONS: [(&str, &str); 7] = [
    ("happy", "Happy and positive"),
    ("sad", "Sad or disappointed"),
    ("angry", "Angry or frustrated"),
    ("anxious", "Anxious or worried"),
    ("surprised", "Surprised or amazed"),
    ("grateful", "Grateful or thankful"),
    (NEUTRAL, "Neutral or calm"),
];

/// Human-readable description of a known emotion
pub fn describe(name: &str) -> Option<&'static str> {
    KNOWN_EMOTIONS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name.trim()))
        .map(|&(_, description)| description)
}

/// The pose the avatar is moving toward.
///
/// `Neutral` is not a table entry: it bypasses delta lookup and draws the
/// idle frame as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExpressionTarget {
    #[default]
    Neutral,
    Emotion(String),
}

impl ExpressionTarget {
    /// Parse a name, case-insensitively; `"neutral"` (or blank) is the baseline
    pub fn emotion(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() || name == NEUTRAL {
            Self::Neutral
        } else {
            Self::Emotion(name)
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Neutral => NEUTRAL,
            Self::Emotion(name) => name,
        }
    }

    pub fn is_neutral(&self) -> bool {
        matches!(self, Self::Neutral)
    }

    /// Whether the upstream classifier can produce this target
    pub fn is_known(&self) -> bool {
        describe(self.name()).is_some()
    }
}

impl From<&str> for ExpressionTarget {
    fn from(name: &str) -> Self {
        Self::emotion(name)
    }
}

impl From<String> for ExpressionTarget {
    fn from(name: String) -> Self {
        Self::emotion(&name)
    }
}

impl From<ExpressionTarget> for String {
    fn from(target: ExpressionTarget) -> Self {
        target.name().to_string()
    }
}

impl fmt::Display for ExpressionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            ExpressionTarget::from(" Happy "),
            ExpressionTarget::Emotion("happy".into())
        );
        assert_eq!(ExpressionTarget::from("NEUTRAL"), ExpressionTarget::Neutral);
        assert_eq!(ExpressionTarget::from(""), ExpressionTarget::Neutral);
    }

    #[test]
    fn test_unknown_names_are_still_targets() {
        let target = ExpressionTarget::from("smug");
        assert_eq!(target.name(), "smug");
        assert!(!target.is_known());
        assert!(ExpressionTarget::from("grateful").is_known());
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(describe("anxious"), Some("Anxious or worried"));
        assert_eq!(describe("Neutral"), Some("Neutral or calm"));
        assert_eq!(describe("bored"), None);
    }

    #[test]
    fn test_serde_uses_plain_names() {
        let json = serde_json::to_string(&ExpressionTarget::from("sad")).unwrap();
        assert_eq!(json, "\"sad\"");
        let back: ExpressionTarget = serde_json::from_str("\"Neutral\"").unwrap();
        assert!(back.is_neutral());
    }
}
