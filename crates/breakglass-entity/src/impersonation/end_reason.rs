//! Why an impersonation stopped.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reason recorded in `end_reason` when a session leaves the active state.
///
/// Stored as plain text so operators may supply their own wording.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum EndReason {
    /// Ended by the impersonator.
    Manual,
    /// Closed by the expiry sweep after `expires_at` passed.
    Timeout,
    /// Free-text reason supplied when ending.
    Custom(String),
}

impl EndReason {
    /// Stored representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Manual => "manual",
            Self::Timeout => "timeout",
            Self::Custom(reason) => reason,
        }
    }

    /// Reason for a caller-initiated end: the supplied text, or `manual`
    /// when it is missing or blank.
    pub fn from_optional(reason: Option<&str>) -> Self {
        match reason.map(str::trim) {
            Some(text) if !text.is_empty() => Self::from(text.to_string()),
            _ => Self::Manual,
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EndReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "manual" => Self::Manual,
            "timeout" => Self::Timeout,
            _ => Self::Custom(value),
        }
    }
}

impl From<EndReason> for String {
    fn from(reason: EndReason) -> Self {
        match reason {
            EndReason::Custom(text) => text,
            other => other.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_reason_is_manual() {
        assert_eq!(EndReason::from_optional(None), EndReason::Manual);
        assert_eq!(EndReason::from_optional(Some("   ")), EndReason::Manual);
    }

    #[test]
    fn test_known_words_map_to_variants() {
        assert_eq!(EndReason::from("timeout".to_string()), EndReason::Timeout);
        assert_eq!(
            EndReason::from_optional(Some("customer call ended")),
            EndReason::Custom("customer call ended".into())
        );
    }
}
