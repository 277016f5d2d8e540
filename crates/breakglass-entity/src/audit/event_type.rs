//! Audit event type enumeration.

use std::fmt;
use std::str::FromStr;

use breakglass_core::AppError;
use serde::{Deserialize, Serialize};

/// Lifecycle transition or in-session action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// An impersonation began.
    Started,
    /// The impersonator ended the session.
    Ended,
    /// The session passed its deadline and was closed by the sweep.
    Expired,
    /// An action taken while impersonating.
    ActionPerformed,
}

impl AuditEventType {
    /// All variants, in lifecycle order.
    pub const ALL: [AuditEventType; 4] = [
        Self::Started,
        Self::Ended,
        Self::Expired,
        Self::ActionPerformed,
    ];

    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Ended => "ended",
            Self::Expired => "expired",
            Self::ActionPerformed => "action_performed",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditEventType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Invalid audit event type: '{s}'. Expected one of: started, ended, expired, action_performed"
                ))
            })
    }
}

impl sqlx::Type<sqlx::Postgres> for AuditEventType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for AuditEventType {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for AuditEventType {
    fn decode(
        value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let text = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(text.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("started".parse::<AuditEventType>().unwrap(), AuditEventType::Started);
        assert_eq!(
            "ACTION_PERFORMED".parse::<AuditEventType>().unwrap(),
            AuditEventType::ActionPerformed
        );
        assert!("deleted".parse::<AuditEventType>().is_err());
    }

    #[test]
    fn test_serde_matches_stored_form() {
        for t in AuditEventType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }
}
