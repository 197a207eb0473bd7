//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Identifier of the account whose billing state is coordinated.
///
/// Opaque non-empty string issued by the identity system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Creates a new AccountId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("account_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Team the account belongs to, passed through to processor metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(String);

impl TeamId {
    /// Creates a new TeamId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("team_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_accepts_non_empty_string() {
        let id = AccountId::new("acct-42").unwrap();
        assert_eq!(id.as_str(), "acct-42");
        assert_eq!(id.to_string(), "acct-42");
    }

    #[test]
    fn account_id_rejects_empty_string() {
        assert!(matches!(
            AccountId::new(""),
            Err(ValidationError::EmptyField { .. })
        ));
        assert!(AccountId::new("   ").is_err());
    }

    #[test]
    fn account_id_parses_from_str() {
        let id: AccountId = "acct-7".parse().unwrap();
        assert_eq!(id, AccountId::new("acct-7").unwrap());
    }

    #[test]
    fn account_id_serializes_transparently() {
        let id = AccountId::new("acct-1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"acct-1\"");
    }

    #[test]
    fn team_id_rejects_empty_string() {
        assert!(TeamId::new("").is_err());
        assert_eq!(TeamId::new("team-9").unwrap().as_str(), "team-9");
    }
}
