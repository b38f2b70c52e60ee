//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Stable identity key of an application user, issued by the auth backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthUid(Uuid);

impl AuthUid {
    /// Creates an AuthUid from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for AuthUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AuthUid {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ValidationError::empty_field("auth_uid"));
        }
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| ValidationError::invalid_format("auth_uid", e.to_string()))
    }
}

/// Stripe customer identifier (`cus_...`), the external billing identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StripeCustomerId(String);

impl StripeCustomerId {
    /// Creates a new StripeCustomerId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::empty_field("stripe_customer_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StripeCustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_uid_parses_uuid() {
        let uid: AuthUid = "7f0c2a8e-3c1b-4d6a-9a51-0f3c2b1d4e5f".parse().unwrap();
        assert_eq!(uid.to_string(), "7f0c2a8e-3c1b-4d6a-9a51-0f3c2b1d4e5f");
    }

    #[test]
    fn auth_uid_rejects_blank() {
        let result = "  ".parse::<AuthUid>();
        match result {
            Err(ValidationError::EmptyField { field }) => assert_eq!(field, "auth_uid"),
            _ => panic!("Expected EmptyField error"),
        }
    }

    #[test]
    fn auth_uid_rejects_non_uuid() {
        let result = "user-123".parse::<AuthUid>();
        assert!(matches!(result, Err(ValidationError::InvalidFormat { .. })));
    }

    #[test]
    fn customer_id_rejects_empty_string() {
        assert!(StripeCustomerId::new("").is_err());
    }

    #[test]
    fn customer_id_displays_correctly() {
        let id = StripeCustomerId::new("cus_123").unwrap();
        assert_eq!(format!("{}", id), "cus_123");
        assert_eq!(id.as_str(), "cus_123");
    }
}
