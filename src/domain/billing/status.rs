//! Subscription status as stored on the application user.
//!
//! Maps the payment provider's status vocabulary onto the four states the
//! application understands.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Subscription status of an application user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Free trial window, no paid subscription yet.
    Trial,

    /// Paid subscription in good standing.
    Active,

    /// Latest invoice payment failed; provider is retrying.
    PastDue,

    /// Subscription ended or was canceled.
    Canceled,
}

impl SubscriptionStatus {
    /// Maps a Stripe subscription status to the internal enum.
    ///
    /// Returns `None` for statuses with no internal meaning (`incomplete`,
    /// `incomplete_expired`, `paused`, anything new). Callers keep the stored
    /// value in that case so an unrecognized status never downgrades a user.
    pub fn from_provider(status: &str) -> Option<Self> {
        match status {
            "active" => Some(Self::Active),
            "past_due" => Some(Self::PastDue),
            "canceled" | "unpaid" => Some(Self::Canceled),
            "trialing" => Some(Self::Trial),
            _ => None,
        }
    }

    /// Database and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
        }
    }

    /// Whether this status alone grants access to paid features.
    pub fn grants_access(&self) -> bool {
        matches!(self, Self::Trial | Self::Active)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(Self::Trial),
            "active" => Ok(Self::Active),
            "past_due" => Ok(Self::PastDue),
            "canceled" => Ok(Self::Canceled),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn provider_active_maps_to_active() {
        assert_eq!(
            SubscriptionStatus::from_provider("active"),
            Some(SubscriptionStatus::Active)
        );
    }

    #[test]
    fn provider_past_due_maps_to_past_due() {
        assert_eq!(
            SubscriptionStatus::from_provider("past_due"),
            Some(SubscriptionStatus::PastDue)
        );
    }

    #[test]
    fn provider_canceled_and_unpaid_map_to_canceled() {
        assert_eq!(
            SubscriptionStatus::from_provider("canceled"),
            Some(SubscriptionStatus::Canceled)
        );
        assert_eq!(
            SubscriptionStatus::from_provider("unpaid"),
            Some(SubscriptionStatus::Canceled)
        );
    }

    #[test]
    fn provider_trialing_maps_to_trial() {
        assert_eq!(
            SubscriptionStatus::from_provider("trialing"),
            Some(SubscriptionStatus::Trial)
        );
    }

    #[test]
    fn provider_incomplete_is_unmapped() {
        assert_eq!(SubscriptionStatus::from_provider("incomplete"), None);
        assert_eq!(SubscriptionStatus::from_provider("paused"), None);
    }

    #[test]
    fn parses_database_values() {
        for status in [
            SubscriptionStatus::Trial,
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
        ] {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>().unwrap(), status);
        }
    }

    #[test]
    fn rejects_unknown_database_value() {
        assert!("expired".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::PastDue).unwrap();
        assert_eq!(json, "\"past_due\"");
    }

    #[test]
    fn only_trial_and_active_grant_access() {
        assert!(SubscriptionStatus::Trial.grants_access());
        assert!(SubscriptionStatus::Active.grants_access());
        assert!(!SubscriptionStatus::PastDue.grants_access());
        assert!(!SubscriptionStatus::Canceled.grants_access());
    }

    proptest! {
        #[test]
        fn unrecognized_provider_statuses_are_unmapped(status in "[a-z_]{1,20}") {
            prop_assume!(!["active", "past_due", "canceled", "unpaid", "trialing"].contains(&status.as_str()));
            prop_assert_eq!(SubscriptionStatus::from_provider(&status), None);
        }
    }
}
