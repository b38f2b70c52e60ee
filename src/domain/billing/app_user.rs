//! Subscription-bearing application user and partial updates to it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::status::SubscriptionStatus;
use crate::domain::foundation::{AuthUid, StripeCustomerId};

/// Subscription fields of an application user.
///
/// The record itself belongs to the auth/database backend; only the
/// subscription fields are mutated here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppUser {
    pub auth_uid: AuthUid,
    pub stripe_customer_id: Option<StripeCustomerId>,
    pub subscription_status: SubscriptionStatus,
    pub trial_expires_at: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub plan_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
}

impl AppUser {
    /// Creates a user in trial state with no billing identity.
    pub fn new_trial(auth_uid: AuthUid, trial_expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            auth_uid,
            stripe_customer_id: None,
            subscription_status: SubscriptionStatus::Trial,
            trial_expires_at,
            current_period_end: None,
            plan_id: None,
            stripe_subscription_id: None,
        }
    }

    /// Links the user to a billing customer.
    pub fn with_customer(mut self, customer_id: StripeCustomerId) -> Self {
        self.stripe_customer_id = Some(customer_id);
        self
    }

    /// Access rule: trial/active status, or a trial window still open.
    pub fn has_access(&self, now: DateTime<Utc>) -> bool {
        let trial_open = self.trial_expires_at.is_some_and(|expires| expires > now);
        self.subscription_status.grants_access() || trial_open
    }

    /// Applies a partial update in place.
    pub fn apply(&mut self, update: &SubscriptionUpdate) {
        if let Some(status) = update.subscription_status {
            self.subscription_status = status;
        }
        if let Some(period_end) = update.current_period_end {
            self.current_period_end = Some(period_end);
        }
        if let Some(plan_id) = &update.plan_id {
            self.plan_id = Some(plan_id.clone());
        }
        if let Some(subscription_id) = &update.stripe_subscription_id {
            self.stripe_subscription_id = Some(subscription_id.clone());
        }
        if update.clear_trial {
            self.trial_expires_at = None;
        }
    }
}

/// Partial subscription update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubscriptionUpdate {
    pub subscription_status: Option<SubscriptionStatus>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub plan_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    /// Sets `trial_expires_at` to null.
    pub clear_trial: bool,
}

impl SubscriptionUpdate {
    /// True when applying the update would not write any column.
    pub fn is_empty(&self) -> bool {
        self.subscription_status.is_none()
            && self.current_period_end.is_none()
            && self.plan_id.is_none()
            && self.stripe_subscription_id.is_none()
            && !self.clear_trial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn trial_user(expires: Option<DateTime<Utc>>) -> AppUser {
        AppUser::new_trial(AuthUid::from_uuid(Uuid::new_v4()), expires)
    }

    #[test]
    fn open_trial_window_grants_access_even_when_canceled() {
        let now = Utc::now();
        let mut user = trial_user(Some(now + Duration::days(3)));
        user.subscription_status = SubscriptionStatus::Canceled;

        assert!(user.has_access(now));
    }

    #[test]
    fn past_due_without_trial_has_no_access() {
        let now = Utc::now();
        let mut user = trial_user(Some(now - Duration::days(1)));
        user.subscription_status = SubscriptionStatus::PastDue;

        assert!(!user.has_access(now));
    }

    #[test]
    fn apply_only_touches_set_fields() {
        let now = Utc::now();
        let mut user = trial_user(Some(now));
        user.plan_id = Some("price_basic".to_string());

        user.apply(&SubscriptionUpdate {
            subscription_status: Some(SubscriptionStatus::PastDue),
            ..Default::default()
        });

        assert_eq!(user.subscription_status, SubscriptionStatus::PastDue);
        assert_eq!(user.plan_id.as_deref(), Some("price_basic"));
        assert_eq!(user.trial_expires_at, Some(now));
    }

    #[test]
    fn apply_clears_trial_when_requested() {
        let mut user = trial_user(Some(Utc::now()));

        user.apply(&SubscriptionUpdate {
            clear_trial: true,
            ..Default::default()
        });

        assert!(user.trial_expires_at.is_none());
    }

    #[test]
    fn default_update_is_empty() {
        assert!(SubscriptionUpdate::default().is_empty());
    }
}
