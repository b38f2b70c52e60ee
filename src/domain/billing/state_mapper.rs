//! Subscription state mapper.
//!
//! Pure translation from Stripe event payloads to planned changes of a
//! user's subscription fields. Nothing here touches storage: the plan is
//! resolved against the current user record by the webhook processor.
//!
//! | Event                           | Status                         | Other fields                          |
//! |---------------------------------|--------------------------------|---------------------------------------|
//! | `customer.subscription.created` | active                         | period end, plan, subscription id, clear trial |
//! | `customer.subscription.updated` | provider status, else existing | period end, plan                      |
//! | `customer.subscription.deleted` | canceled                       | period end = canceled_at, else existing |
//! | `invoice.payment_succeeded`     | active                         | period end from first line, else existing |
//! | `invoice.payment_failed`        | past_due                       | none                                  |

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::app_user::{AppUser, SubscriptionUpdate};
use super::status::SubscriptionStatus;
use super::stripe_event::{StripeEvent, StripeEventType, StripeInvoice, StripeSubscription};
use super::webhook_errors::WebhookError;
use crate::domain::foundation::StripeCustomerId;

/// Audit change types, one per supported event.
pub mod change_type {
    pub const SUBSCRIPTION_CREATED: &str = "subscription_created";
    pub const SUBSCRIPTION_UPDATED: &str = "subscription_updated";
    pub const SUBSCRIPTION_CANCELED: &str = "subscription_canceled";
    pub const PAYMENT_SUCCEEDED: &str = "payment_succeeded";
    pub const PAYMENT_FAILED: &str = "payment_failed";
}

/// What an event wants to do with one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPlan<T> {
    /// The event class does not concern this field.
    Untouched,
    /// The event concerns this field but carries no value; retain the stored one.
    Keep,
    /// Overwrite with this value.
    Set(T),
}

impl<T> FieldPlan<T> {
    fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldPlan::Set(v),
            None => FieldPlan::Keep,
        }
    }

    fn is_touched(&self) -> bool {
        !matches!(self, FieldPlan::Untouched)
    }

    fn into_set(self) -> Option<T> {
        match self {
            FieldPlan::Set(v) => Some(v),
            _ => None,
        }
    }
}

/// Planned change of a user's subscription fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpdate {
    pub subscription_status: FieldPlan<SubscriptionStatus>,
    pub current_period_end: FieldPlan<DateTime<Utc>>,
    pub plan_id: FieldPlan<String>,
    pub stripe_subscription_id: FieldPlan<String>,
    pub clear_trial: bool,
}

impl PlannedUpdate {
    fn untouched() -> Self {
        Self {
            subscription_status: FieldPlan::Untouched,
            current_period_end: FieldPlan::Untouched,
            plan_id: FieldPlan::Untouched,
            stripe_subscription_id: FieldPlan::Untouched,
            clear_trial: false,
        }
    }

    /// Resolves the plan against the stored user.
    ///
    /// Snapshots only contain the fields this event class touches.
    pub fn resolve(self, user: &AppUser) -> ResolvedChange {
        let mut previous = Map::new();
        let mut current = Map::new();

        if self.subscription_status.is_touched() {
            previous.insert(
                "subscription_status".into(),
                Value::from(user.subscription_status.as_str()),
            );
        }
        if self.stripe_subscription_id.is_touched() {
            previous.insert(
                "stripe_subscription_id".into(),
                opt_value(user.stripe_subscription_id.as_deref()),
            );
        }
        if self.current_period_end.is_touched() {
            previous.insert(
                "current_period_end".into(),
                opt_value(user.current_period_end.map(|t| t.to_rfc3339())),
            );
        }
        if self.plan_id.is_touched() {
            previous.insert("plan_id".into(), opt_value(user.plan_id.as_deref()));
        }
        if self.clear_trial {
            previous.insert(
                "trial_expires_at".into(),
                opt_value(user.trial_expires_at.map(|t| t.to_rfc3339())),
            );
        }

        let update = SubscriptionUpdate {
            subscription_status: self.subscription_status.into_set(),
            current_period_end: self.current_period_end.into_set(),
            plan_id: self.plan_id.into_set(),
            stripe_subscription_id: self.stripe_subscription_id.into_set(),
            clear_trial: self.clear_trial,
        };

        let mut after = user.clone();
        after.apply(&update);
        for key in previous.keys() {
            let value = match key.as_str() {
                "subscription_status" => Value::from(after.subscription_status.as_str()),
                "stripe_subscription_id" => opt_value(after.stripe_subscription_id.as_deref()),
                "current_period_end" => opt_value(after.current_period_end.map(|t| t.to_rfc3339())),
                "plan_id" => opt_value(after.plan_id.as_deref()),
                "trial_expires_at" => opt_value(after.trial_expires_at.map(|t| t.to_rfc3339())),
                _ => Value::Null,
            };
            current.insert(key.clone(), value);
        }

        ResolvedChange {
            update,
            previous: Value::Object(previous),
            current: Value::Object(current),
        }
    }
}

fn opt_value<T: Into<Value>>(value: Option<T>) -> Value {
    value.map(Into::into).unwrap_or(Value::Null)
}

/// Concrete update plus before/after snapshots for the audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChange {
    pub update: SubscriptionUpdate,
    pub previous: Value,
    pub current: Value,
}

/// A change addressed to the user owning a billing customer.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionChange {
    pub customer_id: StripeCustomerId,
    pub change_type: &'static str,
    pub plan: PlannedUpdate,
}

/// Result of mapping one event.
#[derive(Debug, Clone, PartialEq)]
pub enum MapperOutcome {
    /// Apply this change to the customer's user.
    Apply(SubscriptionChange),
    /// Nothing to do for this event.
    Skip(String),
}

/// Maps a verified event to a planned subscription change.
///
/// # Errors
///
/// Returns a non-retryable `EventProcessing` error when the event object
/// does not have the shape its type promises.
pub fn map_event(event: &StripeEvent) -> Result<MapperOutcome, WebhookError> {
    match event.parsed_type() {
        StripeEventType::CustomerSubscriptionCreated => {
            subscription_created(&decode(event)?).map(MapperOutcome::Apply)
        }
        StripeEventType::CustomerSubscriptionUpdated => {
            subscription_updated(&decode(event)?).map(MapperOutcome::Apply)
        }
        StripeEventType::CustomerSubscriptionDeleted => {
            subscription_deleted(&decode(event)?).map(MapperOutcome::Apply)
        }
        StripeEventType::InvoicePaymentSucceeded => payment_succeeded(&decode(event)?),
        StripeEventType::InvoicePaymentFailed => payment_failed(&decode(event)?),
        StripeEventType::Unknown => Ok(MapperOutcome::Skip(format!(
            "unsupported event type {}",
            event.event_type
        ))),
    }
}

fn decode<T: serde::de::DeserializeOwned>(event: &StripeEvent) -> Result<T, WebhookError> {
    event
        .deserialize_object()
        .map_err(|e| WebhookError::EventProcessing {
            message: format!("Unexpected {} payload: {}", event.event_type, e),
            retryable: false,
        })
}

fn customer(id: &str) -> Result<StripeCustomerId, WebhookError> {
    StripeCustomerId::new(id).map_err(|e| WebhookError::EventProcessing {
        message: e.to_string(),
        retryable: false,
    })
}

fn epoch(field: &'static str, secs: i64) -> Result<DateTime<Utc>, WebhookError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| WebhookError::EventProcessing {
        message: format!("{} out of range: {}", field, secs),
        retryable: false,
    })
}

fn optional_epoch(
    field: &'static str,
    secs: Option<i64>,
) -> Result<Option<DateTime<Utc>>, WebhookError> {
    secs.map(|s| epoch(field, s)).transpose()
}

/// `customer.subscription.created`
pub fn subscription_created(
    subscription: &StripeSubscription,
) -> Result<SubscriptionChange, WebhookError> {
    let plan = PlannedUpdate {
        subscription_status: FieldPlan::Set(SubscriptionStatus::Active),
        current_period_end: FieldPlan::from_option(optional_epoch(
            "current_period_end",
            subscription.current_period_end,
        )?),
        plan_id: FieldPlan::from_option(subscription.plan_id().map(str::to_string)),
        stripe_subscription_id: FieldPlan::Set(subscription.id.clone()),
        clear_trial: true,
    };

    Ok(SubscriptionChange {
        customer_id: customer(&subscription.customer)?,
        change_type: change_type::SUBSCRIPTION_CREATED,
        plan,
    })
}

/// `customer.subscription.updated`
pub fn subscription_updated(
    subscription: &StripeSubscription,
) -> Result<SubscriptionChange, WebhookError> {
    let plan = PlannedUpdate {
        subscription_status: FieldPlan::from_option(SubscriptionStatus::from_provider(
            &subscription.status,
        )),
        current_period_end: FieldPlan::from_option(optional_epoch(
            "current_period_end",
            subscription.current_period_end,
        )?),
        plan_id: FieldPlan::from_option(subscription.plan_id().map(str::to_string)),
        ..PlannedUpdate::untouched()
    };

    Ok(SubscriptionChange {
        customer_id: customer(&subscription.customer)?,
        change_type: change_type::SUBSCRIPTION_UPDATED,
        plan,
    })
}

/// `customer.subscription.deleted`
pub fn subscription_deleted(
    subscription: &StripeSubscription,
) -> Result<SubscriptionChange, WebhookError> {
    let plan = PlannedUpdate {
        subscription_status: FieldPlan::Set(SubscriptionStatus::Canceled),
        current_period_end: FieldPlan::from_option(optional_epoch(
            "canceled_at",
            subscription.canceled_at,
        )?),
        ..PlannedUpdate::untouched()
    };

    Ok(SubscriptionChange {
        customer_id: customer(&subscription.customer)?,
        change_type: change_type::SUBSCRIPTION_CANCELED,
        plan,
    })
}

/// `invoice.payment_succeeded`
pub fn payment_succeeded(invoice: &StripeInvoice) -> Result<MapperOutcome, WebhookError> {
    if invoice.subscription.is_none() {
        return Ok(MapperOutcome::Skip(
            "invoice not linked to a subscription".to_string(),
        ));
    }

    let plan = PlannedUpdate {
        subscription_status: FieldPlan::Set(SubscriptionStatus::Active),
        current_period_end: FieldPlan::from_option(optional_epoch(
            "period.end",
            invoice.period_end(),
        )?),
        ..PlannedUpdate::untouched()
    };

    Ok(MapperOutcome::Apply(SubscriptionChange {
        customer_id: customer(&invoice.customer)?,
        change_type: change_type::PAYMENT_SUCCEEDED,
        plan,
    }))
}

/// `invoice.payment_failed`
pub fn payment_failed(invoice: &StripeInvoice) -> Result<MapperOutcome, WebhookError> {
    if invoice.subscription.is_none() {
        return Ok(MapperOutcome::Skip(
            "invoice not linked to a subscription".to_string(),
        ));
    }

    let plan = PlannedUpdate {
        subscription_status: FieldPlan::Set(SubscriptionStatus::PastDue),
        ..PlannedUpdate::untouched()
    };

    Ok(MapperOutcome::Apply(SubscriptionChange {
        customer_id: customer(&invoice.customer)?,
        change_type: change_type::PAYMENT_FAILED,
        plan,
    }))
}
