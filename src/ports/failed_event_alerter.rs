//! FailedEventAlerter port - Out-of-band notification of failed webhooks.
//!
//! Processing failures are acknowledged to Stripe with 200 so it does not
//! retry poison events. Failed ledger rows therefore need someone watching;
//! this hook is where that someone gets told.

use async_trait::async_trait;

#[async_trait]
pub trait FailedEventAlerter: Send + Sync {
    /// Called once per event whose processing failed.
    async fn event_failed(&self, event_id: &str, event_type: &str, reason: &str);
}
