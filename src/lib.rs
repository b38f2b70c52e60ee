//! Subscription Sync - Stripe webhook ingestion
//!
//! This crate verifies Stripe webhook deliveries, records each event exactly
//! once, and synchronizes the subscription fields of application users.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
