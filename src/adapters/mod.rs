//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - Ledger, users and audit log on PostgreSQL
//! - `memory` - In-memory implementations for tests and local runs
//! - `alerting` - Failed-event notification
//! - `auth` - Bearer token validation
//! - `http` - Axum routers and handlers

pub mod alerting;
pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
