//! Billing Coordinator - keeps each account's billing record in step with
//! Stripe.
//!
//! Hosted checkout sessions start subscriptions or replace the card on file;
//! the checkout redirect, user cancellations and `invoice.payment_failed`
//! webhooks are reconciled into a versioned per-account record.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
