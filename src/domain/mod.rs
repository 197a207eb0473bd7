//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `billing` - Account billing state, processor snapshots, webhook verification

pub mod billing;
pub mod foundation;
