//! twinguard core: policy model, resource paths, thing commands, and errors.
//!
//! This crate defines the value types the enforcer operates on and the error
//! surface shared by every twinguard crate. It does not depend on an async
//! runtime; every constructor validates its invariants so that a value of a
//! model type is always well formed.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed input surfaces as `TwinGuardError`, never as a crash and never
//! as an authorization decision.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod model;
pub mod signals;

/// Shared result type.
pub use error::{Result, TwinGuardError};
pub use model::{
    AuthorizationContext, KeyLimits, Permission, Permissions, Policy, PolicyEntry, Resource,
    ResourceKey, ResourcePath, Subject,
};
