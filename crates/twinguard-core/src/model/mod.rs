//! Policy data model.
//!
//! Immutable value types describing who may do what at which paths of a
//! hierarchical resource:
//! - `Subject` / `AuthorizationContext`: asserted identities.
//! - `Permission` / `Permissions`: named capabilities (READ, WRITE).
//! - `ResourcePath` / `ResourceKey`: JSON-pointer paths partitioned by type tag.
//! - `Resource` / `PolicyEntry` / `Policy`: the declarative statements.
//!
//! `wire` holds the JSON representation of a policy.

pub mod permission;
pub mod policy;
pub mod resource;
pub mod subject;
pub mod wire;

pub use permission::{Permission, Permissions};
pub use policy::{Policy, PolicyEntry};
pub use resource::{KeyLimits, Resource, ResourceKey, ResourcePath};
pub use subject::{AuthorizationContext, Subject};
