//! Policy enforcement (matching, resolution, JSON views).
//!
//! Compiles a policy snapshot into a per-type path trie once, then answers
//! decisions, reachability, subject lookups, and document projections against
//! it without further allocation of shared state.

pub mod cache;
pub mod engine;
mod index;
pub mod matcher;
mod view;

pub use cache::EnforcerCache;
pub use engine::{decide, is_reachable, project, Decision, PolicyEnforcer};
pub use matcher::matches;
