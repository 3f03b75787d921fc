//! twinguard enforcer library entry.
//!
//! This crate wires policy compilation, decision and view building, the
//! enforcer cache, and the enforced command dispatcher into one stack. It is
//! consumed by the `twinguard-eval` binary (`main.rs`) and by integration
//! tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod eval;
pub mod obs;
pub mod policy;

pub use policy::{decide, is_reachable, matches, project, Decision, EnforcerCache, PolicyEnforcer};
