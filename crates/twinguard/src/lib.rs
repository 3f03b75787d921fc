//! Top-level facade crate for twinguard.
//!
//! Re-exports the policy model and the enforcer so users can depend on a single crate.

pub mod core {
    pub use twinguard_core::*;
}

pub mod enforcer {
    pub use twinguard_enforcer::*;
}
