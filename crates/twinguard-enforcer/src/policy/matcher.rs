//! Identity matching between policy entries and a requester.
//!
//! Exact-value comparison only: no wildcards, no issuer-only matches.

use twinguard_core::model::{AuthorizationContext, Subject};

/// True iff at least one of the entry's subjects is presented in `ctx`.
pub fn matches(entry_subjects: &[Subject], ctx: &AuthorizationContext) -> bool {
    entry_subjects.iter().any(|s| ctx.contains(s))
}
