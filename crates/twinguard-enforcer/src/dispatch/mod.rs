//! Enforced command dispatch.
//!
//! Wires the policy store, the compiled-enforcer cache, and a thing command
//! handler into one pipeline: authorize, execute, then filter the response.
//! Also hosts the event filter used before delivering thing events.

pub mod dispatcher;
pub mod events;
pub mod memory;

pub use dispatcher::{EnforcedDispatcher, PolicyProvider, ThingHandler};
pub use events::EventFilter;
pub use memory::{InMemoryPolicies, InMemoryThings};
