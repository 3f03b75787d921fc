//! Typed thing signals (commands and events).
//!
//! Each family is a closed enum dispatched by exhaustive `match`. Every
//! signal knows the `thing` resource path it touches, which is all the
//! enforcer needs from it.

pub mod events;
pub mod things;

pub use events::ThingEvent;
pub use things::ThingCommand;

/// Resource type tag of thing documents.
pub const THING_RESOURCE_TYPE: &str = "thing";
