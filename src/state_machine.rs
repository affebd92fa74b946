//! Dialogue state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions: the
//! runtime feeds decoded events in and executes the effects that come out.

mod effect;
pub mod event;
pub mod prompts;
pub mod state;
pub mod tokens;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, Prompt};
pub use event::Event;
pub use state::{Destination, FlowContext, Step};
pub use transition::transition;
