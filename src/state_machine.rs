//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern: a pure transition function maps
//! (session, event) to a new session plus effects for the runtime to execute.

mod effect;
pub mod event;
pub mod prompts;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, Reply};
pub use event::Event;
pub use state::{ConvContext, ConvState, Session};
pub use transition::{transition, TransitionError, TransitionResult};
