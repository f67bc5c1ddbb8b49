//! Conversation state machine
//!
//! Elm-style: a pure `transition` maps (state, event) to a new state plus
//! effects, and the runtime executes the effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{ConvContext, ConvState};
pub use transition::{transition, TransitionError};
