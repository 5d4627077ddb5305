//! Core domain modules
//!
//! Types and errors shared by the resolver, selection state, session channel
//! and input pipeline.

pub mod errors;
pub mod types;

pub use errors::{CalcError, CommandError, RegistryError, TransportError};
pub use types::{
    Action, ActionIntent, ChannelState, CommandResult, Frame, FrameKind, Outcome, ResultKind,
    Session,
};
