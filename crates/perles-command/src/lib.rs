#![deny(missing_docs)]
//! # perles-command — the `Command` vocabulary and its FIFO processor
//!
//! `spec.md` §4.5: a single-consumer FIFO queue of polymorphic
//! [`Command`] values, dispatched to per-[`CommandKind`] handlers.
//! Concrete handlers (which mutate [`perles_repo`](../perles_repo/index.html)
//! repositories) live in `perles-handlers`; this crate only defines the
//! command vocabulary, the handler-registration seam, and the
//! processor loop itself.

mod command;
mod handler;
mod processor;

pub use command::{
    AssignTaskCommand, Command, CommandKind, DeliverMessageCommand, EnqueueMessageCommand,
    ProcessTurnCompleteCommand, SpawnProcessCommand, StopProcessCommand,
};
pub use handler::{CommandHandler, HandlerRegistry};
pub use processor::CommandProcessor;
