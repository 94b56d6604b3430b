#![deny(missing_docs)]
//! # perles-handlers — command handlers (`spec.md` §4.5/§7)
//!
//! One [`perles_command::CommandHandler`] per [`perles_command::CommandKind`],
//! each translating a command into repository writes plus published
//! [`perles_types::ProcessEvent`]s. [`build_registry`] wires every
//! handler defined here into a [`HandlerRegistry`] ready to hand to a
//! [`perles_command::CommandProcessor`].

mod context;
mod handlers;

pub use context::HandlerContext;
pub use handlers::{
    AssignTaskHandler, DeliverMessageHandler, EnqueueMessageHandler, ProcessTurnCompleteHandler,
    SpawnProcessHandler, StopProcessHandler,
};

use std::sync::Arc;

use perles_command::{CommandKind, HandlerRegistry};

/// Register every handler this crate defines against its
/// [`CommandKind`] in a fresh [`HandlerRegistry`].
pub fn build_registry(ctx: HandlerContext) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(
        CommandKind::ProcessTurnComplete,
        Arc::new(ProcessTurnCompleteHandler::new(ctx.clone())),
    );
    registry.register(CommandKind::SpawnProcess, Arc::new(SpawnProcessHandler::new(ctx.clone())));
    registry.register(CommandKind::StopProcess, Arc::new(StopProcessHandler::new(ctx.clone())));
    registry.register(CommandKind::AssignTask, Arc::new(AssignTaskHandler::new(ctx.clone())));
    registry.register(
        CommandKind::DeliverMessage,
        Arc::new(DeliverMessageHandler::new(ctx.clone())),
    );
    registry.register(CommandKind::EnqueueMessage, Arc::new(EnqueueMessageHandler::new(ctx)));
    registry
}
