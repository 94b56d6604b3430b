//! Handler registry: one [`CommandHandler`] per [`CommandKind`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::command::{Command, CommandKind};

/// Handles every command registered under one [`CommandKind`].
///
/// Handlers never return errors to the processor (`spec.md` §4.5:
/// "All commands are total") — they log and publish error events
/// themselves when something goes wrong.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Apply `command`'s effect. `command.kind()` is guaranteed to
    /// equal the kind this handler was registered under.
    async fn handle(&self, command: &dyn Command);
}

/// Maps each [`CommandKind`] to the handler responsible for it.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<CommandKind, Arc<dyn CommandHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// Register `handler` for `kind`, replacing any prior registration.
    pub fn register(&mut self, kind: CommandKind, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Look up the handler registered for `kind`, if any.
    pub fn get(&self, kind: CommandKind) -> Option<&Arc<dyn CommandHandler>> {
        self.handlers.get(&kind)
    }
}
