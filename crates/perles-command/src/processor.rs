//! The single-consumer FIFO that drains submitted commands in order.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::command::Command;
use crate::handler::HandlerRegistry;

/// Dequeues submitted commands serially and dispatches each to the
/// handler registered for its [`CommandKind`](crate::CommandKind)
/// (`spec.md` §4.5). Serial execution is the only concurrency
/// guarantee handlers may rely on.
pub struct CommandProcessor {
    sender: mpsc::UnboundedSender<Box<dyn Command>>,
    consumer: JoinHandle<()>,
}

impl CommandProcessor {
    /// Spawn the consumer task and return a processor ready for
    /// `submit`. `registry` is moved into the consumer task.
    pub fn spawn(registry: HandlerRegistry) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Box<dyn Command>>();

        let consumer = tokio::spawn(async move {
            while let Some(command) = receiver.recv().await {
                match registry.get(command.kind()) {
                    Some(handler) => handler.handle(command.as_ref()).await,
                    None => {
                        tracing::warn!(
                            kind = ?command.kind(),
                            "no handler registered for command kind, dropping"
                        );
                    }
                }
            }
        });

        Self { sender, consumer }
    }

    /// Enqueue a command. Commands are total: this never fails from
    /// the caller's perspective except if the processor has already
    /// been shut down, in which case the command is logged and dropped.
    pub fn submit(&self, command: impl Command + 'static) {
        if self.sender.send(Box::new(command)).is_err() {
            tracing::warn!("command processor shut down, dropping submitted command");
        }
    }

    /// Stop accepting new commands and wait for the queue to drain.
    pub async fn shutdown(self) {
        drop(self.sender);
        let _ = self.consumer.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandKind, ProcessTurnCompleteCommand};
    use crate::handler::CommandHandler;
    use async_trait::async_trait;
    use perles_types::{ProcessId, TokenMetrics};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct RecordingHandler {
        order: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl CommandHandler for RecordingHandler {
        async fn handle(&self, command: &dyn Command) {
            let cmd = command
                .as_any()
                .downcast_ref::<ProcessTurnCompleteCommand>()
                .expect("wrong concrete type routed to handler");
            self.order.lock().await.push(cmd.process_id.to_string());
        }
    }

    #[tokio::test]
    async fn dispatches_to_the_registered_handler_in_submit_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.register(
            CommandKind::ProcessTurnComplete,
            Arc::new(RecordingHandler { order: order.clone() }),
        );

        let processor = CommandProcessor::spawn(registry);
        for id in ["w1", "w2", "w3"] {
            processor.submit(ProcessTurnCompleteCommand {
                process_id: ProcessId::from(id),
                succeeded: true,
                metrics: TokenMetrics::default(),
                error: None,
            });
        }
        processor.shutdown().await;

        assert_eq!(*order.lock().await, vec!["w1", "w2", "w3"]);
    }

    #[tokio::test]
    async fn unregistered_kind_is_dropped_without_panicking() {
        let processor = CommandProcessor::spawn(HandlerRegistry::new());
        processor.submit(ProcessTurnCompleteCommand {
            process_id: ProcessId::from("w1"),
            succeeded: true,
            metrics: TokenMetrics::default(),
            error: None,
        });
        // Reaching shutdown without panicking is the assertion.
        processor.shutdown().await;
    }
}
