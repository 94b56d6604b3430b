#![deny(missing_docs)]
//! # perles-repo — in-memory repositories (`spec.md` §4.3)
//!
//! Four independently-locked repositories over the entities defined in
//! [`perles_types`]: [`ProcessRepo`], [`TaskRepo`], [`QueueRepo`]
//! (plus the [`MessageQueue`] it owns), and [`MessageRepo`]. Every read
//! method returns owned copies so callers cannot mutate shared state
//! except through a `save`/`append`/`enqueue` call.

mod message;
mod process;
mod queue;
mod task;

pub use message::{MessageRepo, MESSAGES_TOPIC};
pub use process::ProcessRepo;
pub use queue::{MessageQueue, QueueRepo};
pub use task::TaskRepo;
