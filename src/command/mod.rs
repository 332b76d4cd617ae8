//! Command dispatch: context, results, handlers, routing, history
//!
//! raw text -> CommandProcessor -> middleware chain -> selected handler ->
//! CommandResult, with every invocation recorded in the history.

pub mod context;
pub mod handler;
pub mod history;
pub mod processor;
pub mod registry;
pub mod result;

pub use context::{ActorSnapshot, CommandContext, ContextSnapshot};
pub use handler::{CommandHandler, HandlerDescriptor, HandlerPriority};
pub use history::{CommandHistory, HistoryEntry, UndoRecord, UndoStack};
pub use processor::{CancelToken, CommandProcessor, ProcessorBuilder, HANDLER_FLAG};
pub use registry::HandlerRegistry;
pub use result::{CommandResult, GameEvent, InverseAction};
