//! Operator command handling

pub mod command_handler;

pub use command_handler::{CommandOutcome, DialogCommandHandler};
