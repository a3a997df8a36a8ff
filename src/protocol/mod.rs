//! Plaintext command protocol
//!
//! One read from a client is one command. Commands are matched by prefix and
//! every command gets exactly one textual reply.

pub mod command;
pub mod handler;

pub use command::{execute, format_created, format_listing, Command, Reply, HELP_TEXT};
pub use handler::CommandHandler;
