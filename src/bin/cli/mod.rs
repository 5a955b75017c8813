//! CLI module organization:
//! - args: argument structures
//! - commands: command execution

pub mod args;
pub mod commands;

pub use args::*;
pub use commands::*;
