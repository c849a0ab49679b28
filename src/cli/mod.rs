//! CLI module for procrun
//!
//! Provides command-line interface with the following subcommands:
//! - `run` - Run a program with arguments
//! - `shell` - Run a command string through a shell
//! - `preset` - Run a configured preset
//! - `config` - Show configuration

pub mod commands;

pub use commands::{Cli, Commands};
