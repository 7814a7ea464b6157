//! # sk
//!
//! A scriptable subcommand runner. Subcommands live in a Lua script
//! (`~/.sk/sk.lua` by default); each one receives the parsed command line
//! and returns the OS command to execute. The script's `doc` string, free
//! text with docopt-style `Commands:` and `Options:` sections, drives help
//! output and tab completion.

pub mod args;
pub mod cli;
pub mod complete;
pub mod docs;
pub mod errors;
pub mod natives;
pub mod options;
pub mod script;
pub mod store;
pub mod task;
pub mod value;
