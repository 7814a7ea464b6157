//! Crate-wide error type and exit-code mapping.
//!
//! Nothing in this crate terminates the process from inside a component;
//! every fallible operation returns a `Result` that bubbles up to the
//! top-level dispatcher in `cli`, and `main` alone turns the error into a
//! process exit status.

use thiserror::Error;

use crate::value::ValueError;

#[derive(Error, Debug)]
pub enum Error {
    /// Bad command-line syntax (e.g. a bare argument followed by a flag
    /// without an intervening `--`).
    #[error("{0}")]
    Usage(String),

    /// Invalid store directory or missing script file.
    #[error("{0}")]
    Config(String),

    /// The script does not export a function for the requested subcommand.
    #[error("subcommand `{0}` is not defined by the script")]
    ScriptLookup(String),

    /// The exported function was found but produced no usable result; the
    /// underlying diagnostic has already been logged.
    #[error("subcommand `{0}` produced no result")]
    ScriptCall(String),

    /// Interpreter failure while loading or executing the script.
    #[error("lua: {0}")]
    Lua(#[from] mlua::Error),

    /// Typed marshalling failure at the host/script boundary.
    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Fork or exec failure while launching a task.
    #[error("process error: {0}")]
    Process(String),

    /// `waitpid` failure; reported with a dedicated exit status.
    #[error("wait failed: {0}")]
    Wait(String),
}

impl Error {
    /// Exit status `main` should terminate with for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Wait(_) => 254,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
