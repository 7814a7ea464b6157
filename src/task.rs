//! Task execution: tokenizing a shell-like command string and running it
//! in-process, in a forked child, or via a system shell.

use std::ffi::CString;
use std::process::Command;

use tracing::{debug, warn};

use crate::errors::{Error, Result};
use crate::value::{FromValue, Value, ValueError};

/// One OS-level command execution, produced from a script's return value
/// and consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub use_shell: bool,
    pub new_process: bool,
    pub search_path: bool,
    pub command: String,
}

impl Default for TaskSpec {
    fn default() -> Self {
        TaskSpec {
            use_shell: false,
            new_process: true,
            search_path: true,
            command: String::new(),
        }
    }
}

/// Scripts may express flags as booleans or as the strings
/// `"true"`/`"false"`.
fn flag(map: &Value, field: &'static str, default: bool) -> std::result::Result<bool, ValueError> {
    let Value::Map(entries) = map else {
        return Err(ValueError::Mismatch {
            expected: "mapping",
            found: map.kind(),
        });
    };
    match entries.get(&crate::value::Key::Str(field.to_string())) {
        None => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Str(s)) => Ok(s == "true"),
        Some(other) => Err(ValueError::Mismatch {
            expected: "bool",
            found: other.kind(),
        }),
    }
}

impl FromValue for TaskSpec {
    fn from_value(value: &Value) -> std::result::Result<Self, ValueError> {
        let Value::Map(entries) = value else {
            return Err(ValueError::Mismatch {
                expected: "mapping",
                found: value.kind(),
            });
        };

        let command = match entries.get(&crate::value::Key::Str("command".to_string())) {
            Some(v) => String::from_value(v)?,
            None => return Err(ValueError::MissingField("command")),
        };

        Ok(TaskSpec {
            use_shell: flag(value, "use_shell", false)?,
            new_process: flag(value, "new_process", true)?,
            search_path: flag(value, "search_path", true)?,
            command,
        })
    }
}

/// Split a command string into tokens. A `'` or `"` opens a quoted span
/// that is taken verbatim (no escape processing) until the matching quote;
/// whitespace outside quotes separates tokens. An unterminated quote logs a
/// warning but the accumulated partial token is still emitted.
#[must_use]
pub fn tokenize(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut accumulated = String::new();
    let mut quote: Option<char> = None;

    for ch in command.chars() {
        match ch {
            '\'' | '"' => {
                if quote == Some(ch) {
                    quote = None;
                } else if quote.is_none() {
                    quote = Some(ch);
                } else {
                    accumulated.push(ch);
                }
            }
            c if c.is_whitespace() && quote.is_none() => {
                if !accumulated.is_empty() {
                    tokens.push(std::mem::take(&mut accumulated));
                }
            }
            c => accumulated.push(c),
        }
    }

    if !accumulated.is_empty() {
        if let Some(q) = quote {
            warn!("quote {q} not closed");
        }
        tokens.push(accumulated);
    }

    tokens
}

impl TaskSpec {
    /// Run the task and return its exit status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Process`] when the shell or child cannot be
    /// launched, and [`Error::Wait`] when waiting on the child fails.
    pub fn run(&self) -> Result<i32> {
        if self.use_shell {
            return self.run_in_shell();
        }

        let tokens = tokenize(&self.command);
        if tokens.is_empty() {
            warn!("no command specified");
            return Ok(1);
        }

        let argv = self.resolve_argv(tokens)?;

        if self.new_process {
            spawn_and_wait(&argv)
        } else {
            // Replace the current image; only reachable on exec failure.
            exec_image(&argv);
            Err(Error::Process(format!(
                "failed to execute `{}`",
                self.command
            )))
        }
    }

    fn run_in_shell(&self) -> Result<i32> {
        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .status()
            .map_err(|e| Error::Process(format!("failed to invoke shell: {e}")))?;

        let code = decode_status(&status);
        debug!("process in shell returned {code}");
        Ok(code)
    }

    /// Turn tokens into the exec argument vector, resolving the executable
    /// through `PATH` when `search_path` is set (otherwise the first token
    /// must already be a usable path).
    fn resolve_argv(&self, mut tokens: Vec<String>) -> Result<Vec<CString>> {
        if self.search_path {
            let resolved = which::which(&tokens[0])
                .map_err(|e| Error::Process(format!("`{}`: {e}", tokens[0])))?;
            tokens[0] = resolved.to_string_lossy().to_string();
        }

        tokens
            .into_iter()
            .map(|t| {
                CString::new(t.clone())
                    .map_err(|_| Error::Process(format!("argument `{t}` contains a NUL byte")))
            })
            .collect()
    }
}

fn decode_status(status: &std::process::ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => {
            // Terminated by a signal.
            warn!("shell command terminated by a signal");
            1
        }
    }
}

/// Fork, exec in the child, and block until the child terminates.
fn spawn_and_wait(argv: &[CString]) -> Result<i32> {
    // SAFETY: fork has no preconditions; the child only calls exec and
    // _exit, both async-signal-safe.
    let pid = unsafe { libc::fork() };

    match pid {
        -1 => Err(Error::Process("fork failed".to_string())),
        0 => {
            exec_image(argv);
            // exec only returns on failure; leave the child immediately
            // without running parent-owned destructors.
            eprintln!("sk: failed to execute child process");
            unsafe { libc::_exit(1) }
        }
        _ => wait_for(pid),
    }
}

fn wait_for(pid: libc::pid_t) -> Result<i32> {
    let mut status: libc::c_int = 0;
    // SAFETY: status points to a valid, writable c_int.
    let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
    if rc < 0 {
        return Err(Error::Wait(format!("waitpid failed for pid {pid}")));
    }

    if libc::WIFEXITED(status) {
        let code = libc::WEXITSTATUS(status);
        debug!("process {pid} returned {code}");
        return Ok(code);
    }

    if libc::WIFSIGNALED(status) {
        let signal = libc::WTERMSIG(status);
        let core = if libc::WCOREDUMP(status) {
            " - core dumped"
        } else {
            ""
        };
        warn!("process {pid} killed: signal {signal}{core}");
        return Ok(1);
    }

    Ok(0)
}

/// Replace the current process image. Returns only on failure.
fn exec_image(argv: &[CString]) {
    let mut ptrs: Vec<*const libc::c_char> = argv.iter().map(|a| a.as_ptr()).collect();
    ptrs.push(std::ptr::null());

    // SAFETY: ptrs is a NULL-terminated array of pointers into CStrings
    // that outlive the call; execv does not return on success.
    unsafe {
        libc::execv(ptrs[0], ptrs.as_ptr());
    }
}
