//! Error types for the shell.
//!
//! - [`JobTableError`]: a job table operation was refused
//! - [`JobRefError`]: a `fg`/`bg` argument could not be resolved to a job
//! - [`ShellError`]: everything the worker can report, including fatal OS errors

use thiserror::Error;

/// Job table operation refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobTableError {
    #[error("invalid process id {0}")]
    InvalidPid(i32),

    #[error("process {0} is already in the job table")]
    DuplicatePid(i32),

    /// Only one job may be in the foreground.
    #[error("job with process id {0} already holds the foreground")]
    ForegroundBusy(i32),

    #[error("Tried to create too many jobs")]
    CapacityExceeded,
}

/// User-supplied job reference errors for `fg` and `bg`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobRefError {
    #[error("{cmd} command requires PID or %jobid argument")]
    Missing { cmd: String },

    #[error("{cmd}: argument must be a PID or %jobid")]
    Malformed { cmd: String },

    #[error("%{jid}: No such job")]
    NoSuchJob { jid: usize },

    #[error("({pid}): No such process")]
    NoSuchProcess { pid: i32 },
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    JobRef(#[from] JobRefError),

    #[error(transparent)]
    JobTable(#[from] JobTableError),

    #[error("{0}")]
    InvalidArgument(String),

    /// The job table disagrees with what the OS reported.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("{context}: {source}")]
    Os {
        context: &'static str,
        #[source]
        source: nix::Error,
    },
}

impl ShellError {
    pub fn os(context: &'static str) -> impl FnOnce(nix::Error) -> ShellError {
        move |source| ShellError::Os { context, source }
    }

    /// OS call failures leave the shell in an unknown state; the worker exits on them.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::Os { .. })
    }
}
