//! A tiny shell with Unix job control.
//!
//! Commands run as child processes, each in its own process group. A relay
//! thread turns SIGINT, SIGTSTP, SIGCHLD and SIGQUIT into messages for a
//! worker thread, which is the only owner of the job table.

pub mod config;
pub mod error;
mod shell;

pub use config::{Cli, Config};
pub use error::{JobRefError, JobTableError, ShellError};
pub use shell::parser::{parse_cmd, Cmd};
pub use shell::thread::{
    is_builtin, Job, JobId, JobRef, JobState, JobTable, Outcome, ShellMsg, Worker, WorkerMsg,
    MAX_JID, MAX_JOBS,
};
pub use shell::Shell;
