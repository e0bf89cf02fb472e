mod builtin;
mod job;
mod process;
mod relay;
mod waiter;
mod worker;

use anyhow::Result;
use nix::{libc::c_int, sys::signal::Signal};
use signal_hook::iterator::Signals;
use std::sync::mpsc;

pub use builtin::{is_builtin, JobRef};
pub use job::{Job, JobId, JobState, JobTable, MAX_JID, MAX_JOBS};
pub use worker::{Outcome, Worker, WorkerMsg};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellMsg {
    Continue,  // Read the next line
    Quit(i32), // Quit shell. (i32) is the exit code
}

/// Relay SIGINT, SIGTSTP, SIGCHLD and SIGQUIT to the worker as messages.
pub fn spawn_sig_handler(tx: mpsc::SyncSender<WorkerMsg>) -> Result<()> {
    let mut signals = Signals::new([
        Signal::SIGINT as c_int,
        Signal::SIGTSTP as c_int,
        Signal::SIGCHLD as c_int,
        Signal::SIGQUIT as c_int,
    ])?;
    std::thread::Builder::new()
        .name("tsh-signals".to_string())
        .spawn(move || {
            for sig in signals.forever() {
                if tx.send(WorkerMsg::Signal(sig)).is_err() {
                    break;
                }
            }
        })?;
    Ok(())
}
