use anyhow::Result;
use std::sync::mpsc;
use thread::{spawn_sig_handler, ShellMsg, Worker, WorkerMsg};

use crate::config::Config;

pub(crate) mod parser;
pub(crate) mod thread;

/// Retry `f` while it is interrupted by a signal.
pub(crate) fn syscall<F, T>(f: F) -> Result<T, nix::Error>
where
    F: Fn() -> Result<T, nix::Error>,
{
    loop {
        match f() {
            Err(nix::errno::Errno::EINTR) => continue,
            other => return other,
        }
    }
}

#[derive(Debug)]
pub struct Shell {
    config: Config,
}

impl Shell {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Read/evaluate loop. Returns the exit status of the shell.
    ///
    /// Each line goes to the worker thread; the loop then blocks until the worker
    /// replies, which for a foreground job is when it exits or stops.
    pub fn run(&self) -> Result<i32> {
        let mut rl = rustyline::Editor::<()>::new()?;
        if let Some(history) = &self.config.history {
            if let Err(e) = rl.load_history(history) {
                tracing::debug!("unable to load history: {}", e);
            }
        }

        let (worker_tx, worker_rx) = mpsc::sync_channel(64);
        let (shell_tx, shell_rx) = mpsc::sync_channel(0);
        spawn_sig_handler(worker_tx.clone())?;
        Worker::new(&self.config)?.spawn(worker_rx, shell_tx)?;

        let exit_val = loop {
            match rl.readline(&self.config.prompt) {
                Ok(line) => {
                    let line_trimmed = line.trim();
                    if line_trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line_trimmed);

                    worker_tx.send(WorkerMsg::Cmd(line))?;
                    match shell_rx.recv()? {
                        ShellMsg::Continue => {}
                        ShellMsg::Quit(n) => break n,
                    }
                }
                // Ctrl-C at the prompt: nothing is in the foreground.
                Err(rustyline::error::ReadlineError::Interrupted) => continue,
                Err(rustyline::error::ReadlineError::Eof) => break 0,
                Err(e) => {
                    eprintln!("tsh: {}", e);
                    break 1;
                }
            }
        };

        if let Some(history) = &self.config.history {
            if let Err(e) = rl.save_history(history) {
                tracing::warn!("unable to save history: {}", e);
            }
        }
        Ok(exit_val)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Mutex, MutexGuard};

    static CHILDREN: Mutex<()> = Mutex::new(());

    /// Serializes tests that fork: reaping with `waitpid(-1)` would otherwise
    /// collect another test's children.
    pub fn lock_children() -> MutexGuard<'static, ()> {
        CHILDREN.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
