use std::{
    fmt::Display,
    io::{self, Write},
    sync::mpsc,
};

use anyhow::Result;
use nix::{
    sys::signal::Signal,
    unistd::Pid,
};

use super::{
    builtin::{is_builtin, Builtin, JobRef},
    job::{JobState, JobTable, MAX_JID},
    process::{fork_exec, ChildSignalBlock},
    relay::{forward_to_foreground, reap_children, signal_group},
    waiter::ForegroundWaiter,
    ShellMsg,
};
use crate::{
    config::Config,
    error::{JobTableError, ShellError},
    shell::parser::{parse_cmd, Cmd},
};

pub enum WorkerMsg {
    Signal(i32), // Signal input
    Cmd(String), // Command input
}

/// What the read loop should do after a command or signal has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Wait(Pid), // Block until this job leaves the foreground
    Quit(i32),
}

/// Sole owner of the job table.
///
/// Commands and signal events are handled one at a time, so the table never
/// sees two writers. Listings, notices and user errors share one output stream.
pub struct Worker {
    jobs: JobTable,
    waiter: ForegroundWaiter,
    verbose: bool,
    out: Box<dyn Write + Send>,
}

impl Worker {
    pub fn new(config: &Config) -> Result<Self, ShellError> {
        Self::with_output(config, Box::new(io::stdout()))
    }

    pub fn with_output(config: &Config, out: Box<dyn Write + Send>) -> Result<Self, ShellError> {
        if !(1..=MAX_JID).contains(&config.max_jobs) {
            return Err(ShellError::InvalidArgument(format!(
                "max jobs must be between 1 and {}, got {}",
                MAX_JID, config.max_jobs
            )));
        }
        Ok(Worker {
            jobs: JobTable::with_limits(config.max_jobs, MAX_JID),
            waiter: ForegroundWaiter::new(),
            verbose: config.verbose,
            out,
        })
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    pub fn spawn(
        mut self,
        worker_rx: mpsc::Receiver<WorkerMsg>,
        shell_tx: mpsc::SyncSender<ShellMsg>,
    ) -> Result<()> {
        std::thread::Builder::new()
            .name("tsh-worker".to_string())
            .spawn(move || {
                for msg in worker_rx.iter() {
                    let reply = match msg {
                        WorkerMsg::Cmd(line) => self.on_command(&line),
                        WorkerMsg::Signal(sig) => self.on_signal(sig),
                    };
                    if let Some(reply) = reply {
                        if shell_tx.send(reply).is_err() {
                            break;
                        }
                    }
                }
            })?;
        Ok(())
    }

    /// Handle a line from the read loop. `None` keeps the read loop blocked.
    pub(crate) fn on_command(&mut self, line: &str) -> Option<ShellMsg> {
        match self.evaluate(line) {
            Ok(Outcome::Quit(code)) => return Some(ShellMsg::Quit(code)),
            Ok(Outcome::Wait(pid)) => self.waiter.arm(pid),
            Ok(Outcome::Done) => {}
            Err(e) => self.report(e),
        }
        match self.waiter.waiting_on() {
            None => Some(ShellMsg::Continue),
            Some(_) => self.waiter.poll(&self.jobs).then_some(ShellMsg::Continue),
        }
    }

    /// Handle a relayed signal. Replies only when it released the foreground wait.
    pub(crate) fn on_signal(&mut self, sig: i32) -> Option<ShellMsg> {
        let waiting = self.waiter.waiting_on().is_some();
        match self.handle_signal(sig) {
            Ok(Outcome::Quit(code)) => {
                let _ = self.out.flush();
                std::process::exit(code);
            }
            Ok(_) => {}
            Err(e) => self.report(e),
        }
        (waiting && self.waiter.poll(&self.jobs)).then_some(ShellMsg::Continue)
    }

    /// Run a builtin immediately, or launch the line as a new job.
    pub fn evaluate(&mut self, line: &str) -> Result<Outcome, ShellError> {
        let cmd = parse_cmd(line);
        if cmd.is_empty() {
            return Ok(Outcome::Done);
        }
        if is_builtin(&cmd.args) {
            return self.run_builtin(&cmd.args);
        }
        self.launch(&cmd, line.trim())
    }

    pub fn run_builtin(&mut self, args: &[&str]) -> Result<Outcome, ShellError> {
        let Some(builtin) = Builtin::from_args(args) else {
            return Err(ShellError::Internal(format!(
                "{}: not a builtin",
                args.first().copied().unwrap_or_default()
            )));
        };
        match builtin {
            Builtin::Quit => Ok(Outcome::Quit(0)),
            Builtin::Jobs => {
                for job in self.jobs.list() {
                    self.emit(job.listing());
                }
                Ok(Outcome::Done)
            }
            Builtin::Fg => self.resume(args, JobState::Foreground),
            Builtin::Bg => self.resume(args, JobState::Background),
            Builtin::Ampersand => Ok(Outcome::Done),
        }
    }

    fn launch(&mut self, cmd: &Cmd, line: &str) -> Result<Outcome, ShellError> {
        if self.jobs.is_full() {
            return Err(JobTableError::CapacityExceeded.into());
        }
        let state = if cmd.background {
            JobState::Background
        } else {
            JobState::Foreground
        };

        let blocked = ChildSignalBlock::new()?;
        let pid = fork_exec(&cmd.args, &blocked)?;
        let jid = match self.jobs.insert(pid, state, line) {
            Ok(jid) => jid,
            Err(e) => {
                signal_group(pid, Signal::SIGKILL)?;
                return Err(e.into());
            }
        };
        drop(blocked);

        tracing::debug!(%jid, %pid, ?state, "launched job");
        if self.verbose {
            self.emit(format_args!("Added job [{}] {} {}", jid, pid, line));
        }
        match state {
            JobState::Foreground => Ok(Outcome::Wait(pid)),
            _ => {
                self.print_job(pid);
                Ok(Outcome::Done)
            }
        }
    }

    /// `fg` / `bg`: continue the job's group and move it to `state`.
    fn resume(&mut self, args: &[&str], state: JobState) -> Result<Outcome, ShellError> {
        let pid = JobRef::parse(args)?.resolve(&self.jobs)?;
        signal_group(pid, Signal::SIGCONT)?;
        if !self.jobs.set_state(pid, state) {
            return Err(ShellError::Internal(format!(
                "job ({}) cannot move to {:?}",
                pid, state
            )));
        }
        tracing::debug!(%pid, ?state, "resumed job");
        match state {
            JobState::Foreground => Ok(Outcome::Wait(pid)),
            _ => {
                self.print_job(pid);
                Ok(Outcome::Done)
            }
        }
    }

    pub fn handle_signal(&mut self, sig: i32) -> Result<Outcome, ShellError> {
        match Signal::try_from(sig) {
            Ok(Signal::SIGCHLD) => {
                for notice in reap_children(&mut self.jobs)? {
                    if self.verbose || !notice.is_quiet() {
                        self.emit(notice);
                    }
                }
            }
            Ok(sig @ (Signal::SIGINT | Signal::SIGTSTP)) => {
                forward_to_foreground(&self.jobs, sig)?;
            }
            Ok(Signal::SIGQUIT) => {
                self.emit("Terminating after receipt of SIGQUIT signal");
                return Ok(Outcome::Quit(1));
            }
            _ => tracing::warn!(sig, "unexpected signal"),
        }
        Ok(Outcome::Done)
    }

    fn print_job(&mut self, pid: Pid) {
        if let Some(job) = self.jobs.lookup_by_pid(pid).cloned() {
            self.emit(job);
        }
    }

    fn emit(&mut self, line: impl Display) {
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            tracing::warn!("failed to write output: {}", e);
        }
    }

    fn report(&mut self, e: ShellError) {
        self.emit(&e);
        if e.is_fatal() {
            std::process::exit(1);
        }
    }
}
