//! Translation of OS signal events into job table changes.

use std::fmt::{self, Display, Formatter};

use nix::{
    errno::Errno,
    sys::{
        signal::{self, Signal},
        wait::{self, WaitPidFlag, WaitStatus},
    },
    unistd::Pid,
};

use super::job::{JobId, JobState, JobTable};
use crate::{error::ShellError, shell::syscall};

/// A child state change worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Exited { jid: JobId, pid: Pid, status: i32 },
    Stopped { jid: JobId, pid: Pid, signal: i32 },
    Terminated { jid: JobId, pid: Pid, signal: i32 },
}

impl Display for Notice {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Notice::Exited { jid, pid, status } => {
                write!(f, "Job [{}] ({}) exited with status {}", jid, pid, status)
            }
            Notice::Stopped { jid, pid, signal } => {
                write!(f, "Job [{}] ({}) stopped by signal {}", jid, pid, signal)
            }
            Notice::Terminated { jid, pid, signal } => {
                write!(f, "Job [{}] ({}) terminated by signal {}", jid, pid, signal)
            }
        }
    }
}

impl Notice {
    /// Normal exits are only shown in verbose mode.
    pub fn is_quiet(&self) -> bool {
        matches!(self, Notice::Exited { .. })
    }
}

/// Reap every child whose state changed, without waiting on the others.
///
/// Several SIGCHLDs can collapse into one, so this loops until nothing is
/// pending. Stopped jobs are marked `Stopped`; exited or killed jobs are removed.
/// Children that are not in the table are reaped without a notice.
pub fn reap_children(jobs: &mut JobTable) -> Result<Vec<Notice>, ShellError> {
    // WUNTRACED: Return if a child has stopped
    // WNOHANG: Return immediately if no child has changed state
    let flag = Some(WaitPidFlag::WUNTRACED | WaitPidFlag::WNOHANG);
    let mut notices = Vec::new();

    loop {
        match syscall(|| wait::waitpid(Pid::from_raw(-1), flag)) {
            Ok(WaitStatus::Exited(pid, status)) => {
                tracing::debug!(%pid, status, "child exited");
                if let Some(jid) = jobs.lookup_by_pid(pid).map(|job| job.jid) {
                    notices.push(Notice::Exited { jid, pid, status });
                    jobs.remove(pid);
                }
            }
            Ok(WaitStatus::Signaled(pid, sig, _core)) => {
                tracing::debug!(%pid, signal = %sig, "child killed");
                if let Some(jid) = jobs.lookup_by_pid(pid).map(|job| job.jid) {
                    notices.push(Notice::Terminated {
                        jid,
                        pid,
                        signal: sig as i32,
                    });
                    jobs.remove(pid);
                }
            }
            Ok(WaitStatus::Stopped(pid, sig)) => {
                tracing::debug!(%pid, signal = %sig, "child stopped");
                match jobs.lookup_by_pid(pid).map(|job| job.jid) {
                    Some(jid) => {
                        jobs.set_state(pid, JobState::Stopped);
                        notices.push(Notice::Stopped {
                            jid,
                            pid,
                            signal: sig as i32,
                        });
                    }
                    None => tracing::warn!(%pid, "stopped child is not in the job table"),
                }
            }
            Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => return Ok(notices),
            Ok(other) => tracing::trace!(?other, "ignoring wait status"),
            Err(e) => return Err(ShellError::os("waitpid error")(e)),
        }
    }
}

/// Send `sig` to the whole process group of the foreground job.
///
/// Returns the group that was signalled, or `None` when nothing is in the
/// foreground; the signal was meant for a job, never for the shell.
pub fn forward_to_foreground(jobs: &JobTable, sig: Signal) -> Result<Option<Pid>, ShellError> {
    let Some(pgid) = jobs.foreground_pid() else {
        tracing::debug!(signal = %sig, "no foreground job");
        return Ok(None);
    };
    tracing::debug!(%pgid, signal = %sig, "forwarding to foreground group");
    signal_group(pgid, sig)?;
    Ok(Some(pgid))
}

/// `kill(-pgid, sig)`. A group that has already gone away is left to the reaper.
pub fn signal_group(pgid: Pid, sig: Signal) -> Result<(), ShellError> {
    match signal::killpg(pgid, sig) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => {
            tracing::debug!(%pgid, signal = %sig, "process group already gone");
            Ok(())
        }
        Err(e) => Err(ShellError::os("kill error")(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_lines() {
        let pid = Pid::from_raw(321);
        let stopped = Notice::Stopped {
            jid: JobId::from(2),
            pid,
            signal: Signal::SIGTSTP as i32,
        };
        assert_eq!(
            stopped.to_string(),
            format!("Job [2] (321) stopped by signal {}", Signal::SIGTSTP as i32)
        );
        let killed = Notice::Terminated {
            jid: JobId::from(1),
            pid,
            signal: 15,
        };
        assert_eq!(killed.to_string(), "Job [1] (321) terminated by signal 15");
        assert!(!killed.is_quiet());

        let exited = Notice::Exited {
            jid: JobId::from(4),
            pid,
            status: 0,
        };
        assert_eq!(exited.to_string(), "Job [4] (321) exited with status 0");
        assert!(exited.is_quiet());
    }

    #[test]
    fn forwarding_without_foreground_is_a_no_op() {
        let mut jobs = JobTable::new();
        jobs.insert(Pid::from_raw(999_999), JobState::Background, "x")
            .unwrap();
        assert_eq!(forward_to_foreground(&jobs, Signal::SIGINT).unwrap(), None);
        assert_eq!(forward_to_foreground(&jobs, Signal::SIGTSTP).unwrap(), None);
    }

    #[test]
    fn signalling_a_reaped_group_is_not_an_error() {
        use crate::shell::{
            test_support::lock_children,
            thread::process::{fork_exec, ChildSignalBlock},
        };

        let _children = lock_children();
        let blocked = ChildSignalBlock::new().unwrap();
        let child = fork_exec(&["true"], &blocked).unwrap();
        drop(blocked);
        wait::waitpid(child, None).unwrap();
        assert!(signal_group(child, Signal::SIGKILL).is_ok());
    }

    #[test]
    fn other_kill_failures_are_fatal() {
        let err = signal_group(Pid::from_raw(-5), Signal::SIGKILL).unwrap_err();
        assert!(matches!(err, ShellError::Os { context: "kill error", .. }));
        assert!(err.is_fatal());
    }
}
