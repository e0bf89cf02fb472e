use nix::unistd::Pid;

use super::job::JobTable;

/// Tracks the job the read loop is blocked on.
///
/// The read loop waits for a reply from the worker; the worker holds that reply
/// back while the armed pid is still the table's foreground job and releases it
/// once the job has exited, stopped or moved to the background.
#[derive(Debug, Default)]
pub struct ForegroundWaiter {
    pid: Option<Pid>,
}

impl ForegroundWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, pid: Pid) {
        tracing::trace!(%pid, "waiting for foreground job");
        self.pid = Some(pid);
    }

    pub fn waiting_on(&self) -> Option<Pid> {
        self.pid
    }

    /// True exactly once, when the armed job has left the foreground.
    pub fn poll(&mut self, jobs: &JobTable) -> bool {
        match self.pid {
            Some(pid) if jobs.foreground_pid() != Some(pid) => {
                tracing::trace!(%pid, "foreground released");
                self.pid = None;
                true
            }
            _ => false,
        }
    }
}
