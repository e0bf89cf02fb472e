use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use nix::unistd::Pid;

use crate::error::JobTableError;

/// Default number of concurrent jobs.
pub const MAX_JOBS: usize = 16;
/// Job ids wrap back to 1 past this value.
pub const MAX_JID: usize = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(usize);

impl Display for JobId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.parse()?;
        Ok(JobId(id))
    }
}

impl From<JobId> for usize {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl From<usize> for JobId {
    fn from(id: usize) -> Self {
        JobId(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Foreground,
    Background,
    Stopped,
}

impl JobState {
    /// Word shown by `jobs`.
    pub fn label(&self) -> &'static str {
        match self {
            JobState::Foreground => "Foreground",
            JobState::Background => "Running",
            JobState::Stopped => "Stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub pid: Pid, // Process group leader
    pub jid: JobId,
    pub state: JobState,
    pub command: String, // Command line as typed
}

impl Job {
    /// `[jid] (pid) State cmdline`, as printed by `jobs`.
    pub fn listing(&self) -> String {
        format!(
            "[{}] ({}) {} {}",
            self.jid,
            self.pid,
            self.state.label(),
            self.command
        )
    }
}

/// `[jid] (pid) cmdline`, as printed when a job goes to the background.
impl Display for Job {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "[{}] ({}) {}", self.jid, self.pid, self.command)
    }
}

/// Fixed-capacity job registry.
///
/// Slots are scanned linearly; the table is small and bounded. Process ids and
/// job ids are unique across occupied slots, and at most one job is in the
/// foreground.
#[derive(Debug)]
pub struct JobTable {
    slots: Vec<Option<Job>>,
    next_jid: usize,
    max_jid: usize,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    pub fn new() -> Self {
        Self::with_limits(MAX_JOBS, MAX_JID)
    }

    /// # Panics
    ///
    /// If `capacity` is zero or `max_jid` is smaller than `capacity`.
    pub fn with_limits(capacity: usize, max_jid: usize) -> Self {
        assert!(capacity > 0, "job table needs at least one slot");
        assert!(max_jid >= capacity, "job id ceiling below table capacity");
        JobTable {
            slots: vec![None; capacity],
            next_jid: 1,
            max_jid,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.jobs().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn insert(
        &mut self,
        pid: Pid,
        state: JobState,
        command: &str,
    ) -> Result<JobId, JobTableError> {
        if pid.as_raw() < 1 {
            return Err(JobTableError::InvalidPid(pid.as_raw()));
        }
        if self.lookup_by_pid(pid).is_some() {
            return Err(JobTableError::DuplicatePid(pid.as_raw()));
        }
        if state == JobState::Foreground {
            if let Some(fg) = self.foreground_pid() {
                return Err(JobTableError::ForegroundBusy(fg.as_raw()));
            }
        }
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(JobTableError::CapacityExceeded)?;

        let jid = self.allocate_jid();
        self.slots[index] = Some(Job {
            pid,
            jid,
            state,
            command: command.to_string(),
        });
        tracing::trace!(%jid, %pid, ?state, "job inserted");
        Ok(jid)
    }

    fn allocate_jid(&mut self) -> JobId {
        // Terminates: fewer jobs than ids below the ceiling.
        loop {
            if self.next_jid > self.max_jid {
                self.next_jid = 1;
            }
            let candidate = JobId(self.next_jid);
            self.next_jid += 1;
            if self.lookup_by_jid(candidate).is_none() {
                return candidate;
            }
        }
    }

    pub fn remove(&mut self, pid: Pid) -> bool {
        if pid.as_raw() < 1 {
            return false;
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.as_ref().map_or(false, |job| job.pid == pid));
        match slot {
            Some(slot) => {
                *slot = None;
                self.next_jid = self.max_job_id() + 1;
                tracing::trace!(%pid, next_jid = self.next_jid, "job removed");
                true
            }
            None => false,
        }
    }

    /// Refuses to put a second job in the foreground.
    pub fn set_state(&mut self, pid: Pid, state: JobState) -> bool {
        if state == JobState::Foreground {
            if let Some(fg) = self.foreground_pid() {
                if fg != pid {
                    tracing::warn!(%pid, foreground = %fg, "refusing second foreground job");
                    return false;
                }
            }
        }
        match self.lookup_mut(pid) {
            Some(job) => {
                job.state = state;
                true
            }
            None => false,
        }
    }

    fn lookup_mut(&mut self, pid: Pid) -> Option<&mut Job> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|job| job.pid == pid)
    }

    pub fn lookup_by_pid(&self, pid: Pid) -> Option<&Job> {
        if pid.as_raw() < 1 {
            return None;
        }
        self.jobs().find(|job| job.pid == pid)
    }

    pub fn lookup_by_jid(&self, jid: JobId) -> Option<&Job> {
        self.jobs().find(|job| job.jid == jid)
    }

    pub fn foreground_pid(&self) -> Option<Pid> {
        self.jobs()
            .find(|job| job.state == JobState::Foreground)
            .map(|job| job.pid)
    }

    /// Largest job id in use, 0 when the table is empty.
    pub fn max_job_id(&self) -> usize {
        self.jobs().map(|job| job.jid.0).max().unwrap_or(0)
    }

    /// Occupied slots in slot order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.slots.iter().flatten()
    }

    /// Snapshot of the table for display.
    pub fn list(&self) -> Vec<Job> {
        self.jobs().cloned().collect()
    }
}
